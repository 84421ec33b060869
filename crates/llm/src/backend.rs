//! LLM backend trait and shared wire types
//!
//! Both concrete backends speak the OpenAI-compatible chat completions
//! protocol; the request/response serde types and the SSE stream parser
//! live here so the clients only differ in endpoint and auth handling.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::LlmError;

/// A single generation request.
///
/// `max_tokens`/`temperature` are per-call overrides; `None` uses the
/// backend's configured defaults. The chain uses the overrides to apply
/// provider-specific tuning without mutating shared client state.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// User message (the prompt body)
    pub user: String,
    /// Optional system message
    pub system: Option<String>,
    /// Per-call completion budget override
    pub max_tokens: Option<u32>,
    /// Per-call temperature override
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tuning(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }
}

/// LLM backend capability
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a complete response.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Generate a streaming response; text chunks are sent on `tx` in
    /// order. A closed receiver cancels generation without error.
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError>;

    /// Provider name for tuning lookup and fallback diagnostics.
    fn provider_name(&self) -> &str;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

/// Whether an error is worth retrying with backoff.
pub(crate) fn is_retryable(error: &LlmError) -> bool {
    matches!(error, LlmError::Network(_) | LlmError::Timeout)
}

// OpenAI-compatible wire types

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Build the wire request from a generation request plus defaults.
    pub fn build(
        model: &str,
        request: &GenerationRequest,
        default_max_tokens: u32,
        default_temperature: f32,
        stream: bool,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        Self {
            model: model.to_string(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(default_max_tokens),
            temperature: request.temperature.unwrap_or(default_temperature),
            stream,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    // Some models return reasoning fields instead of content
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

impl ChatResponseMessage {
    pub fn text(&self) -> String {
        self.content
            .clone()
            .or_else(|| self.reasoning.clone())
            .or_else(|| self.reasoning_content.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Forward an SSE chat-completions stream onto an mpsc channel.
///
/// Returns `Ok(true)` on normal completion, `Ok(false)` when the
/// receiver dropped (consumer cancelled).
pub(crate) async fn forward_sse_stream(
    response: reqwest::Response,
    tx: &mpsc::Sender<String>,
) -> Result<bool, LlmError> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LlmError::Network(e.to_string()))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(line_end) = buffer.find('\n') {
            let line = buffer[..line_end].trim().to_string();
            buffer.drain(..=line_end);

            if line.is_empty() {
                continue;
            }
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                return Ok(true);
            }
            let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) else {
                continue;
            };
            if let Some(choice) = parsed.choices.first() {
                if let Some(content) = choice.delta.as_ref().and_then(|d| d.content.as_deref()) {
                    if !content.is_empty() && tx.send(content.to_string()).await.is_err() {
                        // Receiver gone: stop generating, release the connection
                        return Ok(false);
                    }
                }
            }
        }
    }

    Ok(true)
}
