//! NVIDIA NIM backend
//!
//! OpenAI-compatible chat completions against the NIM gateway. Transient
//! failures retry with doubling backoff (1s, 2s, 4s); user-visible
//! failures surface as Indonesian-language errors at the chain layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;

use omnilex_config::constants::{endpoints, llm};

use crate::backend::{
    forward_sse_stream, is_retryable, ChatRequest, ChatResponse, GenerationRequest, LlmBackend,
};
use crate::LlmError;

/// NIM client configuration
#[derive(Debug, Clone)]
pub struct NimConfig {
    /// Chat completions endpoint
    pub api_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Model id
    pub model: String,
    /// Default completion budget
    pub max_tokens: u32,
    /// Default sampling temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl NimConfig {
    /// Build a config from an API key, using the standard defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: endpoints::NVIDIA_CHAT.clone(),
            api_key: api_key.into(),
            model: llm::NVIDIA_MODEL.to_string(),
            max_tokens: llm::MAX_TOKENS,
            temperature: llm::TEMPERATURE,
            timeout: Duration::from_secs(llm::REQUEST_TIMEOUT_SECS),
            max_retries: llm::MAX_RETRIES,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// NVIDIA NIM chat backend
pub struct NimChatClient {
    client: Client,
    config: NimConfig,
}

impl NimChatClient {
    pub fn new(config: NimConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "NVIDIA_API_KEY not configured".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn send(&self, body: &ChatRequest, stream: bool) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 {
            return Err(LlmError::Auth(text));
        }
        if status.is_server_error() {
            // Retryable at the caller
            return Err(LlmError::Network(format!("HTTP {}: {}", status, text)));
        }
        Err(LlmError::Api(format!(
            "NIM {} error {}: {}",
            if stream { "streaming" } else { "chat" },
            status,
            text
        )))
    }
}

#[async_trait]
impl LlmBackend for NimChatClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = ChatRequest::build(
            &self.config.model,
            request,
            self.config.max_tokens,
            self.config.temperature,
            false,
        );

        let mut last_error = None;
        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                let wait = Duration::from_secs(1 << (attempt - 1));
                tracing::warn!(
                    attempt,
                    max = self.config.max_retries,
                    ?wait,
                    "NIM request failed, retrying"
                );
                tokio::time::sleep(wait).await;
            }

            match self.send(&body, false).await {
                Ok(response) => {
                    let parsed: ChatResponse = response
                        .json()
                        .await
                        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                    let choice = parsed.choices.first().ok_or_else(|| {
                        LlmError::InvalidResponse("no choices in response".to_string())
                    })?;
                    let content = choice.message.text();
                    if content.is_empty() {
                        tracing::warn!("Empty content from NIM model");
                    }
                    return Ok(content);
                }
                Err(e) if is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Network("max retries exceeded".to_string())))
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        let body = ChatRequest::build(
            &self.config.model,
            request,
            self.config.max_tokens,
            self.config.temperature,
            true,
        );

        let mut last_error = None;
        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                let wait = Duration::from_secs(1 << (attempt - 1));
                tracing::warn!(attempt, ?wait, "NIM streaming failed, retrying");
                tokio::time::sleep(wait).await;
            }

            match self.send(&body, true).await {
                Ok(response) => {
                    forward_sse_stream(response, &tx).await?;
                    return Ok(());
                }
                Err(e) if is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Network("max retries exceeded".to_string())))
    }

    fn provider_name(&self) -> &str {
        "nvidia"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = NimConfig::new("key");
        assert_eq!(config.model, "moonshotai/kimi-k2-instruct");
        assert_eq!(config.max_tokens, 4096);
        assert!((config.temperature - 0.15).abs() < f32::EPSILON);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_empty_key_rejected() {
        let config = NimConfig::new("");
        assert!(NimChatClient::new(config).is_err());
    }

    #[test]
    fn test_model_override() {
        let config = NimConfig::new("key").with_model("meta/llama-3.1-70b-instruct");
        assert_eq!(config.model, "meta/llama-3.1-70b-instruct");
    }
}
