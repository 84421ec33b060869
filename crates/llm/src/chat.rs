//! Generic bearer-token chat backend
//!
//! OpenAI-compatible chat completions behind a short-lived bearer token.
//! The token comes from a [`TokenSource`]; refresh is serialized by a
//! mutex so concurrent requests trigger at most one exchange, and a
//! pre-emptive refresh runs 5 minutes before expiry to avoid a 401 storm
//! from parallel workers. A 401 mid-request refreshes once and retries;
//! a second 401 is terminal. 429 honors the server's Retry-After.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::mpsc;

use omnilex_config::constants::llm;

use crate::backend::{
    forward_sse_stream, is_retryable, ChatRequest, ChatResponse, GenerationRequest, LlmBackend,
};
use crate::LlmError;

/// A source of short-lived bearer tokens.
///
/// The credential exchange itself (OAuth device flow etc.) is an external
/// concern; implementations only need to mint a fresh token on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Mint a fresh bearer token. Returns the token plus its absolute
    /// expiry as a unix timestamp (seconds).
    async fn refresh(&self) -> Result<(String, u64), LlmError>;
}

/// Token source for providers with a static, non-expiring API key.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn refresh(&self) -> Result<(String, u64), LlmError> {
        // Far-future expiry: static keys never rotate here
        Ok((self.token.clone(), u64::MAX))
    }
}

/// Chat backend configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Provider name (used for tuning lookup and diagnostics)
    pub provider: String,
    /// Chat completions URL
    pub api_url: String,
    /// Model id
    pub model: String,
    /// Default completion budget
    pub max_tokens: u32,
    /// Default temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl ChatConfig {
    pub fn new(
        provider: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            api_url: api_url.into(),
            model: model.into(),
            max_tokens: llm::MAX_TOKENS,
            temperature: llm::TEMPERATURE,
            timeout: Duration::from_secs(llm::REQUEST_TIMEOUT_SECS),
            max_retries: llm::MAX_RETRIES,
        }
    }
}

#[derive(Default)]
struct TokenState {
    bearer: String,
    expires_at: u64,
}

/// OpenAI-compatible backend with refreshable bearer auth
pub struct ChatCompletionsClient {
    client: Client,
    config: ChatConfig,
    token_source: Arc<dyn TokenSource>,
    token: Mutex<TokenState>,
}

impl ChatCompletionsClient {
    pub fn new(config: ChatConfig, token_source: Arc<dyn TokenSource>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            config,
            token_source,
            token: Mutex::new(TokenState::default()),
        })
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Refresh the bearer token and store it.
    async fn refresh_token(&self) -> Result<(), LlmError> {
        let (bearer, expires_at) = self.token_source.refresh().await?;
        let mut state = self.token.lock();
        state.bearer = bearer;
        state.expires_at = expires_at;
        Ok(())
    }

    /// Ensure the stored token is valid, refreshing pre-emptively when
    /// it is within the refresh margin of expiry.
    async fn ensure_valid_token(&self) -> Result<String, LlmError> {
        let needs_refresh = {
            let state = self.token.lock();
            state.bearer.is_empty()
                || Self::now()
                    > state
                        .expires_at
                        .saturating_sub(llm::TOKEN_REFRESH_MARGIN_SECS)
        };
        if needs_refresh {
            tracing::info!(provider = %self.config.provider, "Bearer token near expiry, refreshing");
            self.refresh_token().await?;
        }
        Ok(self.token.lock().bearer.clone())
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response, LlmError> {
        let mut token_refreshed = false;
        let mut attempt: u32 = 0;
        let mut last_error: Option<LlmError> = None;

        while attempt < self.config.max_retries {
            let bearer = self.ensure_valid_token().await?;

            let response = match self
                .client
                .post(&self.config.api_url)
                .bearer_auth(&bearer)
                .json(body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    let err = LlmError::from(e);
                    if is_retryable(&err) && attempt + 1 < self.config.max_retries {
                        let wait = Duration::from_secs(1 << attempt);
                        tracing::warn!(provider = %self.config.provider, attempt, ?wait,
                            "Request failed, retrying");
                        tokio::time::sleep(wait).await;
                        last_error = Some(err);
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();

            // 401: refresh the token once, retry without burning an attempt
            if status.as_u16() == 401 {
                if token_refreshed {
                    return Err(LlmError::Auth(
                        "authentication rejected after token refresh".to_string(),
                    ));
                }
                tracing::warn!(provider = %self.config.provider, "401 received, refreshing token");
                self.refresh_token().await?;
                token_refreshed = true;
                continue;
            }

            // 429: honor Retry-After
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1 << attempt);
                tracing::warn!(provider = %self.config.provider, retry_after, attempt,
                    "Rate limited, waiting");
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                last_error = Some(LlmError::RateLimited(self.config.max_retries));
                attempt += 1;
                continue;
            }

            if status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                let err = LlmError::Network(format!("HTTP {}: {}", status, text));
                if attempt + 1 < self.config.max_retries {
                    let wait = Duration::from_secs(1 << attempt);
                    tokio::time::sleep(wait).await;
                    last_error = Some(err);
                    attempt += 1;
                    continue;
                }
                return Err(err);
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::Api(format!("HTTP {}: {}", status, text)));
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = ChatRequest::build(
            &self.config.model,
            request,
            self.config.max_tokens,
            self.config.temperature,
            false,
        );
        let response = self.send(&body).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;
        Ok(choice.message.text())
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
        let response = self.send(&body).await?;
        forward_sse_stream(response, &tx).await?;
        Ok(())
    }

    fn provider_name(&self) -> &str {
        &self.config.provider
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_source() {
        let source = StaticTokenSource::new("abc");
        let (token, expires) = source.refresh().await.unwrap();
        assert_eq!(token, "abc");
        assert_eq!(expires, u64::MAX);
    }

    #[tokio::test]
    async fn test_token_cached_after_refresh() {
        let config = ChatConfig::new("test", "http://localhost:9/none", "m");
        let client =
            ChatCompletionsClient::new(config, Arc::new(StaticTokenSource::new("tok"))).unwrap();

        let bearer = client.ensure_valid_token().await.unwrap();
        assert_eq!(bearer, "tok");
        // Second call serves from the cached state
        let bearer = client.ensure_valid_token().await.unwrap();
        assert_eq!(bearer, "tok");
    }
}
