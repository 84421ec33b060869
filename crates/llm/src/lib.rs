//! LLM integration
//!
//! Features:
//! - `LlmBackend` trait with blocking and streaming generation
//! - NVIDIA NIM backend (OpenAI-compatible chat completions)
//! - Generic bearer-token backend with serialized token refresh
//! - Fallback chain with per-provider circuit breakers
//! - Exponential backoff honoring server Retry-After

pub mod backend;
pub mod chat;
pub mod fallback;
pub mod nim;

pub use backend::{GenerationRequest, LlmBackend};
pub use chat::{ChatCompletionsClient, ChatConfig, StaticTokenSource, TokenSource};
pub use fallback::{CircuitBreaker, FallbackChain};
pub use nim::{NimChatClient, NimConfig};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded after {0} retries")]
    RateLimited(u32),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("All providers failed: {0}")]
    AllProvidersFailed(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for omnilex_core::Error {
    fn from(err: LlmError) -> Self {
        omnilex_core::Error::Llm(err.to_string())
    }
}
