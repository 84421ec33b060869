//! Configuration for the legal RAG engine
//!
//! Two layers, kept deliberately separate:
//! - `constants`: compile-time tuning values and env-backed endpoint
//!   defaults shared across crates
//! - `settings`: the runtime [`Settings`] tree loaded from an optional
//!   file plus `OMNILEX_*` environment variables

pub mod constants;
pub mod settings;

pub use settings::{
    EmbeddingProvider, EmbeddingSettings, KgSettings, LlmSettings, RerankerSettings,
    RetrievalSettings, Settings, VectorStoreSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
