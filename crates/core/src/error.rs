//! Top-level error type
//!
//! Subsystem crates define their own `thiserror` enums and convert into
//! this type at crate boundaries.

use thiserror::Error;

/// Top-level error aggregating all subsystems
#[derive(Error, Debug)]
pub enum Error {
    #[error("Retrieval error: {0}")]
    Rag(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Knowledge graph error: {0}")]
    Kg(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, Error>;
