//! RAG chain for Indonesian legal Q&A
//!
//! Composes retrieval, context assembly, confidence gating, answer
//! generation, citation validation, and LLM-as-judge grounding
//! verification into one request pipeline, with blocking, streaming,
//! and conversation-history entry points.

pub mod chain;
pub mod confidence;
pub mod engine;
pub mod grounding;
pub mod prompts;
pub mod response;
pub mod validation;

pub use chain::{ChatTurn, LegalRagChain, QueryOptions};
pub use engine::{build_chain, build_embedder, build_llm};
pub use confidence::assess_confidence;
pub use prompts::{detect_question_type, AnswerMode, QuestionType};
pub use response::{
    Citation, ConfidenceScore, HallucinationRisk, RagResponse, RagStreamEvent, ValidationResult,
};

use thiserror::Error;

/// Chain errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] omnilex_rag::RagError),

    #[error("Generation failed: {0}")]
    Generation(#[from] omnilex_llm::LlmError),
}

impl From<ChainError> for omnilex_core::Error {
    fn from(err: ChainError) -> Self {
        omnilex_core::Error::Chain(err.to_string())
    }
}
