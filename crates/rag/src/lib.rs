//! Hybrid retrieval for Indonesian legal documents
//!
//! Features:
//! - Dense vector search via Qdrant
//! - Sparse BM25 over an in-memory corpus with Indonesian tokenization
//! - Hybrid fusion with RRF
//! - Legal-reference auto-filtering with unfiltered fallback
//! - Knowledge-graph and document-authority score boosting
//! - Cross-encoder reranking via HTTP service
//! - Query expansion with legal-term synonyms
//! - Adaptive strategies: HyDE, Multi-Query Fusion, query decomposition,
//!   CRAG, parent-child expansion
//! - Rule-based agentic orchestration

pub mod agentic;
pub mod crag;
pub mod embeddings;
pub mod expansion;
pub mod fusion;
pub mod hyde;
pub mod legal_refs;
pub mod multi_query;
pub mod parent_child;
pub mod planner;
pub mod reranker;
pub mod retriever;
pub mod sparse;
pub mod tokenizer;
pub mod vector_store;

pub use agentic::{AgenticRag, StrategyDecision, StrategyKind};
pub use crag::{Crag, RetrievalGrade};
pub use embeddings::{Embedder, HashEmbedder, JinaEmbedder, NimEmbedder};
pub use expansion::QueryExpander;
pub use fusion::{rrf_merge, rrf_merge_default};
pub use hyde::Hyde;
pub use legal_refs::{detect_legal_references, ReferenceFilter};
pub use multi_query::MultiQueryFusion;
pub use parent_child::ParentChildRetriever;
pub use planner::QueryPlanner;
pub use reranker::{HttpReranker, RerankerConfig};
pub use retriever::{
    HybridRetriever, RetrieverConfig, RetrieverStats, SearchOptions, SearchRetriever,
};
pub use sparse::{Bm25Index, SparseCorpus};
pub use tokenizer::tokenize_indonesian;
pub use vector_store::{ScrolledChunk, SearchFilter, VectorStore, VectorStoreConfig};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Reranker error: {0}")]
    Reranker(String),

    #[error("Rate limit exceeded after {0} retries")]
    RateLimited(u32),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for omnilex_core::Error {
    fn from(err: RagError) -> Self {
        omnilex_core::Error::Rag(err.to_string())
    }
}
