//! Centralized constants for the legal RAG engine
//!
//! Single source of truth for search-engine tuning, service endpoints,
//! and LLM defaults. Domain data (stopwords, synonym groups, legal-term
//! regexes) lives next to the code that consumes it in `omnilex-rag`;
//! those tables define retrieval behavior and must not drift.

/// Service endpoints (loaded from env vars with fallback defaults)
pub mod endpoints {
    use once_cell::sync::Lazy;

    /// Qdrant vector store endpoint (env: QDRANT_URL)
    pub static QDRANT_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".to_string())
    });

    /// NVIDIA NIM embeddings endpoint (env: NVIDIA_EMBEDDING_URL)
    pub static NVIDIA_EMBEDDINGS: Lazy<String> = Lazy::new(|| {
        std::env::var("NVIDIA_EMBEDDING_URL")
            .unwrap_or_else(|_| "https://integrate.api.nvidia.com/v1/embeddings".to_string())
    });

    /// NVIDIA NIM chat completions endpoint (env: NVIDIA_CHAT_URL)
    pub static NVIDIA_CHAT: Lazy<String> = Lazy::new(|| {
        std::env::var("NVIDIA_CHAT_URL")
            .unwrap_or_else(|_| "https://integrate.api.nvidia.com/v1/chat/completions".to_string())
    });

    /// Jina AI embeddings endpoint (env: JINA_EMBEDDING_URL)
    pub static JINA_EMBEDDINGS: Lazy<String> = Lazy::new(|| {
        std::env::var("JINA_EMBEDDING_URL")
            .unwrap_or_else(|_| "https://api.jina.ai/v1/embeddings".to_string())
    });

    /// Jina AI reranker endpoint (env: JINA_RERANK_URL)
    pub static JINA_RERANK: Lazy<String> = Lazy::new(|| {
        std::env::var("JINA_RERANK_URL")
            .unwrap_or_else(|_| "https://api.jina.ai/v1/rerank".to_string())
    });
}

/// Retrieval tuning
pub mod retrieval {
    /// Default Qdrant collection name (must match ingestion)
    pub const COLLECTION_NAME: &str = "indonesian_legal_docs";

    /// Standard RRF constant
    pub const RRF_K: f32 = 60.0;

    /// Default number of final results
    pub const DEFAULT_TOP_K: usize = 5;

    /// Candidate pool multiplier when a cross-encoder reranker is active
    pub const POOL_MULTIPLIER_RERANK: usize = 3;

    /// Candidate pool multiplier when no reranker is configured
    /// (larger pool compensates for the missing rerank pass)
    pub const POOL_MULTIPLIER_NO_RERANK: usize = 4;

    /// Candidate pool multiplier when reranking is disabled per-call
    pub const POOL_MULTIPLIER_DEFAULT: usize = 2;

    /// Score multiplier for candidates whose regulation is KG-related
    /// to the top results
    pub const KG_BOOST_FACTOR: f32 = 1.15;

    /// KG 1-hop boost traversal deadline (ms)
    pub const KG_BOOST_TIMEOUT_MS: u64 = 200;

    /// KG traversal deadline for user-visible related-regulation queries (ms)
    pub const KG_RELATED_TIMEOUT_MS: u64 = 500;

    /// Document-type authority multipliers: (jenis_dokumen, multiplier).
    /// UU is the highest national authority; Perda is penalized so
    /// regional chunks cannot outrank national ones on near-equal scores.
    pub const AUTHORITY_MULTIPLIERS: &[(&str, f32)] = &[
        ("UU", 1.50),
        ("PP", 1.20),
        ("Perpres", 1.10),
        ("Permen", 1.05),
        ("Perda", 0.60),
    ];

    /// Embedding batch cap per HTTP call
    pub const EMBEDDING_BATCH_SIZE: usize = 100;

    /// Self-hosted embedder output dimensionality
    pub const LOCAL_EMBEDDING_DIM: usize = 384;

    /// HTTP embedding provider output dimensionality (Jina v3 / NIM e5-v5)
    pub const HTTP_EMBEDDING_DIM: usize = 1024;
}

/// Adaptive-strategy thresholds
pub mod strategy {
    /// Maximum agentic retrieval iterations
    pub const MAX_ITERATIONS: usize = 3;

    /// Early-exit / good-enough average score for the agentic loop
    pub const SUFFICIENT_AVG_SCORE: f32 = 0.5;

    /// Below this average the agent refines the query via CRAG
    pub const REFINE_AVG_SCORE: f32 = 0.3;

    /// CRAG grade boundaries: avg >= CORRECT is "correct",
    /// avg >= AMBIGUOUS is "ambiguous", below is "incorrect"
    pub const CRAG_CORRECT_THRESHOLD: f32 = 0.7;
    pub const CRAG_AMBIGUOUS_THRESHOLD: f32 = 0.3;

    /// Compound-question word-count trigger for decomposition
    pub const DECOMPOSE_WORD_COUNT: usize = 15;

    /// Maximum sub-queries from decomposition
    pub const MAX_SUB_QUERIES: usize = 4;
}

/// Answer-generation tuning
pub mod generation {
    /// Refuse to generate below this confidence
    pub const CONFIDENCE_THRESHOLD: f32 = 0.15;

    /// Confidence label boundaries
    pub const LABEL_TINGGI: f32 = 0.65;
    pub const LABEL_SEDANG: f32 = 0.40;

    /// Citation snippet length carried in response metadata
    pub const SNIPPET_LEN: usize = 500;

    /// Grounding verification soft budget (seconds)
    pub const GROUNDING_TIMEOUT_SECS: u64 = 5;

    /// Number of sources sent to the grounding judge
    pub const GROUNDING_TOP_SOURCES: usize = 5;

    /// Conversation turns compressed into a follow-up question
    pub const HISTORY_TURNS: usize = 3;

    /// Answer excerpt length per compressed history turn
    pub const HISTORY_ANSWER_LEN: usize = 200;
}

/// LLM defaults
pub mod llm {
    /// Default completion budget
    pub const MAX_TOKENS: u32 = 4096;

    /// Default sampling temperature (low: legal answers must be stable)
    pub const TEMPERATURE: f32 = 0.15;

    /// Default NIM chat model
    pub const NVIDIA_MODEL: &str = "moonshotai/kimi-k2-instruct";

    /// Request timeout (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;

    /// Retry attempts for transient failures
    pub const MAX_RETRIES: u32 = 3;

    /// Pre-emptive bearer-token refresh margin (seconds before expiry)
    pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 300;

    /// Circuit breaker: consecutive failures before a provider opens
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 3;

    /// Circuit breaker: cooldown before an open provider is retried (seconds)
    pub const CIRCUIT_COOLDOWN_SECS: u64 = 60;
}

/// Reranker defaults
pub mod reranker {
    /// Multilingual cross-encoder used for reranking
    pub const MODEL: &str = "BAAI/bge-reranker-v2-m3";

    /// Raw cross-encoder scores typically fall in [-5, +5]; the
    /// normalization maps that range onto [0, 1]
    pub const SCORE_OFFSET: f32 = 5.0;
    pub const SCORE_RANGE: f32 = 10.0;

    /// Request timeout (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}
