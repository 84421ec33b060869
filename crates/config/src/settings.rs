//! Runtime settings
//!
//! Layered loading: optional config file, then `OMNILEX_*` environment
//! variables (double-underscore separated, e.g. `OMNILEX_LLM__PROVIDER`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{endpoints, generation, llm, retrieval};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Vector store connection
    #[serde(default)]
    pub vector_store: VectorStoreSettings,

    /// Embedding provider selection
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// Reranker configuration
    #[serde(default)]
    pub reranker: RerankerSettings,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Knowledge graph persistence
    #[serde(default)]
    pub kg: KgSettings,
}

/// Vector store (Qdrant) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreSettings {
    /// Qdrant endpoint URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// API key for Qdrant Cloud (optional for local)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection name (must match ingestion)
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_qdrant_url() -> String {
    endpoints::QDRANT_DEFAULT.clone()
}

fn default_collection() -> String {
    retrieval::COLLECTION_NAME.to_string()
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
            collection: default_collection(),
        }
    }
}

/// Embedding provider choice.
///
/// Precedence when several are enabled: Jina > NVIDIA > self-hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Jina,
    Nvidia,
    Local,
}

/// Embedding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Enable the Jina backend (highest precedence)
    #[serde(default = "default_true")]
    pub use_jina: bool,

    /// Enable the NVIDIA NIM backend
    #[serde(default)]
    pub use_nvidia: bool,

    /// Jina model name
    #[serde(default = "default_jina_model")]
    pub jina_model: String,

    /// Output dimensionality for the HTTP providers
    #[serde(default = "default_http_dim")]
    pub dimensions: usize,

    /// API keys (fall back to JINA_API_KEY / NVIDIA_API_KEY env vars)
    #[serde(default)]
    pub jina_api_key: Option<String>,
    #[serde(default)]
    pub nvidia_api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_jina_model() -> String {
    "jina-embeddings-v3".to_string()
}

fn default_http_dim() -> usize {
    retrieval::HTTP_EMBEDDING_DIM
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            use_jina: true,
            use_nvidia: false,
            jina_model: default_jina_model(),
            dimensions: default_http_dim(),
            jina_api_key: std::env::var("JINA_API_KEY").ok(),
            nvidia_api_key: std::env::var("NVIDIA_EMBEDDING_API_KEY")
                .or_else(|_| std::env::var("NVIDIA_API_KEY"))
                .ok(),
        }
    }
}

impl EmbeddingSettings {
    /// Resolve the effective provider by precedence: Jina > NVIDIA > local.
    pub fn provider(&self) -> EmbeddingProvider {
        if self.use_jina && self.jina_api_key.is_some() {
            EmbeddingProvider::Jina
        } else if self.use_nvidia && self.nvidia_api_key.is_some() {
            EmbeddingProvider::Nvidia
        } else {
            EmbeddingProvider::Local
        }
    }
}

/// Retrieval tuning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Final result count
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Expand queries with legal-term synonyms
    #[serde(default = "default_true")]
    pub expand_queries: bool,

    /// Apply cross-encoder reranking when available
    #[serde(default = "default_true")]
    pub use_reranking: bool,

    /// Optional minimum score cut applied before reranking
    #[serde(default)]
    pub min_score: Option<f32>,
}

fn default_top_k() -> usize {
    retrieval::DEFAULT_TOP_K
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            expand_queries: true,
            use_reranking: true,
            min_score: None,
        }
    }
}

/// Reranker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerSettings {
    /// Enable the reranker stage
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Rerank service endpoint
    #[serde(default = "default_rerank_url")]
    pub url: String,

    /// Cross-encoder model name
    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// API key (falls back to JINA_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_rerank_url() -> String {
    endpoints::JINA_RERANK.clone()
}

fn default_rerank_model() -> String {
    crate::constants::reranker::MODEL.to_string()
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_rerank_url(),
            model: default_rerank_model(),
            api_key: std::env::var("JINA_API_KEY").ok(),
        }
    }
}

/// LLM settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Primary provider name ("nvidia" or any configured chat provider)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Wrap the primary provider in a fallback chain
    #[serde(default)]
    pub use_fallback: bool,

    /// Ordered fallback provider names
    #[serde(default)]
    pub fallback_providers: Vec<String>,

    /// Model override (provider default when None)
    #[serde(default)]
    pub model: Option<String>,

    /// Completion budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Skip the LLM-as-judge grounding verification call
    #[serde(default)]
    pub skip_grounding: bool,
}

fn default_provider() -> String {
    "nvidia".to_string()
}

fn default_max_tokens() -> u32 {
    llm::MAX_TOKENS
}

fn default_temperature() -> f32 {
    llm::TEMPERATURE
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            use_fallback: false,
            fallback_providers: Vec::new(),
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            skip_grounding: false,
        }
    }
}

/// Knowledge graph settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgSettings {
    /// Path to the persisted graph JSON (loaded at startup when present)
    #[serde(default = "default_kg_path")]
    pub graph_path: String,

    /// Enable KG-aware score boosting in the retriever
    #[serde(default = "default_true")]
    pub boost_enabled: bool,
}

fn default_kg_path() -> String {
    "data/knowledge_graph.json".to_string()
}

impl Default for KgSettings {
    fn default() -> Self {
        Self {
            graph_path: default_kg_path(),
            boost_enabled: true,
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus `OMNILEX_*` env vars.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("OMNILEX")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(
            collection = %settings.vector_store.collection,
            provider = %settings.llm.provider,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Validate cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature {} out of range [0, 2]",
                self.llm.temperature
            )));
        }
        if let Some(min_score) = self.retrieval.min_score {
            if min_score < 0.0 {
                return Err(ConfigError::Invalid(
                    "retrieval.min_score must be non-negative".into(),
                ));
            }
        }
        Ok(())
    }

    /// Confidence gate below which generation is refused.
    pub fn confidence_threshold(&self) -> f32 {
        generation::CONFIDENCE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.top_k, 5);
        assert!(settings.retrieval.expand_queries);
        assert_eq!(settings.llm.max_tokens, 4096);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut settings = Settings::default();
        settings.llm.temperature = 3.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_embedding_precedence() {
        let settings = EmbeddingSettings {
            use_jina: true,
            use_nvidia: true,
            jina_api_key: Some("jk".to_string()),
            nvidia_api_key: Some("nk".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.provider(), EmbeddingProvider::Jina);

        let settings = EmbeddingSettings {
            use_jina: false,
            use_nvidia: true,
            jina_api_key: Some("jk".to_string()),
            nvidia_api_key: Some("nk".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.provider(), EmbeddingProvider::Nvidia);

        let settings = EmbeddingSettings {
            use_jina: true,
            use_nvidia: false,
            jina_api_key: None,
            nvidia_api_key: None,
            ..Default::default()
        };
        assert_eq!(settings.provider(), EmbeddingProvider::Local);
    }
}
