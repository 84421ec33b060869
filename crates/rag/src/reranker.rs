//! Cross-encoder reranking via HTTP service
//!
//! Scores (query, document) pairs with a multilingual cross-encoder
//! (bge-reranker-v2-m3 class). The service is optional: when absent the
//! retriever fetches a larger candidate pool and relies on authority
//! boosting instead.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use omnilex_config::constants::{endpoints, reranker};

use crate::RagError;

/// Reranker configuration
#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Rerank endpoint (Jina-style /v1/rerank API)
    pub url: String,
    /// Cross-encoder model
    pub model: String,
    /// Bearer API key
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl RerankerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: endpoints::JINA_RERANK.clone(),
            model: reranker::MODEL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(reranker::REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Debug, Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}

/// HTTP cross-encoder client
pub struct HttpReranker {
    client: Client,
    config: RerankerConfig,
}

impl HttpReranker {
    pub fn new(config: RerankerConfig) -> Result<Self, RagError> {
        if config.api_key.is_empty() {
            return Err(RagError::Reranker("rerank API key not configured".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        tracing::info!(model = %config.model, "Cross-encoder reranker configured");
        Ok(Self { client, config })
    }

    /// Score each document against the query. Returns one raw score per
    /// document, in input order.
    pub async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, RagError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.config.model,
            "query": query,
            "documents": documents,
            "top_n": documents.len(),
            "return_documents": false,
        });

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Reranker(format!("HTTP {status}: {text}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| RagError::Reranker(format!("invalid response: {e}")))?;

        let mut scores = vec![0.0f32; documents.len()];
        for item in parsed.results {
            if item.index < scores.len() {
                scores[item.index] = item.relevance_score;
            }
        }
        Ok(scores)
    }
}

/// Normalize a raw cross-encoder score into [0, 1].
///
/// Raw scores typically fall in [-5, +5]; the affine map is clamped at
/// both ends.
pub fn normalize_ce_score(raw: f32) -> f32 {
    ((raw + reranker::SCORE_OFFSET) / reranker::SCORE_RANGE).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_midpoint() {
        assert!((normalize_ce_score(0.0) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_normalize_clamped() {
        assert_eq!(normalize_ce_score(-10.0), 0.0);
        assert_eq!(normalize_ce_score(10.0), 1.0);
        assert_eq!(normalize_ce_score(5.0), 1.0);
        assert_eq!(normalize_ce_score(-5.0), 0.0);
    }

    #[test]
    fn test_normalize_monotone() {
        assert!(normalize_ce_score(1.0) > normalize_ce_score(-1.0));
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(HttpReranker::new(RerankerConfig::new("")).is_err());
    }

    #[test]
    fn test_response_parse() {
        let json = r#"{"results": [{"index": 1, "relevance_score": 0.9}, {"index": 0, "relevance_score": 0.2}]}"#;
        let parsed: RerankResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].index, 1);
    }
}
