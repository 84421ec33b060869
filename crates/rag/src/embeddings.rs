//! Embedding backends
//!
//! Provider-agnostic `Embedder` capability with two input modes:
//! `query` for search queries and `passage` for indexed documents.
//! Precedence when several are configured: Jina > NVIDIA > self-hosted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use omnilex_config::constants::{endpoints, retrieval};

use crate::RagError;

/// Embedding capability with query/passage input modes.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embed a batch of document passages (batched ≤ 100 per HTTP call).
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Output dimensionality.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Embeddings ordered by their input index.
    fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|item| item.index);
        self.data.into_iter().map(|item| item.embedding).collect()
    }
}

/// POST a JSON embedding request with exponential backoff.
///
/// 429 waits for the server's Retry-After when present, otherwise the
/// computed backoff; 5xx and timeouts retry with the same schedule.
async fn post_with_backoff(
    client: &Client,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
    max_retries: u32,
    backoff: impl Fn(u32) -> Duration,
    provider: &str,
) -> Result<EmbeddingResponse, RagError> {
    for attempt in 0..=max_retries {
        let result = client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() && attempt < max_retries => {
                let wait = backoff(attempt);
                tracing::warn!(provider, attempt, ?wait, "Embedding request timeout, retrying");
                tokio::time::sleep(wait).await;
                continue;
            }
            Err(e) => return Err(RagError::Embedding(format!("{provider}: {e}"))),
        };

        let status = response.status();

        if status.as_u16() == 429 {
            if attempt < max_retries {
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| Duration::from_secs(secs + 1))
                    .unwrap_or_else(|| backoff(attempt));
                tracing::warn!(provider, attempt, ?wait, "Embedding rate limit, retrying");
                tokio::time::sleep(wait).await;
                continue;
            }
            return Err(RagError::RateLimited(max_retries));
        }

        if status.is_server_error() && attempt < max_retries {
            let wait = backoff(attempt);
            tracing::warn!(provider, %status, attempt, ?wait, "Embedding server error, retrying");
            tokio::time::sleep(wait).await;
            continue;
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "{provider} error {status}: {text}"
            )));
        }

        return response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| RagError::Embedding(format!("{provider}: invalid response: {e}")));
    }

    Err(RagError::Embedding(format!(
        "{provider}: retries exhausted"
    )))
}

/// Jina AI embeddings client (jina-embeddings-v3).
///
/// Task-specific embedding types: `retrieval.passage` for documents and
/// `retrieval.query` for queries. Token limit 8192 with server-side
/// truncation. Aggressive rate-limit handling: up to 10 retries.
pub struct JinaEmbedder {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

impl JinaEmbedder {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RagError> {
        Self::with_model(api_key, "jina-embeddings-v3", retrieval::HTTP_EMBEDDING_DIM)
    }

    pub fn with_model(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, RagError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Embedding("JINA_API_KEY not configured".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        let model = model.into();
        tracing::info!(%model, dimensions, "Initialized Jina embedder");
        Ok(Self {
            client,
            api_url: endpoints::JINA_EMBEDDINGS.clone(),
            api_key,
            model,
            dimensions,
            max_retries: 10,
        })
    }

    async fn request(&self, texts: &[String], task: &str) -> Result<Vec<Vec<f32>>, RagError> {
        let body = json!({
            "model": self.model,
            "input": texts,
            "embedding_type": "float",
            "task": task,
            "dimensions": self.dimensions,
            "normalized": true,
            "truncate": true,
        });
        let response = post_with_backoff(
            &self.client,
            &self.api_url,
            &self.api_key,
            &body,
            self.max_retries,
            // 2s, 4s, 8s, ... doubling per attempt
            |attempt| Duration::from_secs(1 << (attempt + 1).min(10)),
            "jina",
        )
        .await?;
        Ok(response.into_ordered())
    }
}

#[async_trait]
impl Embedder for JinaEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let embeddings = self.request(&[text.to_string()], "retrieval.query").await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("jina: empty embedding response".into()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(retrieval::EMBEDDING_BATCH_SIZE) {
            let embeddings = self.request(batch, "retrieval.passage").await?;
            all.extend(embeddings);
        }
        Ok(all)
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }
}

/// NVIDIA NIM embeddings client (nv-embedqa-e5-v5, 1024-dim).
///
/// The model has a 512-token input limit; inputs are truncated with a
/// conservative 2-characters-per-token heuristic before sending.
pub struct NimEmbedder {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    max_tokens: usize,
}

impl NimEmbedder {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RagError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Embedding("NVIDIA_API_KEY not configured".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        tracing::info!(model = "nvidia/nv-embedqa-e5-v5", "Initialized NVIDIA embedder");
        Ok(Self {
            client,
            api_url: endpoints::NVIDIA_EMBEDDINGS.clone(),
            api_key,
            model: "nvidia/nv-embedqa-e5-v5".to_string(),
            max_retries: 3,
            max_tokens: 512,
        })
    }

    /// Truncate to the model's token limit at ~2 chars per token.
    fn truncate(&self, text: &str) -> String {
        let max_chars = self.max_tokens * 2;
        if text.len() <= max_chars {
            return text.to_string();
        }
        tracing::warn!(
            from = text.len(),
            to = max_chars,
            "Truncating embedding input to token limit"
        );
        let mut end = max_chars;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }

    async fn request(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>, RagError> {
        let truncated: Vec<String> = texts.iter().map(|t| self.truncate(t)).collect();
        let body = json!({
            "input": truncated,
            "model": self.model,
            "encoding_format": "float",
            "input_type": input_type,
        });
        let response = post_with_backoff(
            &self.client,
            &self.api_url,
            &self.api_key,
            &body,
            self.max_retries,
            // 1s, 2s, 4s
            |attempt| Duration::from_secs(1 << attempt.min(10)),
            "nvidia",
        )
        .await?;
        Ok(response.into_ordered())
    }
}

#[async_trait]
impl Embedder for NimEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let embeddings = self.request(&[text.to_string()], "query").await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("nvidia: empty embedding response".into()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(retrieval::EMBEDDING_BATCH_SIZE) {
            let embeddings = self.request(batch, "passage").await?;
            all.extend(embeddings);
        }
        Ok(all)
    }

    fn dimension(&self) -> usize {
        retrieval::HTTP_EMBEDDING_DIM
    }
}

/// Self-hosted fallback: deterministic token-hash embeddings (384-dim).
///
/// Stands in for a local sentence-transformer when no HTTP provider is
/// configured. Tokens hash into feature buckets and the vector is
/// L2-normalized; identical text always embeds identically.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: retrieval::LOCAL_EMBEDDING_DIM,
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in crate::tokenizer::tokenize_indonesian(text) {
            let bucket = (fnv1a64(token.as_bytes()) as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a: stable across processes, unlike the std hasher.
fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.embed(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ordering() {
        let response = EmbeddingResponse {
            data: vec![
                EmbeddingItem {
                    index: 1,
                    embedding: vec![1.0],
                },
                EmbeddingItem {
                    index: 0,
                    embedding: vec![0.0],
                },
            ],
        };
        let ordered = response.into_ordered();
        assert_eq!(ordered[0], vec![0.0]);
        assert_eq!(ordered[1], vec![1.0]);
    }

    #[test]
    fn test_nim_truncation() {
        let embedder = NimEmbedder {
            client: Client::new(),
            api_url: String::new(),
            api_key: "k".to_string(),
            model: String::new(),
            max_retries: 0,
            max_tokens: 4,
        };
        let truncated = embedder.truncate("abcdefghijkl");
        assert_eq!(truncated, "abcdefgh"); // 4 tokens * 2 chars
        assert_eq!(embedder.truncate("abc"), "abc");
    }

    #[tokio::test]
    async fn test_hash_embedder_deterministic_and_normalized() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_query("pendirian perseroan terbatas").await.unwrap();
        let b = embedder.embed_query("pendirian perseroan terbatas").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hash_embedder_distinguishes_texts() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_query("upah minimum regional").await.unwrap();
        let b = embedder.embed_query("pajak pertambahan nilai").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_keys_rejected() {
        assert!(JinaEmbedder::new("").is_err());
        assert!(NimEmbedder::new("").is_err());
    }

    #[tokio::test]
    async fn test_empty_document_batch() {
        let embedder = HashEmbedder::new();
        let out = embedder.embed_documents(&[]).await.unwrap();
        assert!(out.is_empty());
    }
}
