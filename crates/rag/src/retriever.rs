//! Hybrid retriever
//!
//! Fuses dense vector search and sparse BM25 with Reciprocal Rank
//! Fusion, then applies knowledge-graph boosting, document-authority
//! boosting, and optional cross-encoder reranking.
//!
//! Legal reference auto-filtering: when no explicit filter is given the
//! query is scanned for structured references ("Pasal 5 UU 11/2020")
//! and the extracted fields become an exact-match payload filter. A
//! filtered search that returns zero dense results is retried once
//! without the filter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;

use omnilex_config::constants::retrieval;
use omnilex_core::{regulation_id_from_metadata, SearchResult};
use omnilex_kg::LegalKnowledgeGraph;

use crate::embeddings::Embedder;
use crate::expansion::QueryExpander;
use crate::legal_refs::detect_legal_references;
use crate::reranker::{normalize_ce_score, HttpReranker};
use crate::sparse::SparseCorpus;
use crate::vector_store::{SearchFilter, VectorStore};
use crate::RagError;

/// National-law cue phrases. A query containing any of these is about
/// national legislation, so Perda chunks are deprioritized when no
/// reranker is available to sort them out.
const NATIONAL_LAW_KEYWORDS: &[&str] = &[
    // PT/company formation
    "mendirikan pt",
    "pendirian pt",
    "syarat pt",
    "badan hukum",
    "perseroan terbatas",
    "modal dasar",
    "akta pendirian",
    // Employment/labor (national UU 13/2003)
    "phk",
    "pesangon",
    "upah minimum",
    "hubungan kerja",
    "perjanjian kerja",
    // National regulations explicitly mentioned
    "undang-undang",
    "peraturan pemerintah",
    "hukum nasional",
];

/// Document-type authority multipliers applied after fusion.
fn authority_multiplier(jenis_dokumen: Option<&str>) -> f32 {
    let Some(jenis) = jenis_dokumen else {
        return 1.0;
    };
    retrieval::AUTHORITY_MULTIPLIERS
        .iter()
        .find(|(key, _)| *key == jenis)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(1.0)
}

/// Per-call search options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of final results
    pub top_k: usize,
    /// Accepted for API compatibility; RRF makes the weight moot
    pub dense_weight: f32,
    /// Dense candidate count (default: top_k × pool multiplier)
    pub dense_top_k: Option<usize>,
    /// Sparse candidate count (default: top_k × pool multiplier)
    pub sparse_top_k: Option<usize>,
    /// Explicit payload filter; disables legal-reference auto-detection
    pub filter: Option<SearchFilter>,
    /// Apply cross-encoder reranking when available
    pub use_reranking: bool,
    /// Expand the query with legal-term synonyms
    pub expand_queries: bool,
    /// Drop candidates below this score before reranking
    pub min_score: Option<f32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: retrieval::DEFAULT_TOP_K,
            dense_weight: 0.6,
            dense_top_k: None,
            sparse_top_k: None,
            filter: None,
            use_reranking: true,
            expand_queries: true,
            min_score: None,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }
}

/// Retrieval seam used by the adaptive strategies and the chain. Lets
/// tests substitute a scripted retriever for the full stack.
#[async_trait]
pub trait SearchRetriever: Send + Sync {
    async fn hybrid_search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, RagError>;

    /// Search within a single document type.
    async fn search_by_document_type(
        &self,
        query: &str,
        jenis_dokumen: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        self.hybrid_search(
            query,
            SearchOptions {
                top_k,
                filter: Some(SearchFilter::new().jenis_dokumen(jenis_dokumen)),
                ..Default::default()
            },
        )
        .await
    }
}

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Enable the KG boost stage
    pub kg_boost_enabled: bool,
    /// KG 1-hop boost deadline
    pub kg_boost_timeout: Duration,
    /// KG boost multiplier
    pub kg_boost_factor: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            kg_boost_enabled: true,
            kg_boost_timeout: Duration::from_millis(retrieval::KG_BOOST_TIMEOUT_MS),
            kg_boost_factor: retrieval::KG_BOOST_FACTOR,
        }
    }
}

/// Retriever statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct RetrieverStats {
    pub collection: String,
    pub corpus_loaded: usize,
    pub bm25_initialized: bool,
    pub reranker_available: bool,
    pub kg_loaded: bool,
    pub embedding_dim: usize,
}

/// Hybrid retriever over dense + sparse + KG + reranker.
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<VectorStore>,
    corpus: Option<Arc<SparseCorpus>>,
    reranker: Option<Arc<HttpReranker>>,
    knowledge_graph: Option<Arc<LegalKnowledgeGraph>>,
    expander: QueryExpander,
    config: RetrieverConfig,
}

impl HybridRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
            corpus: None,
            reranker: None,
            knowledge_graph: None,
            expander: QueryExpander::new(),
            config: RetrieverConfig::default(),
        }
    }

    /// Attach the BM25 corpus (built from a startup scroll).
    pub fn with_corpus(mut self, corpus: Arc<SparseCorpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Attach the cross-encoder reranker.
    pub fn with_reranker(mut self, reranker: Arc<HttpReranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Attach the knowledge graph for relation-aware boosting.
    pub fn with_knowledge_graph(mut self, knowledge_graph: Arc<LegalKnowledgeGraph>) -> Self {
        self.knowledge_graph = Some(knowledge_graph);
        self
    }

    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Dense vector search for a single query string.
    pub async fn dense_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let embedding = self.embedder.embed_query(query).await?;
        self.vector_store
            .query_points(&embedding, top_k, filter)
            .await
    }

    /// Sparse BM25 search; CPU-bound scoring runs off the async executor.
    pub async fn sparse_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        let Some(corpus) = self.corpus.clone() else {
            return Ok(Vec::new());
        };
        let query = query.to_string();
        tokio::task::spawn_blocking(move || corpus.search(&query, top_k))
            .await
            .map_err(|e| RagError::Search(format!("sparse search task failed: {e}")))
    }

    /// Candidate pool multiplier: a reranker filters a larger pool; no
    /// reranker at all needs an even larger pool for authority boosting.
    fn pool_multiplier(&self, use_reranking: bool) -> usize {
        if use_reranking && self.reranker.is_some() {
            retrieval::POOL_MULTIPLIER_RERANK
        } else if self.reranker.is_none() {
            retrieval::POOL_MULTIPLIER_NO_RERANK
        } else {
            retrieval::POOL_MULTIPLIER_DEFAULT
        }
    }

    /// Dedup by chunk id keeping the best score, sorted descending.
    fn dedup(results: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut best: HashMap<String, SearchResult> = HashMap::new();
        for result in results {
            match best.get(&result.id) {
                Some(existing) if existing.score >= result.score => {}
                _ => {
                    best.insert(result.id.clone(), result);
                }
            }
        }
        let mut deduped: Vec<SearchResult> = best.into_values().collect();
        deduped.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        deduped
    }

    /// RRF fusion keyed by chunk id, rank starting at 1.
    fn rrf_fusion(
        dense: &[SearchResult],
        sparse: &[SearchResult],
    ) -> Vec<SearchResult> {
        let mut rrf_scores: HashMap<String, f32> = HashMap::new();
        let mut result_map: HashMap<String, SearchResult> = HashMap::new();

        for results in [dense, sparse] {
            for (rank, result) in results.iter().enumerate() {
                let rrf = 1.0 / (retrieval::RRF_K + rank as f32 + 1.0);
                *rrf_scores.entry(result.id.clone()).or_default() += rrf;
                result_map
                    .entry(result.id.clone())
                    .or_insert_with(|| result.clone());
            }
        }

        let mut fused: Vec<SearchResult> = result_map
            .into_iter()
            .map(|(id, result)| {
                let score = rrf_scores.get(&id).copied().unwrap_or_default();
                result.with_score(score)
            })
            .collect();
        fused.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        fused
    }

    /// Boost candidates whose regulation is KG-related to the top hits.
    ///
    /// 1-hop traversal from the top-5 candidates' regulations under a
    /// hard deadline; related candidates get a multiplicative boost.
    /// Deadline expiry degrades to no boost.
    fn boost_with_kg(&self, candidates: Vec<SearchResult>) -> Vec<SearchResult> {
        let Some(ref kg) = self.knowledge_graph else {
            return candidates;
        };
        if !self.config.kg_boost_enabled {
            return candidates;
        }

        let source_reg_ids: Vec<String> = candidates
            .iter()
            .take(5)
            .filter_map(|r| regulation_id_from_metadata(&r.metadata))
            .collect();
        if source_reg_ids.is_empty() {
            return candidates;
        }

        let mut related_reg_ids: std::collections::HashSet<String> =
            std::collections::HashSet::new();
        for reg_id in &source_reg_ids {
            for related in kg.get_related_regulations(reg_id, 1, self.config.kg_boost_timeout) {
                related_reg_ids.insert(related.node.id().to_string());
            }
        }
        if related_reg_ids.is_empty() {
            return candidates;
        }

        tracing::debug!(
            sources = source_reg_ids.len(),
            related = related_reg_ids.len(),
            "KG boost applied"
        );

        let mut boosted: Vec<SearchResult> = candidates
            .into_iter()
            .map(|result| {
                match regulation_id_from_metadata(&result.metadata) {
                    Some(reg_id) if related_reg_ids.contains(&reg_id) => {
                        let score = result.score * self.config.kg_boost_factor;
                        result.with_score(score)
                    }
                    _ => result,
                }
            })
            .collect();
        boosted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        boosted
    }

    /// Authority boost: UU > PP > Perpres > Permen > Perda. Without a
    /// reranker this keeps regional Perda chunks from outranking
    /// national chunks on near-identical similarity.
    fn boost_with_authority(candidates: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut boosted: Vec<SearchResult> = candidates
            .into_iter()
            .map(|result| {
                let multiplier = authority_multiplier(result.metadata.jenis_dokumen.as_deref());
                let score = result.score * multiplier;
                result.with_score(score)
            })
            .collect();
        boosted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        boosted
    }

    fn is_national_law_query(query: &str) -> bool {
        let query_lower = query.to_lowercase();
        NATIONAL_LAW_KEYWORDS
            .iter()
            .any(|keyword| query_lower.contains(keyword))
    }

    /// National docs first for national-law queries (no-reranker path).
    /// Perda only fills in when fewer than top_k national docs exist.
    fn prioritize_national_docs(
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let national_types = ["UU", "PP", "Perpres", "Permen"];
        let (national, regional): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|result| {
                result
                    .metadata
                    .jenis_dokumen
                    .as_deref()
                    .map(|jenis| national_types.contains(&jenis))
                    .unwrap_or(false)
            });
        tracing::debug!(
            national = national.len(),
            regional = regional.len(),
            "National-law query prioritization"
        );
        let mut prioritized = national;
        prioritized.extend(regional);
        prioritized.truncate(top_k * 2);
        prioritized
    }

    /// Rerank candidates with the cross-encoder; scores normalize into
    /// [0, 1]. A reranker failure degrades to the unreranked ordering.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let Some(ref reranker) = self.reranker else {
            let mut out = candidates;
            out.truncate(top_k);
            return out;
        };
        if candidates.is_empty() {
            return candidates;
        }

        let documents: Vec<String> = candidates.iter().map(|r| r.text.clone()).collect();
        match reranker.score(query, &documents).await {
            Ok(scores) => {
                let mut scored: Vec<SearchResult> = candidates
                    .into_iter()
                    .zip(scores)
                    .map(|(result, raw)| result.with_score(normalize_ce_score(raw)))
                    .collect();
                scored.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.id.cmp(&b.id))
                });
                scored.truncate(top_k);
                scored
            }
            Err(e) => {
                tracing::warn!(error = %e, "Re-ranking failed, returning fused ordering");
                let mut out = candidates;
                out.truncate(top_k);
                out
            }
        }
    }

    /// Run dense searches for every query variant concurrently.
    async fn dense_fan_out(
        &self,
        variants: &[String],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let futures = variants.iter().map(|variant| {
            let filter = filter.cloned();
            async move { self.dense_search(variant, top_k, filter).await }
        });
        Ok(try_join_all(futures).await?.into_iter().flatten().collect())
    }

    /// Retriever stats for diagnostics.
    pub fn stats(&self) -> RetrieverStats {
        RetrieverStats {
            collection: self.vector_store.collection().to_string(),
            corpus_loaded: self.corpus.as_ref().map(|c| c.len()).unwrap_or(0),
            bm25_initialized: self.corpus.is_some(),
            reranker_available: self.reranker.is_some(),
            kg_loaded: self.knowledge_graph.is_some(),
            embedding_dim: self.embedder.dimension(),
        }
    }

    /// Chunk counts grouped by base regulation id.
    pub fn chunk_counts_by_regulation(&self) -> HashMap<String, usize> {
        self.corpus
            .as_ref()
            .map(|corpus| corpus.chunk_counts_by_regulation())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchRetriever for HybridRetriever {
    async fn hybrid_search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, RagError> {
        let top_k = options.top_k;
        let multiplier = self.pool_multiplier(options.use_reranking);
        let dense_top_k = options.dense_top_k.unwrap_or(top_k * multiplier);
        let sparse_top_k = options.sparse_top_k.unwrap_or(top_k * multiplier);

        // Legal reference auto-detection when no explicit filter given
        let mut auto_detected = false;
        let filter = match options.filter {
            Some(filter) => Some(filter),
            None => match detect_legal_references(query) {
                Some(reference) => {
                    auto_detected = true;
                    Some(reference.into())
                }
                None => None,
            },
        };

        // Query variants
        let variants: Vec<String> = if options.expand_queries {
            let expanded = self.expander.expand(query);
            tracing::debug!(count = expanded.len(), "Query expanded");
            expanded
        } else {
            vec![query.to_string()]
        };

        // Dense and sparse fan-out across variants, joined before fusion
        let dense_future = self.dense_fan_out(&variants, dense_top_k, filter.as_ref());
        let sparse_future = async {
            let mut all = Vec::new();
            for variant in &variants {
                all.extend(self.sparse_search(variant, sparse_top_k).await?);
            }
            Ok::<Vec<SearchResult>, RagError>(all)
        };
        let (dense_result, sparse_result) = tokio::join!(dense_future, sparse_future);
        let mut all_dense = dense_result?;
        let all_sparse = sparse_result?;

        // Filter fallback: a zero-result auto-filter is dropped exactly
        // once and the dense stage re-runs unfiltered
        if auto_detected && all_dense.is_empty() {
            tracing::info!("Auto-detected filter returned 0 dense results; retrying unfiltered");
            all_dense = self.dense_fan_out(&variants, dense_top_k, None).await?;
        }

        // Per-stage dedup, then RRF fusion
        let dense_deduped = Self::dedup(all_dense);
        let sparse_deduped = Self::dedup(all_sparse);
        let fused = Self::rrf_fusion(&dense_deduped, &sparse_deduped);

        // Wider candidate slice for boosting and reranking
        let mut candidates: Vec<SearchResult> =
            fused.into_iter().take(top_k * 2).collect();

        candidates = self.boost_with_kg(candidates);
        candidates = Self::boost_with_authority(candidates);

        if self.reranker.is_none() && Self::is_national_law_query(query) {
            candidates = Self::prioritize_national_docs(candidates, top_k);
        }

        if let Some(min_score) = options.min_score {
            candidates.retain(|result| result.score >= min_score);
            tracing::debug!(
                remaining = candidates.len(),
                min_score,
                "Applied minimum score cut"
            );
        }

        if options.use_reranking && self.reranker.is_some() {
            return Ok(self.rerank(query, candidates, top_k).await);
        }

        candidates.truncate(top_k);
        Ok(candidates)
    }
}
