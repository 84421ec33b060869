//! Reciprocal Rank Fusion
//!
//! Shared merge used by every multi-list strategy (HyDE, CRAG,
//! Multi-Query, query decomposition). A document at rank `r` (1-based)
//! in a list contributes `1 / (k + r)`; documents appearing in several
//! lists accumulate. Ordering is deterministic: score descending with
//! ties broken by citation id.

use std::collections::HashMap;

use omnilex_core::SearchResult;
use omnilex_config::constants::retrieval;

/// Merge result lists with RRF, keyed by citation id.
pub fn rrf_merge(result_lists: &[Vec<SearchResult>], k: f32) -> Vec<SearchResult> {
    let mut rrf_scores: HashMap<String, f32> = HashMap::new();
    let mut doc_map: HashMap<String, SearchResult> = HashMap::new();

    for result_list in result_lists {
        for (rank, result) in result_list.iter().enumerate() {
            let doc_id = result.citation_id.clone();
            let rrf_score = 1.0 / (k + rank as f32 + 1.0);
            *rrf_scores.entry(doc_id.clone()).or_default() += rrf_score;
            doc_map.entry(doc_id).or_insert_with(|| result.clone());
        }
    }

    let mut merged: Vec<SearchResult> = doc_map
        .into_iter()
        .map(|(doc_id, result)| {
            let score = rrf_scores.get(&doc_id).copied().unwrap_or_default();
            result.with_score(score)
        })
        .collect();

    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.citation_id.cmp(&b.citation_id))
    });
    merged
}

/// RRF merge with the standard constant.
pub fn rrf_merge_default(result_lists: &[Vec<SearchResult>]) -> Vec<SearchResult> {
    rrf_merge(result_lists, retrieval::RRF_K)
}
