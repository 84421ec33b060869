//! Parent-child expansion
//!
//! Small child chunks are indexed for retrieval precision; the full
//! parent context (a complete Pasal or Bab) is returned to the LLM for
//! answer generation. Children map to parents via
//! `metadata.parent_citation_id` against a preloaded parent store.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use omnilex_core::SearchResult;

use crate::retriever::{SearchOptions, SearchRetriever};
use crate::RagError;

/// Parent-expanding retriever over a parent-id → full-text store.
pub struct ParentChildRetriever {
    parent_store: HashMap<String, String>,
}

impl ParentChildRetriever {
    /// An empty store makes `enhanced_search` a pass-through of children.
    pub fn new(parent_store: HashMap<String, String>) -> Self {
        tracing::info!(parents = parent_store.len(), "Parent-child retriever initialized");
        Self { parent_store }
    }

    /// Load the parent store from a JSON object file
    /// (`{"UU_40_2007_Pasal_1": "full text ...", ...}`).
    pub fn from_json_file(path: &Path) -> Result<Self, RagError> {
        let json = fs::read_to_string(path)
            .map_err(|e| RagError::Search(format!("parent store read failed: {e}")))?;
        let parent_store: HashMap<String, String> = serde_json::from_str(&json)
            .map_err(|e| RagError::Search(format!("parent store parse failed: {e}")))?;
        Ok(Self::new(parent_store))
    }

    pub fn is_loaded(&self) -> bool {
        !self.parent_store.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parent_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent_store.is_empty()
    }

    /// Retrieve 2×k children, expand each to its parent text, dedup by
    /// parent id, and stop at k parents. The child's citation, score,
    /// and metadata are preserved; only the text is replaced. Children
    /// pass through unchanged when no parent resolves.
    pub async fn enhanced_search(
        &self,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        let child_results = retriever
            .hybrid_search(question, SearchOptions::with_top_k(top_k * 2))
            .await?;

        if self.parent_store.is_empty() {
            tracing::info!("No parent store available, returning child results");
            let mut children = child_results;
            children.truncate(top_k);
            return Ok(children);
        }

        let mut seen_parents: HashSet<String> = HashSet::new();
        let mut parent_results: Vec<SearchResult> = Vec::new();

        for child in &child_results {
            if parent_results.len() >= top_k {
                break;
            }
            let Some(parent_id) = child.metadata.parent_citation_id.as_deref() else {
                continue;
            };
            if seen_parents.contains(parent_id) {
                continue;
            }
            let Some(parent_text) = self.parent_store.get(parent_id) else {
                continue;
            };

            seen_parents.insert(parent_id.to_string());
            parent_results.push(SearchResult {
                text: parent_text.clone(),
                ..child.clone()
            });
        }

        if parent_results.is_empty() {
            tracing::warn!("No parent documents found, falling back to child results");
            let mut children = child_results;
            children.truncate(top_k);
            return Ok(children);
        }

        tracing::info!(
            children = child_results.len(),
            parents = parent_results.len(),
            "Parent-child expansion complete"
        );
        Ok(parent_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use omnilex_core::ChunkMetadata;

    fn child(citation_id: &str, parent_id: Option<&str>, score: f32) -> SearchResult {
        SearchResult {
            id: citation_id.to_string(),
            text: format!("child text {citation_id}"),
            citation: citation_id.to_uppercase(),
            citation_id: citation_id.to_string(),
            score,
            metadata: ChunkMetadata {
                parent_citation_id: parent_id.map(str::to_string),
                ..Default::default()
            },
        }
    }

    struct FixedRetriever {
        results: Vec<SearchResult>,
    }

    #[async_trait]
    impl SearchRetriever for FixedRetriever {
        async fn hybrid_search(
            &self,
            _query: &str,
            _options: SearchOptions,
        ) -> Result<Vec<SearchResult>, RagError> {
            Ok(self.results.clone())
        }
    }

    #[tokio::test]
    async fn test_parent_expansion_and_dedup() {
        let store = HashMap::from([(
            "UU_40_2007_Pasal_32".to_string(),
            "Full text of Pasal 32".to_string(),
        )]);
        let pcr = ParentChildRetriever::new(store);
        let retriever = FixedRetriever {
            results: vec![
                child("c1", Some("UU_40_2007_Pasal_32"), 0.9),
                child("c2", Some("UU_40_2007_Pasal_32"), 0.8),
            ],
        };

        let results = pcr.enhanced_search("q", &retriever, 5).await.unwrap();
        // Two children, same parent: deduped to one result
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Full text of Pasal 32");
        // Child citation and score preserved
        assert_eq!(results[0].citation_id, "c1");
        assert_eq!(results[0].score, 0.9);
    }

    #[tokio::test]
    async fn test_fallback_without_store() {
        let pcr = ParentChildRetriever::new(HashMap::new());
        let retriever = FixedRetriever {
            results: vec![child("c1", Some("p1"), 0.9), child("c2", None, 0.8)],
        };
        let results = pcr.enhanced_search("q", &retriever, 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].citation_id, "c1");
        assert!(results[0].text.starts_with("child text"));
    }

    #[tokio::test]
    async fn test_fallback_when_no_parent_resolves() {
        let store = HashMap::from([("other".to_string(), "x".to_string())]);
        let pcr = ParentChildRetriever::new(store);
        let retriever = FixedRetriever {
            results: vec![child("c1", Some("missing"), 0.9), child("c2", None, 0.8)],
        };
        let results = pcr.enhanced_search("q", &retriever, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].text.starts_with("child text"));
    }

    #[tokio::test]
    async fn test_stops_at_top_k_parents() {
        let store: HashMap<String, String> = (0..10)
            .map(|i| (format!("p{i}"), format!("parent {i}")))
            .collect();
        let pcr = ParentChildRetriever::new(store);
        let retriever = FixedRetriever {
            results: (0..10)
                .map(|i| child(&format!("c{i}"), Some(&format!("p{i}")), 1.0 - i as f32 * 0.05))
                .collect(),
        };
        let results = pcr.enhanced_search("q", &retriever, 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }
}
