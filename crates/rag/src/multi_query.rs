//! Multi-Query Fusion
//!
//! Generates five query variants from Indonesian legal templates (zero
//! LLM calls), retrieves each, and merges with RRF. Different phrasings
//! match different regions of the vector space; fusing them captures
//! documents any single query would miss.

use omnilex_core::SearchResult;

use crate::fusion::rrf_merge_default;
use crate::retriever::{SearchOptions, SearchRetriever};
use crate::RagError;

/// Indonesian question/filler words stripped when extracting the core topic.
const STRIP_WORDS: &[&str] = &[
    "apa", "bagaimana", "siapa", "kapan", "dimana", "mengapa", "berapa", "apakah", "itu", "yang",
    "adalah", "dari",
];

/// Query templates applied to the extracted core topic.
const TEMPLATES: [&str; 5] = [
    "{}",
    "Jelaskan tentang {}",
    "Apa ketentuan hukum mengenai {}",
    "Pasal yang mengatur {}",
    "Definisi dan ruang lingkup {}",
];

/// Template-based multi-query retrieval.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiQueryFusion;

impl MultiQueryFusion {
    pub fn new() -> Self {
        Self
    }

    /// Extract the core topic: strip question words and punctuation.
    /// Falls back to the depunctuated question if everything strips away.
    fn extract_core_topic(question: &str) -> String {
        let cleaned: String = question
            .chars()
            .filter(|c| !matches!(c, '?' | '.' | '!' | ',' | ';' | ':'))
            .collect();

        let core = cleaned
            .split_whitespace()
            .filter(|word| !STRIP_WORDS.contains(&word.to_lowercase().as_str()))
            .collect::<Vec<_>>()
            .join(" ");

        if core.is_empty() {
            cleaned.trim().to_string()
        } else {
            core
        }
    }

    /// The five template variants for a question.
    pub fn generate_variants(&self, question: &str) -> Vec<String> {
        let core = Self::extract_core_topic(question);
        tracing::info!(core = %core, "Core topic extracted");
        TEMPLATES
            .iter()
            .map(|template| template.replace("{}", &core))
            .collect()
    }

    /// Retrieve every variant and merge with RRF.
    pub async fn enhanced_search(
        &self,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        let variants = self.generate_variants(question);

        let mut result_lists = Vec::with_capacity(variants.len());
        for variant in &variants {
            let results = retriever
                .hybrid_search(variant, SearchOptions::with_top_k(top_k))
                .await?;
            result_lists.push(results);
        }

        let merged = rrf_merge_default(&result_lists);
        tracing::info!(
            variants = variants.len(),
            unique = merged.len(),
            "Multi-query fusion complete"
        );
        Ok(merged)
    }
}
