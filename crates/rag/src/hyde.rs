//! HyDE (Hypothetical Document Embeddings)
//!
//! Generates a hypothetical answer to the question via LLM, then
//! retrieves with BOTH the original question and the hypothetical,
//! merging results with RRF. The hypothetical is semantically closer to
//! formal legal text than the raw question, bridging the vocabulary gap
//! between user phrasing and regulation language.

use std::sync::Arc;

use omnilex_core::SearchResult;
use omnilex_llm::{GenerationRequest, LlmBackend};

use crate::fusion::rrf_merge_default;
use crate::retriever::{SearchOptions, SearchRetriever};
use crate::RagError;

const HYDE_SYSTEM_PROMPT: &str =
    "Anda adalah ahli hukum Indonesia yang menulis dengan bahasa formal hukum.";

/// HyDE retrieval strategy.
pub struct Hyde {
    llm: Arc<dyn LlmBackend>,
}

impl Hyde {
    pub fn new(llm: Arc<dyn LlmBackend>) -> Self {
        Self { llm }
    }

    /// Generate a 100-200 word hypothetical answer in legal style.
    /// Falls back to the original question on LLM failure.
    pub async fn generate_hypothetical(&self, question: &str) -> String {
        let prompt = format!(
            "Bayangkan Anda menulis jawaban ideal untuk pertanyaan hukum ini.\n\
             Tulis paragraf singkat (100-200 kata) yang menjawab pertanyaan seolah-olah Anda adalah ahli hukum Indonesia.\n\
             Jangan sebutkan bahwa Anda tidak tahu atau butuh konteks lebih. Langsung tulis jawabannya menggunakan bahasa formal hukum.\n\n\
             Pertanyaan: {question}\n\n\
             Jawaban ideal (100-200 kata):"
        );

        let request = GenerationRequest::new(prompt).with_system(HYDE_SYSTEM_PROMPT);
        match self.llm.generate(&request).await {
            Ok(hypothetical) => {
                tracing::info!(chars = hypothetical.len(), "Generated hypothetical answer");
                hypothetical.trim().to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Hypothetical generation failed, using question");
                question.to_string()
            }
        }
    }

    /// Search with both the question and its hypothetical, RRF-merged.
    ///
    /// Empty results from one search degrade to the other list alone.
    pub async fn enhanced_search(
        &self,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        tracing::info!(question = %truncate(question, 50), "HyDE enhanced search");

        let hypothetical = self.generate_hypothetical(question).await;

        let question_results = retriever
            .hybrid_search(question, SearchOptions::with_top_k(top_k))
            .await?;
        let hypothetical_results = retriever
            .hybrid_search(&hypothetical, SearchOptions::with_top_k(top_k))
            .await?;

        if question_results.is_empty() && hypothetical_results.is_empty() {
            tracing::warn!("Both HyDE searches returned empty results");
            return Ok(Vec::new());
        }
        if question_results.is_empty() {
            return Ok(hypothetical_results);
        }
        if hypothetical_results.is_empty() {
            return Ok(question_results);
        }

        let merged = rrf_merge_default(&[question_results, hypothetical_results]);
        tracing::info!(unique = merged.len(), "HyDE merge complete");
        Ok(merged)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::SearchOptions;
    use async_trait::async_trait;
    use omnilex_core::ChunkMetadata;
    use omnilex_llm::LlmError;
    use tokio::sync::mpsc;

    struct FixedLlm {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmBackend for FixedLlm {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
            self.response
                .clone()
                .ok_or_else(|| LlmError::Api("down".to_string()))
        }

        async fn generate_stream(
            &self,
            _request: &GenerationRequest,
            _tx: mpsc::Sender<String>,
        ) -> Result<(), LlmError> {
            Err(LlmError::Api("down".to_string()))
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct ScriptedRetriever;

    #[async_trait]
    impl SearchRetriever for ScriptedRetriever {
        async fn hybrid_search(
            &self,
            query: &str,
            _options: SearchOptions,
        ) -> Result<Vec<SearchResult>, RagError> {
            // The hypothetical query surfaces a different document
            let citation_id = if query.contains("perseroan") {
                "uu_40_2007_pasal_7"
            } else {
                "uu_40_2007_pasal_1"
            };
            Ok(vec![SearchResult {
                id: citation_id.to_string(),
                text: "isi".to_string(),
                citation: citation_id.to_uppercase(),
                citation_id: citation_id.to_string(),
                score: 0.8,
                metadata: ChunkMetadata::default(),
            }])
        }
    }

    #[tokio::test]
    async fn test_hypothetical_fallback_on_llm_failure() {
        let hyde = Hyde::new(Arc::new(FixedLlm { response: None }));
        let hypothetical = hyde.generate_hypothetical("Apa itu PT?").await;
        assert_eq!(hypothetical, "Apa itu PT?");
    }

    #[tokio::test]
    async fn test_enhanced_search_merges_both_lists() {
        let hyde = Hyde::new(Arc::new(FixedLlm {
            response: Some(
                "Untuk mendirikan perseroan terbatas diperlukan akta pendirian".to_string(),
            ),
        }));
        let results = hyde
            .enhanced_search("Apa itu PT?", &ScriptedRetriever, 5)
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.citation_id.as_str()).collect();
        assert!(ids.contains(&"uu_40_2007_pasal_1"));
        assert!(ids.contains(&"uu_40_2007_pasal_7"));
    }
}
