//! Corrective RAG (CRAG)
//!
//! Grades retrieval quality by average score and self-corrects when it
//! is poor:
//! - correct (avg ≥ 0.7): keep results as-is
//! - ambiguous (0.3 ≤ avg < 0.7): rephrase the query, RRF-merge both
//! - incorrect (avg < 0.3 or empty): rephrase and replace entirely
//!
//! Without an LLM client, rephrasing degrades to the original question.

use std::sync::Arc;

use omnilex_config::constants::strategy;
use omnilex_core::SearchResult;
use omnilex_llm::{GenerationRequest, LlmBackend};

use crate::fusion::rrf_merge_default;
use crate::retriever::{SearchOptions, SearchRetriever};
use crate::RagError;

/// Three-way retrieval quality grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalGrade {
    Correct,
    Ambiguous,
    Incorrect,
}

/// Corrective retrieval with query rephrasing.
pub struct Crag {
    llm: Option<Arc<dyn LlmBackend>>,
}

impl Crag {
    /// Without an LLM, grading still works but rephrasing is skipped.
    pub fn new(llm: Option<Arc<dyn LlmBackend>>) -> Self {
        tracing::info!(
            rephrasing = llm.is_some(),
            "CRAG initialized"
        );
        Self { llm }
    }

    /// Grade retrieval quality from the average result score.
    ///
    /// Boundary scores grade upward: exactly 0.7 is correct, exactly
    /// 0.3 is ambiguous.
    pub fn grade_retrieval(&self, question: &str, results: &[SearchResult]) -> RetrievalGrade {
        if results.is_empty() {
            tracing::warn!(question = %question.chars().take(50).collect::<String>(),
                "Empty results graded incorrect");
            return RetrievalGrade::Incorrect;
        }

        let avg_score = results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32;
        let grade = if avg_score >= strategy::CRAG_CORRECT_THRESHOLD {
            RetrievalGrade::Correct
        } else if avg_score >= strategy::CRAG_AMBIGUOUS_THRESHOLD {
            RetrievalGrade::Ambiguous
        } else {
            RetrievalGrade::Incorrect
        };

        tracing::info!(avg_score, ?grade, results = results.len(), "Retrieval graded");
        grade
    }

    /// Rephrase the query via LLM; the original passes through when no
    /// LLM is configured or generation fails.
    pub async fn rephrase_query(&self, question: &str) -> String {
        let Some(ref llm) = self.llm else {
            tracing::warn!("No LLM client available, returning original question");
            return question.to_string();
        };

        let prompt = format!(
            "Ulangi pertanyaan hukum berikut dengan kata-kata berbeda untuk \
             menemukan dokumen yang lebih relevan:\n\n{question}\n\nPertanyaan yang diulang:"
        );

        match llm.generate(&GenerationRequest::new(prompt)).await {
            Ok(rephrased) => {
                let rephrased = rephrased.trim().to_string();
                tracing::info!(rephrased = %rephrased.chars().take(50).collect::<String>(),
                    "Query rephrased");
                rephrased
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to rephrase query, using original");
                question.to_string()
            }
        }
    }

    /// Search, grade, and correct.
    pub async fn enhanced_search(
        &self,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        let results = retriever
            .hybrid_search(question, SearchOptions::with_top_k(top_k))
            .await?;
        tracing::info!(count = results.len(), "CRAG initial search");

        match self.grade_retrieval(question, &results) {
            RetrievalGrade::Correct => Ok(results),
            RetrievalGrade::Ambiguous => {
                let rephrased = self.rephrase_query(question).await;
                let rephrased_results = retriever
                    .hybrid_search(&rephrased, SearchOptions::with_top_k(top_k))
                    .await?;
                let merged = rrf_merge_default(&[results, rephrased_results]);
                tracing::info!(unique = merged.len(), "CRAG ambiguous merge");
                Ok(merged)
            }
            RetrievalGrade::Incorrect => {
                let rephrased = self.rephrase_query(question).await;
                let rephrased_results = retriever
                    .hybrid_search(&rephrased, SearchOptions::with_top_k(top_k))
                    .await?;
                tracing::info!(
                    replaced = rephrased_results.len(),
                    "CRAG incorrect replacement"
                );
                Ok(rephrased_results)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use omnilex_core::ChunkMetadata;
    use omnilex_llm::LlmError;
    use tokio::sync::mpsc;

    fn result(citation_id: &str, score: f32) -> SearchResult {
        SearchResult {
            id: citation_id.to_string(),
            text: "teks".to_string(),
            citation: citation_id.to_uppercase(),
            citation_id: citation_id.to_string(),
            score,
            metadata: ChunkMetadata::default(),
        }
    }

    struct RephrasingLlm;

    #[async_trait]
    impl LlmBackend for RephrasingLlm {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
            Ok("Prosedur dan persyaratan pendirian Perseroan Terbatas".to_string())
        }

        async fn generate_stream(
            &self,
            _request: &GenerationRequest,
            _tx: mpsc::Sender<String>,
        ) -> Result<(), LlmError> {
            Ok(())
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    /// Scores results low for the original question and high for the
    /// rephrased query, so corrective behavior is observable.
    struct SplitRetriever;

    #[async_trait]
    impl SearchRetriever for SplitRetriever {
        async fn hybrid_search(
            &self,
            query: &str,
            _options: SearchOptions,
        ) -> Result<Vec<SearchResult>, RagError> {
            if query.contains("Prosedur") {
                Ok(vec![result("rephrased_doc", 0.9)])
            } else {
                Ok(vec![result("original_doc", 0.25)])
            }
        }
    }

    #[test]
    fn test_grade_boundaries() {
        let crag = Crag::new(None);
        assert_eq!(
            crag.grade_retrieval("q", &[result("a", 0.7)]),
            RetrievalGrade::Correct
        );
        assert_eq!(
            crag.grade_retrieval("q", &[result("a", 0.3)]),
            RetrievalGrade::Ambiguous
        );
        assert_eq!(
            crag.grade_retrieval("q", &[result("a", 0.29)]),
            RetrievalGrade::Incorrect
        );
        assert_eq!(crag.grade_retrieval("q", &[]), RetrievalGrade::Incorrect);
    }

    #[test]
    fn test_grade_uses_average() {
        let crag = Crag::new(None);
        let results = vec![result("a", 0.9), result("b", 0.5)];
        assert_eq!(crag.grade_retrieval("q", &results), RetrievalGrade::Correct);
    }

    #[tokio::test]
    async fn test_rephrase_without_llm_passes_through() {
        let crag = Crag::new(None);
        assert_eq!(crag.rephrase_query("tanya").await, "tanya");
    }

    #[tokio::test]
    async fn test_incorrect_grade_replaces_results() {
        let crag = Crag::new(Some(Arc::new(RephrasingLlm)));
        let results = crag
            .enhanced_search("Bagaimana cara mendirikan PT?", &SplitRetriever, 5)
            .await
            .unwrap();
        // avg 0.25 < 0.3: original results discarded entirely
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].citation_id, "rephrased_doc");
    }
}
