//! Agentic retrieval orchestration
//!
//! Rule-based strategy selection over the adaptive techniques; no LLM
//! calls are spent on routing. Different questions want different
//! retrieval: compound questions decompose, definition questions go
//! through HyDE, and poor intermediate results trigger refinement.
//!
//! The loop runs at most `MAX_ITERATIONS` rounds and exits early once
//! the average score is good enough. Each round's decision is kept in an
//! audit log for observability; the log is not part of the result.

use omnilex_config::constants::strategy;
use omnilex_core::SearchResult;

use crate::crag::Crag;
use crate::hyde::Hyde;
use crate::multi_query::MultiQueryFusion;
use crate::planner::QueryPlanner;
use crate::retriever::{SearchOptions, SearchRetriever};
use crate::RagError;

/// Compound-question keywords for first-iteration routing.
const COMPOUND_KEYWORDS: &[&str] = &["dan", "serta", "antara"];

/// Definition-question keywords for first-iteration routing.
const DEFINITION_KEYWORDS: &[&str] = &["definisi", "apa itu", "pengertian"];

/// Retrieval strategy selected for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Direct,
    Hyde,
    Decompose,
    MultiQuery,
    RefineQuery,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Hyde => "hyde",
            StrategyKind::Decompose => "decompose",
            StrategyKind::MultiQuery => "multi_query",
            StrategyKind::RefineQuery => "refine_query",
        };
        f.write_str(s)
    }
}

/// One audit-log entry per iteration.
#[derive(Debug, Clone)]
pub struct StrategyDecision {
    pub iteration: usize,
    pub strategy: StrategyKind,
    pub result_count: usize,
    pub avg_score: f32,
}

/// Rule-based agentic retrieval over the adaptive techniques.
///
/// Every technique is optional; a selected-but-missing technique falls
/// back to direct search.
pub struct AgenticRag {
    hyde: Option<Hyde>,
    crag: Option<Crag>,
    multi_query: Option<MultiQueryFusion>,
    query_planner: Option<QueryPlanner>,
    audit_log: parking_lot::Mutex<Vec<StrategyDecision>>,
}

impl AgenticRag {
    pub fn new(
        hyde: Option<Hyde>,
        crag: Option<Crag>,
        multi_query: Option<MultiQueryFusion>,
        query_planner: Option<QueryPlanner>,
    ) -> Self {
        tracing::info!("Agentic retrieval initialized (rule-based strategy selection)");
        Self {
            hyde,
            crag,
            multi_query,
            query_planner,
            audit_log: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Select a strategy from question shape (first iteration) or result
    /// quality (subsequent iterations).
    ///
    /// Rules in priority order:
    /// - with previous results: avg < 0.3 → refine_query; avg < 0.5 → multi_query
    /// - first iteration: > 15 words or compound keyword → decompose;
    ///   definition keyword → hyde
    /// - otherwise direct
    pub fn select_strategy(
        &self,
        question: &str,
        previous_results: Option<&[SearchResult]>,
    ) -> StrategyKind {
        if let Some(results) = previous_results {
            let avg_score = if results.is_empty() {
                0.0
            } else {
                results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32
            };

            if avg_score < strategy::REFINE_AVG_SCORE {
                tracing::info!(avg_score, "Strategy: refine_query");
                return StrategyKind::RefineQuery;
            }
            if avg_score < strategy::SUFFICIENT_AVG_SCORE {
                tracing::info!(avg_score, "Strategy: multi_query");
                return StrategyKind::MultiQuery;
            }
        } else {
            let question_lower = question.to_lowercase();
            let word_count = question.split_whitespace().count();

            if word_count > strategy::DECOMPOSE_WORD_COUNT
                || COMPOUND_KEYWORDS
                    .iter()
                    .any(|keyword| question_lower.contains(keyword))
            {
                tracing::info!(word_count, "Strategy: decompose");
                return StrategyKind::Decompose;
            }

            if DEFINITION_KEYWORDS
                .iter()
                .any(|keyword| question_lower.contains(keyword))
            {
                tracing::info!("Strategy: hyde (definition question)");
                return StrategyKind::Hyde;
            }
        }

        tracing::info!("Strategy: direct (default)");
        StrategyKind::Direct
    }

    /// Iterative retrieval loop with per-round strategy selection and
    /// early exit once the average score reaches the sufficiency bar.
    pub async fn enhanced_search(
        &self,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        tracing::info!(question = %question.chars().take(50).collect::<String>(),
            "Agentic search");

        self.audit_log.lock().clear();
        let mut results: Vec<SearchResult> = Vec::new();

        for iteration in 0..strategy::MAX_ITERATIONS {
            let selected = self.select_strategy(
                question,
                if iteration > 0 {
                    Some(results.as_slice())
                } else {
                    None
                },
            );

            tracing::info!(
                iteration = iteration + 1,
                max = strategy::MAX_ITERATIONS,
                strategy = %selected,
                "Agentic iteration"
            );

            results = self
                .execute_strategy(selected, question, retriever, top_k)
                .await;

            let avg_score = if results.is_empty() {
                0.0
            } else {
                results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32
            };

            self.audit_log.lock().push(StrategyDecision {
                iteration: iteration + 1,
                strategy: selected,
                result_count: results.len(),
                avg_score,
            });

            if !results.is_empty() && avg_score >= strategy::SUFFICIENT_AVG_SCORE {
                tracing::info!(avg_score, iteration = iteration + 1, "Early exit");
                break;
            }
        }

        tracing::info!(results = results.len(), "Agentic search complete");
        Ok(results)
    }

    /// Audit log from the most recent `enhanced_search` run.
    pub fn decisions(&self) -> Vec<StrategyDecision> {
        self.audit_log.lock().clone()
    }

    /// Execute one strategy; a missing technique or an error falls back
    /// to direct search.
    async fn execute_strategy(
        &self,
        selected: StrategyKind,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let outcome = match selected {
            StrategyKind::Hyde => match &self.hyde {
                Some(hyde) => hyde.enhanced_search(question, retriever, top_k).await,
                None => {
                    tracing::warn!("HyDE not available, falling back to direct search");
                    self.direct(question, retriever, top_k).await
                }
            },
            StrategyKind::Decompose => match &self.query_planner {
                Some(planner) => planner.multi_hop_search(question, retriever, top_k).await,
                None => {
                    tracing::warn!("QueryPlanner not available, falling back to direct search");
                    self.direct(question, retriever, top_k).await
                }
            },
            StrategyKind::MultiQuery => match &self.multi_query {
                Some(multi_query) => multi_query.enhanced_search(question, retriever, top_k).await,
                None => {
                    tracing::warn!("MultiQuery not available, falling back to direct search");
                    self.direct(question, retriever, top_k).await
                }
            },
            StrategyKind::RefineQuery => match &self.crag {
                Some(crag) => crag.enhanced_search(question, retriever, top_k).await,
                None => {
                    tracing::warn!("CRAG not available, falling back to direct search");
                    self.direct(question, retriever, top_k).await
                }
            },
            StrategyKind::Direct => self.direct(question, retriever, top_k).await,
        };

        match outcome {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(strategy = %selected, error = %e,
                    "Strategy failed, falling back to direct search");
                self.direct(question, retriever, top_k)
                    .await
                    .unwrap_or_default()
            }
        }
    }

    async fn direct(
        &self,
        question: &str,
        retriever: &dyn SearchRetriever,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        retriever
            .hybrid_search(question, SearchOptions::with_top_k(top_k))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use omnilex_core::ChunkMetadata;

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

    struct FixedScoreRetriever {
        score: f32,
    }

    #[async_trait]
    impl SearchRetriever for FixedScoreRetriever {
        async fn hybrid_search(
            &self,
            _query: &str,
            _options: SearchOptions,
        ) -> Result<Vec<SearchResult>, RagError> {
            Ok(vec![result("doc", self.score)])
        }
    }

    fn bare_agent() -> AgenticRag {
        AgenticRag::new(None, None, None, None)
    }

    #[test]
    fn test_first_iteration_definition_selects_hyde() {
        let agent = bare_agent();
        assert_eq!(
            agent.select_strategy("Apa itu PT?", None),
            StrategyKind::Hyde
        );
        assert_eq!(
            agent.select_strategy("pengertian pesangon", None),
            StrategyKind::Hyde
        );
    }

    #[test]
    fn test_first_iteration_compound_selects_decompose() {
        let agent = bare_agent();
        assert_eq!(
            agent.select_strategy("Apa perbedaan PT dan CV serta cara mendirikannya?", None),
            StrategyKind::Decompose
        );
    }

    #[test]
    fn test_first_iteration_long_question_selects_decompose() {
        let agent = bare_agent();
        let long_question = "kata ".repeat(16);
        assert_eq!(
            agent.select_strategy(&long_question, None),
            StrategyKind::Decompose
        );
    }

    #[test]
    fn test_first_iteration_default_direct() {
        let agent = bare_agent();
        assert_eq!(
            agent.select_strategy("Syarat pendirian koperasi", None),
            StrategyKind::Direct
        );
    }

    #[test]
    fn test_intermediate_low_scores_refine() {
        let agent = bare_agent();
        let poor = vec![result("a", 0.2), result("b", 0.25)];
        assert_eq!(
            agent.select_strategy("q", Some(&poor)),
            StrategyKind::RefineQuery
        );
    }

    #[test]
    fn test_intermediate_mediocre_scores_multi_query() {
        let agent = bare_agent();
        let mediocre = vec![result("a", 0.4), result("b", 0.45)];
        assert_eq!(
            agent.select_strategy("q", Some(&mediocre)),
            StrategyKind::MultiQuery
        );
    }

    #[tokio::test]
    async fn test_good_results_exit_after_one_iteration() {
        let agent = bare_agent();
        let retriever = FixedScoreRetriever { score: 0.8 };
        let results = agent
            .enhanced_search("Syarat pendirian koperasi", &retriever, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(agent.decisions().len(), 1);
        assert_eq!(agent.decisions()[0].strategy, StrategyKind::Direct);
    }

    #[tokio::test]
    async fn test_poor_results_use_all_iterations() {
        let agent = bare_agent();
        let retriever = FixedScoreRetriever { score: 0.1 };
        let results = agent
            .enhanced_search("Syarat pendirian koperasi", &retriever, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let decisions = agent.decisions();
        assert_eq!(decisions.len(), 3);
        // Later iterations see the poor results and pick refinement,
        // which degrades to direct without a CRAG instance
        assert_eq!(decisions[1].strategy, StrategyKind::RefineQuery);
    }
}
