//! The legal RAG chain
//!
//! One request flows: retrieve (adaptive strategy cascade) → context
//! assembly → confidence gate → generation → metadata extraction →
//! citation validation → grounding verification. Empty retrieval and
//! low confidence short-circuit into fixed Indonesian refusals without
//! spending an LLM call.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;

use omnilex_config::constants::generation;
use omnilex_core::SearchResult;
use omnilex_llm::{GenerationRequest, LlmBackend};
use omnilex_rag::crag::RetrievalGrade;
use omnilex_rag::{
    tokenize_indonesian, AgenticRag, Crag, Hyde, MultiQueryFusion, ParentChildRetriever,
    QueryPlanner, SearchOptions, SearchRetriever,
};

use crate::confidence::assess_confidence;
use crate::grounding::verify_grounding;
use crate::prompts::{
    build_user_prompt, detect_question_type, provider_tuning, AnswerMode, SYSTEM_PROMPT_COT,
    VERBATIM_SYSTEM_PROMPT,
};
use crate::response::{
    round4, snippet, Citation, ConfidenceScore, HallucinationRisk, RagResponse, RagStreamEvent,
    ValidationResult,
};
use crate::validation::{extract_json_metadata, validate_answer};
use crate::ChainError;

/// Fixed refusal when retrieval finds nothing relevant.
const NO_RESULTS_ANSWER: &str =
    "Maaf, saya tidak menemukan dokumen yang relevan dengan pertanyaan Anda dalam database.";

/// Fixed refusal when retrieval confidence is below the gate.
const LOW_CONFIDENCE_ANSWER: &str = "Maaf, saya tidak memiliki cukup informasi hukum untuk \
     menjawab pertanyaan ini dengan akurat. Silakan konsultasikan dengan ahli hukum.";

/// User-visible failure when the AI service cannot respond.
const GENERATION_FAILURE_ANSWER: &str =
    "Gagal mendapatkan respons dari layanan AI. Silakan coba lagi nanti.";

const OUT_OF_SCOPE_WARNING: &str = "Pertanyaan di luar jangkauan basis pengetahuan";

/// Per-query options and feature flags.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Restrict retrieval to one document type (bypasses the cascade)
    pub filter_jenis_dokumen: Option<String>,
    /// Result count override
    pub top_k: Option<usize>,
    /// Synthesized prose or verbatim quotation
    pub mode: AnswerMode,
    /// Skip the LLM-as-judge grounding call (~30% faster)
    pub skip_grounding: bool,
    /// HyDE retrieval for definition/concept questions
    pub use_hyde: bool,
    /// Decompose compound questions into sub-queries
    pub use_decomposition: bool,
    /// CRAG post-retrieval quality gate
    pub use_crag: bool,
    /// Template-based multi-query fusion
    pub use_multi_query: bool,
    /// Expand child chunks to parent article context
    pub use_parent_child: bool,
    /// Agentic orchestration (overrides the cascade)
    pub use_agentic: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filter_jenis_dokumen: None,
            top_k: None,
            mode: AnswerMode::Synthesized,
            skip_grounding: false,
            use_hyde: true,
            use_decomposition: true,
            use_crag: false,
            use_multi_query: false,
            use_parent_child: false,
            use_agentic: false,
        }
    }
}

/// One previous conversation turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// RAG chain for Indonesian legal Q&A with citations.
pub struct LegalRagChain {
    retriever: Arc<dyn SearchRetriever>,
    llm: Arc<dyn LlmBackend>,
    hyde: Hyde,
    query_planner: QueryPlanner,
    multi_query: MultiQueryFusion,
    crag: Crag,
    parent_child: ParentChildRetriever,
    agentic: AgenticRag,
    top_k: usize,
}

impl LegalRagChain {
    /// Wire the chain. The parent store may be empty, which disables
    /// parent-child expansion gracefully.
    pub fn new(
        retriever: Arc<dyn SearchRetriever>,
        llm: Arc<dyn LlmBackend>,
        parent_child: ParentChildRetriever,
        top_k: usize,
    ) -> Self {
        let agentic = AgenticRag::new(
            Some(Hyde::new(llm.clone())),
            Some(Crag::new(Some(llm.clone()))),
            Some(MultiQueryFusion::new()),
            Some(QueryPlanner::new(llm.clone())),
        );
        if !parent_child.is_loaded() {
            tracing::warn!("Parent store empty, parent-child retrieval disabled");
        }
        Self {
            hyde: Hyde::new(llm.clone()),
            query_planner: QueryPlanner::new(llm.clone()),
            multi_query: MultiQueryFusion::new(),
            crag: Crag::new(Some(llm.clone())),
            parent_child,
            agentic,
            retriever,
            llm,
            top_k,
        }
    }

    /// Strategy decisions from the last agentic run (observability).
    pub fn agentic_decisions(&self) -> Vec<omnilex_rag::StrategyDecision> {
        self.agentic.decisions()
    }

    // ── Retrieval ────────────────────────────────────────────────────

    /// Strategy cascade: agentic > decomposition (iff compound) >
    /// multi-query > HyDE > direct, followed by the optional CRAG
    /// quality gate and parent-child expansion.
    async fn retrieve(
        &self,
        question: &str,
        options: &QueryOptions,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, ChainError> {
        if let Some(ref jenis) = options.filter_jenis_dokumen {
            return Ok(self
                .retriever
                .search_by_document_type(question, jenis, top_k)
                .await?);
        }

        let mut results = if options.use_agentic {
            let results = self
                .agentic
                .enhanced_search(question, &*self.retriever, top_k)
                .await?;
            tracing::info!("Agentic orchestration applied");
            results
        } else if options.use_decomposition && self.query_planner.should_decompose(question) {
            let results = self
                .query_planner
                .multi_hop_search(question, &*self.retriever, top_k)
                .await?;
            tracing::info!("Query decomposition applied");
            results
        } else if options.use_multi_query {
            let results = self
                .multi_query
                .enhanced_search(question, &*self.retriever, top_k)
                .await?;
            tracing::info!("Multi-query fusion applied");
            results
        } else if options.use_hyde {
            let results = self
                .hyde
                .enhanced_search(question, &*self.retriever, top_k)
                .await?;
            tracing::info!("HyDE applied");
            results
        } else {
            self.retriever
                .hybrid_search(question, SearchOptions::with_top_k(top_k))
                .await?
        };

        // CRAG post-retrieval quality gate
        if options.use_crag && !results.is_empty() {
            let grade = self.crag.grade_retrieval(question, &results);
            if grade != RetrievalGrade::Correct {
                tracing::info!(?grade, "CRAG quality gate triggered, re-retrieving");
                let corrected = self
                    .crag
                    .enhanced_search(question, &*self.retriever, top_k)
                    .await?;
                if corrected.is_empty() {
                    tracing::info!("CRAG re-retrieval empty, keeping original results");
                } else {
                    results = corrected;
                }
            }
        }

        // Parent-child expansion
        if options.use_parent_child && self.parent_child.is_loaded() {
            results = self
                .parent_child
                .enhanced_search(question, &*self.retriever, top_k)
                .await?;
            tracing::info!("Parent-child expansion applied");
        }

        Ok(results)
    }

    // ── Context assembly ─────────────────────────────────────────────

    /// Format results as numbered context blocks plus parallel citations.
    fn format_context(results: &[SearchResult]) -> (String, Vec<Citation>) {
        let mut context_parts = Vec::with_capacity(results.len());
        let mut citations = Vec::with_capacity(results.len());

        for (index, result) in results.iter().enumerate() {
            let number = index + 1;
            citations.push(Citation {
                number,
                citation_id: result.citation_id.clone(),
                citation: result.citation.clone(),
                score: round4(result.score),
                metadata: result.metadata.clone(),
                text_snippet: snippet(&result.text, generation::SNIPPET_LEN),
            });
            context_parts.push(format!("[{}] {}\n{}\n---", number, result.citation, result.text));
        }

        (context_parts.join("\n\n"), citations)
    }

    fn extract_sources(citations: &[Citation]) -> Vec<String> {
        citations
            .iter()
            .map(|citation| format!("[{}] {}", citation.number, citation.citation))
            .collect()
    }

    fn no_results_response() -> RagResponse {
        RagResponse {
            answer: NO_RESULTS_ANSWER.to_string(),
            citations: Vec::new(),
            sources: Vec::new(),
            confidence: "tidak ada".to_string(),
            confidence_score: ConfidenceScore::none(),
            raw_context: String::new(),
            validation: ValidationResult::clean(),
        }
    }

    fn refused_response(
        citations: Vec<Citation>,
        sources: Vec<String>,
        confidence: ConfidenceScore,
        context: String,
    ) -> RagResponse {
        RagResponse {
            answer: LOW_CONFIDENCE_ANSWER.to_string(),
            citations,
            sources,
            confidence: "rendah".to_string(),
            confidence_score: confidence,
            raw_context: context,
            validation: ValidationResult {
                warnings: vec![OUT_OF_SCOPE_WARNING.to_string()],
                hallucination_risk: HallucinationRisk::Refused,
                ..ValidationResult::clean()
            },
        }
    }

    /// System prompt for the mode and detected question type.
    fn system_prompt(question: &str, mode: AnswerMode) -> String {
        match mode {
            AnswerMode::Verbatim => VERBATIM_SYSTEM_PROMPT.to_string(),
            AnswerMode::Synthesized => {
                let question_type = detect_question_type(question);
                tracing::info!(question_type = question_type.as_str(), "Question type detected");
                let addendum = question_type.instruction();
                if addendum.is_empty() {
                    SYSTEM_PROMPT_COT.to_string()
                } else {
                    format!("{}\n\n{}", SYSTEM_PROMPT_COT, addendum)
                }
            }
        }
    }

    // ── Query paths ──────────────────────────────────────────────────

    /// Answer a question with citations, confidence, and validation.
    pub async fn query(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<RagResponse, ChainError> {
        let top_k = options.top_k.unwrap_or(self.top_k);

        // Content-free questions (empty, whitespace, stopwords only)
        // refuse without touching retrieval or the LLM
        if tokenize_indonesian(question).is_empty() {
            tracing::info!("Content-free question, refusing without retrieval");
            return Ok(Self::no_results_response());
        }

        tracing::info!(question = %snippet(question, 50), "Retrieving documents");
        let results = self.retrieve(question, options, top_k).await?;

        if results.is_empty() {
            return Ok(Self::no_results_response());
        }

        let (context, citations) = Self::format_context(&results);
        let sources = Self::extract_sources(&citations);
        let confidence = assess_confidence(&results);

        // Confidence gate: refuse rather than hallucinate
        if confidence.numeric < generation::CONFIDENCE_THRESHOLD {
            tracing::info!(
                numeric = confidence.numeric,
                threshold = generation::CONFIDENCE_THRESHOLD,
                "Low confidence, refusing to answer"
            );
            return Ok(Self::refused_response(citations, sources, confidence, context));
        }

        // Generation with provider-specific tuning
        let tuning = provider_tuning(self.llm.provider_name());
        let request = GenerationRequest::new(build_user_prompt(&context, question))
            .with_system(Self::system_prompt(question, options.mode))
            .with_tuning(tuning.max_tokens, tuning.temperature);

        tracing::info!(
            provider = self.llm.provider_name(),
            temperature = tuning.temperature,
            max_tokens = tuning.max_tokens,
            "Generating answer"
        );
        let raw_answer = self.llm.generate(&request).await?;

        // Structured metadata, then validation
        let (answer, metadata) = extract_json_metadata(&raw_answer);
        let json_cited_sources = metadata.map(|m| m.cited_sources);
        let mut validation =
            validate_answer(&answer, &citations, json_cited_sources.as_deref());
        if !validation.warnings.is_empty() {
            tracing::warn!(warnings = ?validation.warnings, "Answer validation warnings");
        }

        // Grounding verification
        if options.skip_grounding {
            validation.hallucination_risk = HallucinationRisk::Skipped;
        } else {
            let (grounding_score, ungrounded_claims) =
                verify_grounding(&self.llm, &answer, &citations).await;
            validation.grounding_score = grounding_score;
            validation.ungrounded_claims = ungrounded_claims;
        }

        Ok(RagResponse {
            answer,
            sources,
            confidence: confidence.label.clone(),
            confidence_score: confidence,
            raw_context: context,
            citations,
            validation,
        })
    }

    /// Query with compressed conversation history prepended.
    pub async fn query_with_history(
        &self,
        question: &str,
        chat_history: &[ChatTurn],
        options: &QueryOptions,
    ) -> Result<RagResponse, ChainError> {
        if chat_history.is_empty() {
            return self.query(question, options).await;
        }

        let history_context = chat_history
            .iter()
            .rev()
            .take(generation::HISTORY_TURNS)
            .rev()
            .map(|turn| {
                format!(
                    "Q: {}\nA: {}...",
                    turn.question,
                    snippet(&turn.answer, generation::HISTORY_ANSWER_LEN)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let enhanced_question = format!(
            "Konteks sebelumnya:\n{history_context}\n\nPertanyaan saat ini: {question}"
        );
        self.query(&enhanced_question, options).await
    }

    /// Streaming query: exactly one `Metadata` event, then `Chunk`s,
    /// then exactly one `Done`. Grounding verification runs on the
    /// completed text before `Done` is emitted.
    pub fn query_stream(
        &self,
        question: String,
        filter_jenis_dokumen: Option<String>,
        top_k: Option<usize>,
    ) -> impl Stream<Item = RagStreamEvent> + '_ {
        let top_k = top_k.unwrap_or(self.top_k);

        async_stream::stream! {
            // Content-free questions refuse immediately
            if tokenize_indonesian(&question).is_empty() {
                yield RagStreamEvent::Metadata {
                    citations: Vec::new(),
                    sources: Vec::new(),
                    confidence_score: ConfidenceScore::none(),
                };
                yield RagStreamEvent::Chunk(NO_RESULTS_ANSWER.to_string());
                yield RagStreamEvent::Done { validation: ValidationResult::clean() };
                return;
            }

            // Retrieval (direct path; the streaming endpoint does not
            // run the adaptive cascade)
            let retrieval = match &filter_jenis_dokumen {
                Some(jenis) => {
                    self.retriever
                        .search_by_document_type(&question, jenis, top_k)
                        .await
                }
                None => {
                    self.retriever
                        .hybrid_search(&question, SearchOptions::with_top_k(top_k))
                        .await
                }
            };

            let results = match retrieval {
                Ok(results) => results,
                Err(e) => {
                    tracing::error!(error = %e, "Streaming retrieval failed");
                    yield RagStreamEvent::Metadata {
                        citations: Vec::new(),
                        sources: Vec::new(),
                        confidence_score: ConfidenceScore::none(),
                    };
                    yield RagStreamEvent::Chunk(GENERATION_FAILURE_ANSWER.to_string());
                    yield RagStreamEvent::Done {
                        validation: ValidationResult {
                            is_valid: false,
                            hallucination_risk: HallucinationRisk::Error,
                            ..ValidationResult::clean()
                        },
                    };
                    return;
                }
            };

            if results.is_empty() {
                yield RagStreamEvent::Metadata {
                    citations: Vec::new(),
                    sources: Vec::new(),
                    confidence_score: ConfidenceScore::none(),
                };
                yield RagStreamEvent::Chunk(NO_RESULTS_ANSWER.to_string());
                yield RagStreamEvent::Done { validation: ValidationResult::clean() };
                return;
            }

            let (context, citations) = Self::format_context(&results);
            let sources = Self::extract_sources(&citations);
            let confidence = assess_confidence(&results);

            // Same confidence gate as the blocking path
            if confidence.numeric < generation::CONFIDENCE_THRESHOLD {
                tracing::info!(numeric = confidence.numeric,
                    "Low confidence, refusing to answer (streaming)");
                yield RagStreamEvent::Metadata {
                    citations,
                    sources,
                    confidence_score: confidence,
                };
                yield RagStreamEvent::Chunk(LOW_CONFIDENCE_ANSWER.to_string());
                yield RagStreamEvent::Done {
                    validation: ValidationResult {
                        warnings: vec![OUT_OF_SCOPE_WARNING.to_string()],
                        hallucination_risk: HallucinationRisk::Refused,
                        ..ValidationResult::clean()
                    },
                };
                return;
            }

            // Metadata goes out before any generated text so the
            // consumer can render sources while the answer streams
            yield RagStreamEvent::Metadata {
                citations: citations.clone(),
                sources,
                confidence_score: confidence,
            };

            let tuning = provider_tuning(self.llm.provider_name());
            let request = GenerationRequest::new(build_user_prompt(&context, &question))
                .with_system(Self::system_prompt(&question, AnswerMode::Synthesized))
                .with_tuning(tuning.max_tokens, tuning.temperature);

            let (tx, mut rx) = mpsc::channel::<String>(32);
            let llm = self.llm.clone();
            let generation_task = tokio::spawn(async move {
                llm.generate_stream(&request, tx).await
            });

            let mut full_answer = String::new();
            while let Some(chunk) = rx.recv().await {
                full_answer.push_str(&chunk);
                yield RagStreamEvent::Chunk(chunk);
            }

            let generation_outcome = generation_task.await;
            let failed = !matches!(generation_outcome, Ok(Ok(())));
            if failed {
                tracing::error!("Streaming generation failed");
                if full_answer.is_empty() {
                    yield RagStreamEvent::Chunk(GENERATION_FAILURE_ANSWER.to_string());
                }
                yield RagStreamEvent::Done {
                    validation: ValidationResult {
                        is_valid: false,
                        hallucination_risk: HallucinationRisk::Error,
                        ..ValidationResult::clean()
                    },
                };
                return;
            }

            // Validate and ground the completed text, then close
            let mut validation = validate_answer(&full_answer, &citations, None);
            let (grounding_score, ungrounded_claims) =
                verify_grounding(&self.llm, &full_answer, &citations).await;
            if let Some(score) = grounding_score {
                if score < 0.5 {
                    tracing::warn!(score, "Low grounding score in streaming response");
                }
            }
            validation.grounding_score = grounding_score;
            validation.ungrounded_claims = ungrounded_claims;

            yield RagStreamEvent::Done { validation };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnilex_core::ChunkMetadata;

    fn result(citation_id: &str, score: f32) -> SearchResult {
        SearchResult {
            id: citation_id.to_string(),
            text: "Isi pasal yang cukup panjang untuk snippet.".to_string(),
            citation: citation_id.to_uppercase(),
            citation_id: citation_id.to_string(),
            score,
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn test_format_context_blocks() {
        let results = vec![result("uu_11_2020_pasal_5", 0.031), result("pp_5_2021", 0.02)];
        let (context, citations) = LegalRagChain::format_context(&results);

        assert!(context.contains("[1] UU_11_2020_PASAL_5"));
        assert!(context.contains("[2] PP_5_2021"));
        assert!(context.contains("---"));
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].number, 1);
        assert_eq!(citations[1].number, 2);
        assert!(!citations[0].text_snippet.is_empty());
    }

    #[test]
    fn test_extract_sources() {
        let results = vec![result("uu_11_2020", 0.03)];
        let (_, citations) = LegalRagChain::format_context(&results);
        let sources = LegalRagChain::extract_sources(&citations);
        assert_eq!(sources, vec!["[1] UU_11_2020".to_string()]);
    }

    #[test]
    fn test_no_results_response_shape() {
        let response = LegalRagChain::no_results_response();
        assert_eq!(response.answer, NO_RESULTS_ANSWER);
        assert_eq!(response.confidence, "tidak ada");
        assert!(response.citations.is_empty());
        assert!(response.validation.is_valid);
        assert_eq!(
            response.validation.hallucination_risk,
            HallucinationRisk::Low
        );
    }

    #[test]
    fn test_refused_response_shape() {
        let response = LegalRagChain::refused_response(
            Vec::new(),
            Vec::new(),
            ConfidenceScore {
                numeric: 0.1,
                label: "rendah".to_string(),
                top_score: 0.001,
                avg_score: 0.001,
            },
            String::new(),
        );
        assert_eq!(response.answer, LOW_CONFIDENCE_ANSWER);
        assert_eq!(
            response.validation.hallucination_risk,
            HallucinationRisk::Refused
        );
        assert!(response.validation.is_valid);
        assert_eq!(response.validation.warnings.len(), 1);
    }

    #[test]
    fn test_system_prompt_modes() {
        let verbatim = LegalRagChain::system_prompt("Apa itu PT?", AnswerMode::Verbatim);
        assert!(verbatim.contains("KUTIPAN LANGSUNG"));

        let synthesized = LegalRagChain::system_prompt("Apa itu PT?", AnswerMode::Synthesized);
        assert!(synthesized.contains("asisten hukum Indonesia"));
        // Definition addendum appended for "apa itu" questions
        assert!(synthesized.contains("FOKUS PERTANYAAN DEFINISI"));
    }

    #[test]
    fn test_options_default_cascade_flags() {
        let options = QueryOptions::default();
        assert!(options.use_hyde);
        assert!(options.use_decomposition);
        assert!(!options.use_crag);
        assert!(!options.use_multi_query);
        assert!(!options.use_agentic);
        assert!(!options.use_parent_child);
    }
}
