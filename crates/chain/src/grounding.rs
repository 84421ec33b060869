//! LLM-as-judge grounding verification
//!
//! Asks the LLM to check every claim in the generated answer against the
//! cited source snippets and report a grounding score plus the claims it
//! could not support. The call runs under a soft time budget; any
//! failure (timeout, bad JSON, provider error) leaves the grounding
//! fields null rather than failing the request.

use std::sync::Arc;
use std::time::Duration;

use omnilex_config::constants::generation;
use omnilex_llm::{GenerationRequest, LlmBackend};

use crate::prompts::GROUNDING_SYSTEM_PROMPT;
use crate::response::Citation;

#[derive(Debug, serde::Deserialize)]
struct GroundingJudgment {
    #[serde(default)]
    grounding_score: Option<f32>,
    #[serde(default)]
    ungrounded_claims: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    grounded_claims: Vec<String>,
}

fn build_grounding_prompt(answer: &str, citations: &[Citation]) -> String {
    let sources_text = citations
        .iter()
        .take(generation::GROUNDING_TOP_SOURCES)
        .map(|citation| {
            let source = if citation.text_snippet.is_empty() {
                citation.citation.clone()
            } else {
                citation.text_snippet.clone()
            };
            format!("[{}] {}", citation.number, source)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Anda adalah hakim yang mengevaluasi kualitas jawaban hukum.\n\n\
         Sumber hukum:\n{sources_text}\n\n\
         Jawaban yang akan dievaluasi:\n{answer}\n\n\
         Tugas Anda: Evaluasi setiap klaim dalam jawaban apakah didukung oleh sumber hukum di atas.\n\n\
         Instruksi:\n\
         1. Identifikasi klaim-klaim utama dalam jawaban\n\
         2. Untuk setiap klaim, tentukan apakah didukung oleh sumber yang diberikan\n\
         3. Jika ada klaim yang TIDAK didukung oleh sumber, cantumkan\n\n\
         Respons dalam format JSON:\n\
         {{\n\
           \"grounding_score\": <skor 0.0-1.0 persentase klaim yang didukung penuh>,\n\
           \"ungrounded_claims\": [<daftar klaim yang tidak didukung sumber>],\n\
           \"grounded_claims\": [<daftar klaim yang didukung sumber>]\n\
         }}\n\n\
         JSON:"
    )
}

/// Parse the judge's JSON from a possibly chatty response.
fn parse_judgment(response: &str) -> Option<GroundingJudgment> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Verify that the answer's claims are grounded in the cited sources.
///
/// Returns `(grounding_score, ungrounded_claims)`; both default on any
/// failure. No citations means nothing can be verified.
pub async fn verify_grounding(
    llm: &Arc<dyn LlmBackend>,
    answer: &str,
    citations: &[Citation],
) -> (Option<f32>, Vec<String>) {
    if citations.is_empty() {
        return (None, vec!["Tidak ada sumber untuk diverifikasi".to_string()]);
    }

    let prompt = build_grounding_prompt(answer, citations);
    let request = GenerationRequest::new(prompt).with_system(GROUNDING_SYSTEM_PROMPT);
    let budget = Duration::from_secs(generation::GROUNDING_TIMEOUT_SECS);

    let started = std::time::Instant::now();
    let outcome = tokio::time::timeout(budget, llm.generate(&request)).await;
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Grounding verification");

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Grounding verification failed");
            return (None, Vec::new());
        }
        Err(_) => {
            tracing::warn!(budget_secs = generation::GROUNDING_TIMEOUT_SECS,
                "Grounding verification timed out");
            return (None, Vec::new());
        }
    };

    match parse_judgment(&response) {
        Some(judgment) => {
            let score = judgment
                .grounding_score
                .unwrap_or(0.5)
                .clamp(0.0, 1.0);
            tracing::info!(
                grounding_score = score,
                ungrounded = judgment.ungrounded_claims.len(),
                "Grounding verified"
            );
            (Some(score), judgment.ungrounded_claims)
        }
        None => {
            tracing::warn!("Could not parse JSON from grounding response");
            (None, Vec::new())
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

    fn citation(number: usize, snippet: &str) -> Citation {
        Citation {
            number,
            citation_id: format!("uu_{number}"),
            citation: format!("UU {number}"),
            score: 0.02,
            metadata: ChunkMetadata::default(),
            text_snippet: snippet.to_string(),
        }
    }

    struct JudgeLlm {
        response: String,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl LlmBackend for JudgeLlm {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.response.clone())
        }

        async fn generate_stream(
            &self,
            _request: &GenerationRequest,
            _tx: mpsc::Sender<String>,
        ) -> Result<(), LlmError> {
            Ok(())
        }

        fn provider_name(&self) -> &str {
            "judge"
        }

        fn model_name(&self) -> &str {
            "judge"
        }
    }

    #[tokio::test]
    async fn test_verified_grounding() {
        let llm: Arc<dyn LlmBackend> = Arc::new(JudgeLlm {
            response: r#"Berikut evaluasi: {"grounding_score": 0.9, "ungrounded_claims": [], "grounded_claims": ["klaim 1"]}"#.to_string(),
            delay: None,
        });
        let (score, ungrounded) =
            verify_grounding(&llm, "jawaban [1]", &[citation(1, "sumber")]).await;
        assert_eq!(score, Some(0.9));
        assert!(ungrounded.is_empty());
    }

    #[tokio::test]
    async fn test_score_clamped() {
        let llm: Arc<dyn LlmBackend> = Arc::new(JudgeLlm {
            response: r#"{"grounding_score": 1.7, "ungrounded_claims": ["x"]}"#.to_string(),
            delay: None,
        });
        let (score, ungrounded) =
            verify_grounding(&llm, "jawaban", &[citation(1, "s")]).await;
        assert_eq!(score, Some(1.0));
        assert_eq!(ungrounded, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_json_leaves_fields_null() {
        let llm: Arc<dyn LlmBackend> = Arc::new(JudgeLlm {
            response: "maaf, tidak bisa menilai".to_string(),
            delay: None,
        });
        let (score, ungrounded) =
            verify_grounding(&llm, "jawaban", &[citation(1, "s")]).await;
        assert!(score.is_none());
        assert!(ungrounded.is_empty());
    }

    #[tokio::test]
    async fn test_no_citations() {
        let llm: Arc<dyn LlmBackend> = Arc::new(JudgeLlm {
            response: String::new(),
            delay: None,
        });
        let (score, ungrounded) = verify_grounding(&llm, "jawaban", &[]).await;
        assert!(score.is_none());
        assert_eq!(ungrounded.len(), 1);
    }

    #[test]
    fn test_prompt_limits_sources() {
        let citations: Vec<Citation> =
            (1..=8).map(|n| citation(n, &format!("sumber {n}"))).collect();
        let prompt = build_grounding_prompt("jawaban", &citations);
        assert!(prompt.contains("[5] sumber 5"));
        assert!(!prompt.contains("[6] sumber 6"));
    }
}
