//! Response types
//!
//! Serde-serializable shapes the HTTP layer exposes as JSON. The core
//! builds them; it does not route or render them.

use serde::{Deserialize, Serialize};

use omnilex_core::ChunkMetadata;

/// Confidence with a numeric value and an Indonesian text label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceScore {
    /// Calibrated confidence in [0, 1]
    pub numeric: f32,
    /// tinggi / sedang / rendah / tidak ada
    pub label: String,
    /// Best retrieval score
    pub top_score: f32,
    /// Average retrieval score
    pub avg_score: f32,
}

impl ConfidenceScore {
    pub fn none() -> Self {
        Self {
            numeric: 0.0,
            label: "tidak ada".to_string(),
            top_score: 0.0,
            avg_score: 0.0,
        }
    }
}

/// Hallucination-risk assessment of a generated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HallucinationRisk {
    #[default]
    Low,
    Medium,
    High,
    /// Generation was refused before any LLM call
    Refused,
    /// Grounding verification was skipped by request
    Skipped,
    /// Generation or verification failed
    Error,
    Unknown,
}

/// Result of answer validation and grounding verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// |cited ∩ available| / |available|
    pub citation_coverage: f32,
    pub warnings: Vec<String>,
    pub hallucination_risk: HallucinationRisk,
    /// Cited reference numbers with no matching source
    pub missing_citations: Vec<usize>,
    /// LLM-as-judge grounding score in [0, 1]; None when unavailable
    pub grounding_score: Option<f32>,
    /// Claims the judge found unsupported by the sources
    pub ungrounded_claims: Vec<String>,
}

impl ValidationResult {
    /// Clean validation for refusal responses.
    pub fn clean() -> Self {
        Self {
            is_valid: true,
            citation_coverage: 0.0,
            warnings: Vec::new(),
            hallucination_risk: HallucinationRisk::Low,
            missing_citations: Vec::new(),
            grounding_score: None,
            ungrounded_claims: Vec::new(),
        }
    }
}

/// One numbered source citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based source number used in the answer text
    pub number: usize,
    /// Canonical citation id ("uu_11_2020_pasal_5")
    pub citation_id: String,
    /// Display citation ("UU No. 11 Tahun 2020 Pasal 5")
    pub citation: String,
    /// Retrieval score, rounded
    pub score: f32,
    /// Chunk metadata plus a text snippet
    pub metadata: ChunkMetadata,
    /// First 500 characters of the chunk text
    pub text_snippet: String,
}

/// Full response from the RAG chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Generated (or refusal) answer text
    pub answer: String,
    pub citations: Vec<Citation>,
    /// Formatted source labels ("[1] UU No. 11 Tahun 2020 Pasal 5")
    pub sources: Vec<String>,
    /// Confidence label (kept alongside the full score)
    pub confidence: String,
    pub confidence_score: ConfidenceScore,
    /// The assembled numbered context sent to the LLM
    pub raw_context: String,
    pub validation: ValidationResult,
}

/// Events yielded by the streaming query path, in strict order:
/// exactly one `Metadata`, zero or more `Chunk`s, exactly one `Done`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RagStreamEvent {
    Metadata {
        citations: Vec<Citation>,
        sources: Vec<String>,
        confidence_score: ConfidenceScore,
    },
    Chunk(String),
    Done {
        validation: ValidationResult,
    },
}

/// Round for JSON output the way the API layer expects.
pub fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

/// Leading characters of a chunk text for citation metadata.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HallucinationRisk::Refused).unwrap(),
            "\"refused\""
        );
        assert_eq!(
            serde_json::to_string(&HallucinationRisk::Low).unwrap(),
            "\"low\""
        );
    }

    #[test]
    fn test_stream_event_tagged() {
        let event = RagStreamEvent::Chunk("halo".to_string());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "chunk");
        assert_eq!(json["data"], "halo");
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(0.0), 0.0);
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let text = "pengusaha wajib membayar uang pesangon";
        assert_eq!(snippet(text, 9), "pengusaha");
        assert_eq!(snippet("abc", 500), "abc");
        // Multibyte: no panic at a non-boundary cut
        let multibyte = "héllo wörld";
        let cut = snippet(multibyte, 2);
        assert!(multibyte.starts_with(&cut));
    }

    #[test]
    fn test_confidence_none() {
        let score = ConfidenceScore::none();
        assert_eq!(score.label, "tidak ada");
        assert_eq!(score.numeric, 0.0);
    }
}
