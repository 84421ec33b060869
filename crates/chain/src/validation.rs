//! Answer validation
//!
//! Extracts the structured JSON footer the LLM is instructed to append
//! (`{"cited_sources": [1, 2]}`), falling back to regex extraction of
//! `[n]` references from the answer text, then checks the cited
//! references against the available sources for coverage and
//! hallucination risk.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::response::{Citation, HallucinationRisk, ValidationResult};

/// Fenced ```json block at the end of the answer.
static FENCED_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\s*\n?\s*(\{[^`]*?\})\s*\n?\s*```\s*$").unwrap()
});

/// Bare `{"cited_sources": [...]}` object at the end of the answer.
static BARE_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\n\s*(\{"cited_sources"\s*:\s*\[[\d,\s]*\]\})\s*$"#).unwrap());

/// `[n]` citation references in answer text.
static CITATION_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// Parsed JSON metadata footer.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AnswerMetadata {
    #[serde(default)]
    pub cited_sources: Vec<usize>,
}

/// Strip and parse the trailing JSON metadata block.
///
/// Returns the cleaned answer plus the parsed metadata when a block was
/// found and valid. A malformed block is stripped but yields `None`,
/// sending validation down the regex-fallback path.
pub fn extract_json_metadata(raw_answer: &str) -> (String, Option<AnswerMetadata>) {
    if let Some(m) = FENCED_JSON_RE.captures(raw_answer) {
        let json_str = m.get(1).map(|g| g.as_str()).unwrap_or_default();
        let clean = raw_answer[..m.get(0).unwrap().start()].trim_end().to_string();
        match serde_json::from_str::<AnswerMetadata>(json_str) {
            Ok(metadata) => {
                tracing::info!("Parsed JSON metadata from LLM response");
                return (clean, Some(metadata));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Found JSON block but failed to parse");
                return (clean, None);
            }
        }
    }

    if let Some(m) = BARE_JSON_RE.captures(raw_answer) {
        let json_str = m.get(1).map(|g| g.as_str()).unwrap_or_default();
        let clean = raw_answer[..m.get(0).unwrap().start()].trim_end().to_string();
        match serde_json::from_str::<AnswerMetadata>(json_str) {
            Ok(metadata) => {
                tracing::info!("Parsed bare JSON metadata from LLM response");
                return (clean, Some(metadata));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Found bare JSON but failed to parse");
                return (clean, None);
            }
        }
    }

    tracing::debug!("No JSON metadata block found, regex fallback will be used");
    (raw_answer.to_string(), None)
}

/// Extract `[n]` references from answer text.
pub fn extract_citation_refs(answer: &str) -> BTreeSet<usize> {
    CITATION_REF_RE
        .captures_iter(answer)
        .filter_map(|m| m[1].parse().ok())
        .collect()
}

/// Validate the answer's citations against the available sources.
///
/// Risk rules: no citations at all → high; invalid references or
/// coverage < 0.3 → medium; otherwise low.
pub fn validate_answer(
    answer: &str,
    citations: &[Citation],
    json_cited_sources: Option<&[usize]>,
) -> ValidationResult {
    let mut warnings = Vec::new();

    let cited_refs: BTreeSet<usize> = match json_cited_sources {
        Some(sources) => sources.iter().copied().collect(),
        None => extract_citation_refs(answer),
    };
    let available_refs: BTreeSet<usize> = citations.iter().map(|c| c.number).collect();

    let invalid_refs: Vec<usize> = cited_refs.difference(&available_refs).copied().collect();
    if !invalid_refs.is_empty() {
        warnings.push(format!("Referensi tidak valid: {:?}", invalid_refs));
    }

    let coverage = if available_refs.is_empty() {
        0.0
    } else {
        cited_refs.intersection(&available_refs).count() as f32 / available_refs.len() as f32
    };

    let risk = if cited_refs.is_empty() {
        warnings.push("Jawaban tidak memiliki sitasi sama sekali".to_string());
        HallucinationRisk::High
    } else if !invalid_refs.is_empty() {
        HallucinationRisk::Medium
    } else if coverage < 0.3 {
        warnings.push("Hanya sedikit sumber yang dikutip".to_string());
        HallucinationRisk::Medium
    } else {
        HallucinationRisk::Low
    };

    ValidationResult {
        is_valid: warnings.is_empty(),
        citation_coverage: coverage,
        warnings,
        hallucination_risk: risk,
        missing_citations: invalid_refs,
        grounding_score: None,
        ungrounded_claims: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnilex_core::ChunkMetadata;

    fn citation(number: usize) -> Citation {
        Citation {
            number,
            citation_id: format!("uu_{number}"),
            citation: format!("UU {number}"),
            score: 0.02,
            metadata: ChunkMetadata::default(),
            text_snippet: String::new(),
        }
    }

    #[test]
    fn test_fenced_json_extraction() {
        let raw = "Jawaban dengan sitasi [1].\n\n```json\n{\"cited_sources\": [1, 2]}\n```";
        let (clean, metadata) = extract_json_metadata(raw);
        assert_eq!(clean, "Jawaban dengan sitasi [1].");
        assert_eq!(metadata.unwrap().cited_sources, vec![1, 2]);
    }

    #[test]
    fn test_bare_json_extraction() {
        let raw = "Jawaban [1].\n{\"cited_sources\": [1]}";
        let (clean, metadata) = extract_json_metadata(raw);
        assert_eq!(clean, "Jawaban [1].");
        assert_eq!(metadata.unwrap().cited_sources, vec![1]);
    }

    #[test]
    fn test_malformed_json_stripped_but_none() {
        let raw = "Jawaban [1].\n\n```json\n{\"cited_sources\": [1,}\n```";
        let (clean, metadata) = extract_json_metadata(raw);
        assert_eq!(clean, "Jawaban [1].");
        assert!(metadata.is_none());
    }

    #[test]
    fn test_no_json_block() {
        let raw = "Jawaban tanpa blok JSON [2].";
        let (clean, metadata) = extract_json_metadata(raw);
        assert_eq!(clean, raw);
        assert!(metadata.is_none());
    }

    #[test]
    fn test_regex_citation_extraction() {
        let refs = extract_citation_refs("Menurut [1] dan [3], serta [1] lagi.");
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_validation_full_coverage() {
        let citations = vec![citation(1), citation(2)];
        let result = validate_answer("Jawaban [1] dan [2].", &citations, None);
        assert!(result.is_valid);
        assert_eq!(result.citation_coverage, 1.0);
        assert_eq!(result.hallucination_risk, HallucinationRisk::Low);
        assert!(result.missing_citations.is_empty());
    }

    #[test]
    fn test_validation_no_citations_high_risk() {
        let citations = vec![citation(1)];
        let result = validate_answer("Jawaban tanpa sitasi.", &citations, None);
        assert!(!result.is_valid);
        assert_eq!(result.hallucination_risk, HallucinationRisk::High);
    }

    #[test]
    fn test_validation_invalid_reference_medium_risk() {
        let citations = vec![citation(1)];
        let result = validate_answer("Jawaban [1] dan [9].", &citations, None);
        assert_eq!(result.hallucination_risk, HallucinationRisk::Medium);
        assert_eq!(result.missing_citations, vec![9]);
    }

    #[test]
    fn test_validation_low_coverage_medium_risk() {
        let citations: Vec<Citation> = (1..=5).map(citation).collect();
        let result = validate_answer("Jawaban [1].", &citations, None);
        // 1 of 5 = 0.2 < 0.3
        assert_eq!(result.hallucination_risk, HallucinationRisk::Medium);
        assert!((result.citation_coverage - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_json_sources_trusted_over_regex() {
        let citations = vec![citation(1), citation(2)];
        let result = validate_answer("Jawaban tanpa marker.", &citations, Some(&[1, 2]));
        assert_eq!(result.hallucination_risk, HallucinationRisk::Low);
        assert_eq!(result.citation_coverage, 1.0);
    }
}
