//! Retrieval-confidence scoring
//!
//! Multi-factor heuristic calibrated for RRF scores (k=60): the maximum
//! possible RRF score is 2/61 ≈ 0.033 (rank #1 in both the dense and
//! sparse lists), so raw scores are normalized against that ceiling
//! rather than treated as cosine similarities.
//!
//! Factors:
//! 1. Normalized retrieval quality (40%), top-weighted 0.7/0.3
//! 2. Document-type authority of the top 3 (20%)
//! 3. Score consistency via scale-invariant variance (20%)
//! 4. Count of results above a quality threshold (20%)

use omnilex_config::constants::generation;
use omnilex_core::SearchResult;

use crate::response::ConfidenceScore;

const RRF_MAX: f32 = 2.0 / 61.0;
const RRF_GOOD: f32 = 1.0 / 61.0;
const RRF_QUALITY_THRESHOLD: f32 = RRF_GOOD * 0.8;

fn authority_weight(jenis_dokumen: Option<&str>) -> f32 {
    match jenis_dokumen {
        Some("UU") => 1.0,
        Some("PP") => 0.9,
        Some("Perpres") => 0.8,
        Some("Permen") => 0.7,
        Some("Perda") => 0.6,
        _ => 0.5,
    }
}

/// Label for a calibrated numeric confidence. Boundary values map to the
/// higher label.
fn label_for(numeric: f32) -> &'static str {
    if numeric >= generation::LABEL_TINGGI {
        "tinggi"
    } else if numeric >= generation::LABEL_SEDANG {
        "sedang"
    } else {
        "rendah"
    }
}

/// Assess answer confidence from the final retrieval scores.
pub fn assess_confidence(results: &[SearchResult]) -> ConfidenceScore {
    if results.is_empty() {
        return ConfidenceScore::none();
    }

    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    let top_score = scores[0];
    let avg_score = scores.iter().sum::<f32>() / scores.len() as f32;

    // Factor 1: normalized retrieval quality (40%)
    let norm_top = (top_score / RRF_MAX).min(1.0);
    let norm_avg = (avg_score / RRF_MAX).min(1.0);
    let base_score = norm_top * 0.7 + norm_avg * 0.3;

    // Factor 2: document authority of the top 3 (20%), weighted by each
    // result's normalized score so higher-ranked docs matter more
    let authority_scores: Vec<f32> = results
        .iter()
        .take(3)
        .map(|result| {
            let authority = authority_weight(result.metadata.jenis_dokumen.as_deref());
            let norm = (result.score / RRF_MAX).min(1.0);
            authority * (0.5 + 0.5 * norm)
        })
        .collect();
    let authority_factor = if authority_scores.is_empty() {
        0.5
    } else {
        authority_scores.iter().sum::<f32>() / authority_scores.len() as f32
    };

    // Factor 3: score consistency via scale-invariant variance (20%)
    let consistency_factor = if scores.len() > 1 {
        let variance =
            scores.iter().map(|s| (s - avg_score).powi(2)).sum::<f32>() / scores.len() as f32;
        let relative_variance = if avg_score > 0.0 {
            variance / (avg_score * avg_score)
        } else {
            1.0
        };
        (1.0 - (relative_variance * 0.5).min(1.0)).max(0.3)
    } else {
        0.7
    };

    // Factor 4: count of results above the RRF quality threshold (20%)
    let high_quality = scores.iter().filter(|s| **s > RRF_QUALITY_THRESHOLD).count();
    let count_factor = match high_quality {
        n if n >= 4 => 1.0,
        n if n >= 2 => 0.8,
        1 => 0.6,
        _ => 0.3,
    };

    let mut numeric = base_score * 0.40
        + authority_factor * 0.20
        + consistency_factor * 0.20
        + count_factor * 0.20;

    // Calibration: diminishing returns at the top, penalty at the bottom
    if numeric > 0.85 {
        numeric = 0.85 + (numeric - 0.85) * 0.5;
    } else if numeric < 0.3 {
        numeric *= 0.8;
    }
    numeric = numeric.clamp(0.0, 1.0);

    tracing::debug!(
        base = base_score,
        authority = authority_factor,
        consistency = consistency_factor,
        count = count_factor,
        numeric,
        "Confidence calculated"
    );

    ConfidenceScore {
        numeric,
        label: label_for(numeric).to_string(),
        top_score,
        avg_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnilex_core::ChunkMetadata;

    fn result(jenis: Option<&str>, score: f32) -> SearchResult {
        SearchResult {
            id: "1".to_string(),
            text: "t".to_string(),
            citation: "c".to_string(),
            citation_id: "cid".to_string(),
            score,
            metadata: ChunkMetadata {
                jenis_dokumen: jenis.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_empty_results() {
        let score = assess_confidence(&[]);
        assert_eq!(score.label, "tidak ada");
        assert_eq!(score.numeric, 0.0);
    }

    #[test]
    fn test_strong_rrf_results_high_confidence() {
        // Four results at the RRF ceiling from the highest authority
        let results: Vec<SearchResult> =
            (0..4).map(|_| result(Some("UU"), RRF_MAX)).collect();
        let score = assess_confidence(&results);
        assert!(score.numeric >= 0.65, "numeric = {}", score.numeric);
        assert_eq!(score.label, "tinggi");
    }

    #[test]
    fn test_weak_results_low_confidence() {
        let results = vec![result(None, 0.001)];
        let score = assess_confidence(&results);
        assert!(score.numeric < 0.40, "numeric = {}", score.numeric);
        assert_eq!(score.label, "rendah");
    }

    #[test]
    fn test_label_boundaries_map_up() {
        assert_eq!(label_for(0.65), "tinggi");
        assert_eq!(label_for(0.40), "sedang");
        assert_eq!(label_for(0.399), "rendah");
        assert_eq!(label_for(0.649), "sedang");
    }

    #[test]
    fn test_label_monotone() {
        let labels = ["rendah", "sedang", "tinggi"];
        let rank = |label: &str| labels.iter().position(|l| *l == label).unwrap();
        let mut previous = 0;
        for step in 0..=100 {
            let numeric = step as f32 / 100.0;
            let current = rank(label_for(numeric));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_numeric_clamped() {
        let results: Vec<SearchResult> =
            (0..10).map(|_| result(Some("UU"), 100.0)).collect();
        let score = assess_confidence(&results);
        assert!(score.numeric <= 1.0);
        assert!(score.numeric >= 0.0);
    }

    #[test]
    fn test_top_and_avg_reported() {
        let results = vec![result(Some("UU"), 0.03), result(Some("PP"), 0.01)];
        let score = assess_confidence(&results);
        assert_eq!(score.top_score, 0.03);
        assert!((score.avg_score - 0.02).abs() < 1e-6);
    }
}
