//! Legal reference and amendment value types
//!
//! Shared between the corpus-scope extractors in the knowledge-graph
//! crate and the query-scope detector in the retrieval crate.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A normalized legal citation extracted from Indonesian regulation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalReference {
    /// The matched span as it appeared in the source text
    pub raw_text: String,
    /// Canonical regulation type (UU, PP, Perpres, Permen, ...)
    pub jenis: String,
    pub nomor: String,
    pub tahun: String,
    /// Relation context when matched inside a cross-reference or
    /// amendment clause (dimaksud dalam / diubah / dicabut / ...)
    pub relation: Option<String>,
    /// Canonical form, e.g. "UU-27-2022"
    pub canonical: String,
}

/// Types of amendment relationships between regulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmendmentType {
    Amends,
    Revokes,
    Replaces,
    Supplements,
}

impl fmt::Display for AmendmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AmendmentType::Amends => "amends",
            AmendmentType::Revokes => "revokes",
            AmendmentType::Replaces => "replaces",
            AmendmentType::Supplements => "supplements",
        };
        f.write_str(s)
    }
}

/// A detected amendment/revocation relationship between two regulations.
///
/// Body-text detections carry confidence 1.0; title-derived detections
/// carry 0.8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentRelation {
    /// The amending regulation, e.g. "UU-19-2016"
    pub source_regulation: String,
    /// The amended regulation, e.g. "UU-11-2008"
    pub target_regulation: String,
    pub amendment_type: AmendmentType,
    pub raw_text: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

/// Full regulation-type names mapped to canonical abbreviations.
static JENIS_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("undang-undang", "UU"),
        ("peraturan pemerintah", "PP"),
        ("peraturan presiden", "Perpres"),
        ("peraturan menteri", "Permen"),
        ("keputusan presiden", "Keppres"),
    ])
});

/// Canonical title-case forms for known abbreviations.
static ABBREV_CANONICAL: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("uu", "UU"),
        ("pp", "PP"),
        ("perpres", "Perpres"),
        ("permen", "Permen"),
        ("keppres", "Keppres"),
        ("pmk", "PMK"),
        ("perppu", "Perppu"),
    ])
});

/// Normalize a regulation type to its canonical abbreviated form.
///
/// Handles full Indonesian names ("Undang-Undang" → "UU"), abbreviations
/// in any case ("pp" → "PP"), and collapses internal whitespace. Unknown
/// types fall back to title-cased input.
pub fn normalize_jenis(jenis: &str) -> String {
    let cleaned = jenis
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if let Some(canonical) = JENIS_MAP.get(cleaned.as_str()) {
        return (*canonical).to_string();
    }
    if let Some(canonical) = ABBREV_CANONICAL.get(cleaned.as_str()) {
        return (*canonical).to_string();
    }

    // Unknown type: title-case each word
    jenis
        .trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_full_names() {
        assert_eq!(normalize_jenis("Undang-Undang"), "UU");
        assert_eq!(normalize_jenis("Peraturan Pemerintah"), "PP");
        assert_eq!(normalize_jenis("Peraturan Presiden"), "Perpres");
        assert_eq!(normalize_jenis("Keputusan Presiden"), "Keppres");
    }

    #[test]
    fn test_normalize_abbreviations() {
        assert_eq!(normalize_jenis("uu"), "UU");
        assert_eq!(normalize_jenis("PP"), "PP");
        assert_eq!(normalize_jenis("perpres"), "Perpres");
        assert_eq!(normalize_jenis("PERPPU"), "Perppu");
    }

    #[test]
    fn test_normalize_extra_whitespace() {
        assert_eq!(normalize_jenis("  peraturan   pemerintah  "), "PP");
    }

    #[test]
    fn test_normalize_unknown_passthrough() {
        assert_eq!(normalize_jenis("peraturan gubernur"), "Peraturan Gubernur");
    }
}
