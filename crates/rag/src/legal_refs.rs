//! Query-scope legal reference detection
//!
//! Scans a query for structured Indonesian legal references such as
//! "Pasal 5 UU 11/2020" and extracts an exact-match payload filter for
//! targeted dense retrieval. If the filtered search returns nothing the
//! retriever discards the filter and falls back to semantic search.
//!
//! Supported forms:
//! - "Pasal 12 PP No. 35 Tahun 2021"
//! - "Pasal 5 UU 11/2020"
//! - "Pasal 3 ayat (2) Perpres 82/2023"
//! - "UU Nomor 13 Tahun 2003"
//! - "PP 5/2021"

use once_cell::sync::Lazy;
use regex::Regex;

use crate::vector_store::SearchFilter;

/// Structured reference extracted from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFilter {
    pub jenis_dokumen: String,
    pub nomor: String,
    pub tahun: i64,
    pub pasal: Option<String>,
    pub ayat: Option<String>,
}

impl From<ReferenceFilter> for SearchFilter {
    fn from(reference: ReferenceFilter) -> Self {
        SearchFilter {
            jenis_dokumen: Some(reference.jenis_dokumen),
            nomor: Some(reference.nomor),
            tahun: Some(reference.tahun),
            pasal: reference.pasal,
            ayat: reference.ayat,
        }
    }
}

// Pattern 1: "Pasal X [ayat (N)] JENIS No. Y Tahun Z" or "... JENIS Y/Z"
static PATTERN_PASAL_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)pasal\s+(?P<pasal>\d+)",
        r"\s+(?:ayat\s+\((?P<ayat>\d+)\)\s+)?",
        r"(?P<jenis>UU|PP|Perpres|Permen|Perda|Perpu)",
        r"\s+(?:No(?:mor)?\.?\s*)?(?P<nomor>\d+)",
        r"(?:\s+Tahun\s+|\s*/\s*)(?P<tahun>\d{4})",
    ))
    .unwrap()
});

// Pattern 2: "JENIS No. Y Tahun Z" (no Pasal prefix)
static PATTERN_REGULATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<jenis>UU|PP|Perpres|Permen|Perda|Perpu)",
        r"\s+(?:No(?:mor)?\.?\s*)?(?P<nomor>\d+)",
        r"(?:\s+Tahun\s+|\s*/\s*)(?P<tahun>\d{4})",
    ))
    .unwrap()
});

// Pattern 3: compact "Pasal X JENIS Y/Z"
static PATTERN_PASAL_COMPACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)pasal\s+(?P<pasal>\d+)",
        r"\s+(?:ayat\s+\((?P<ayat>\d+)\)\s+)?",
        r"(?P<jenis>UU|PP|Perpres|Permen|Perda|Perpu)",
        r"\s+(?P<nomor>\d+)/(?P<tahun>\d{4})",
    ))
    .unwrap()
});

fn canonical_jenis(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "uu" | "undang-undang" => "UU",
        "pp" | "peraturan pemerintah" => "PP",
        "perpres" | "peraturan presiden" => "Perpres",
        "permen" | "peraturan menteri" => "Permen",
        "perda" | "peraturan daerah" => "Perda",
        "perpu" => "Perpu",
        _ => return raw.to_string(),
    }
    .to_string()
}

/// Detect a structured legal reference in a query.
///
/// Pasal-bearing patterns are tried first; the regulation-only pattern
/// is the fallback. Returns `None` when no structured reference exists.
pub fn detect_legal_references(query: &str) -> Option<ReferenceFilter> {
    for pattern in [&*PATTERN_PASAL_FULL, &*PATTERN_PASAL_COMPACT] {
        if let Some(m) = pattern.captures(query) {
            let reference = ReferenceFilter {
                jenis_dokumen: canonical_jenis(&m["jenis"]),
                nomor: m["nomor"].to_string(),
                tahun: m["tahun"].parse().ok()?,
                pasal: Some(m["pasal"].to_string()),
                ayat: m.name("ayat").map(|g| g.as_str().to_string()),
            };
            tracing::info!(matched = &m[0], ?reference, "Legal reference detected");
            return Some(reference);
        }
    }

    if let Some(m) = PATTERN_REGULATION.captures(query) {
        let reference = ReferenceFilter {
            jenis_dokumen: canonical_jenis(&m["jenis"]),
            nomor: m["nomor"].to_string(),
            tahun: m["tahun"].parse().ok()?,
            pasal: None,
            ayat: None,
        };
        tracing::info!(matched = &m[0], ?reference, "Legal reference detected");
        return Some(reference);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pasal_compact_form() {
        let reference = detect_legal_references("Pasal 5 UU 11/2020").unwrap();
        assert_eq!(reference.jenis_dokumen, "UU");
        assert_eq!(reference.nomor, "11");
        assert_eq!(reference.tahun, 2020);
        assert_eq!(reference.pasal.as_deref(), Some("5"));
        assert!(reference.ayat.is_none());
    }

    #[test]
    fn test_regulation_verbose_form() {
        let reference = detect_legal_references("UU Nomor 13 Tahun 2003").unwrap();
        assert_eq!(reference.jenis_dokumen, "UU");
        assert_eq!(reference.nomor, "13");
        assert_eq!(reference.tahun, 2003);
        assert!(reference.pasal.is_none());
    }

    #[test]
    fn test_pp_slash_form() {
        let reference = detect_legal_references("PP 5/2021").unwrap();
        assert_eq!(reference.jenis_dokumen, "PP");
        assert_eq!(reference.nomor, "5");
        assert_eq!(reference.tahun, 2021);
    }

    #[test]
    fn test_pasal_with_ayat() {
        let reference =
            detect_legal_references("Pasal 3 ayat (2) Perpres 82/2023").unwrap();
        assert_eq!(reference.jenis_dokumen, "Perpres");
        assert_eq!(reference.nomor, "82");
        assert_eq!(reference.tahun, 2023);
        assert_eq!(reference.pasal.as_deref(), Some("3"));
        assert_eq!(reference.ayat.as_deref(), Some("2"));
    }

    #[test]
    fn test_pasal_verbose_form() {
        let reference =
            detect_legal_references("Apa isi Pasal 12 PP No. 35 Tahun 2021?").unwrap();
        assert_eq!(reference.jenis_dokumen, "PP");
        assert_eq!(reference.nomor, "35");
        assert_eq!(reference.pasal.as_deref(), Some("12"));
    }

    #[test]
    fn test_no_reference() {
        assert!(detect_legal_references("Bagaimana cara mendirikan PT?").is_none());
        assert!(detect_legal_references("").is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let reference = detect_legal_references("pasal 5 uu 11/2020").unwrap();
        assert_eq!(reference.jenis_dokumen, "UU");
        assert_eq!(reference.pasal.as_deref(), Some("5"));
    }

    #[test]
    fn test_into_search_filter() {
        let reference = detect_legal_references("Pasal 5 UU 11/2020").unwrap();
        let filter: SearchFilter = reference.into();
        assert_eq!(filter.jenis_dokumen.as_deref(), Some("UU"));
        assert_eq!(filter.nomor.as_deref(), Some("11"));
        assert_eq!(filter.tahun, Some(2020));
        assert_eq!(filter.pasal.as_deref(), Some("5"));
    }
}
