//! Cross-reference extraction from regulation text
//!
//! Identifies legal citation patterns in Indonesian regulation bodies and
//! normalizes them to canonical form (e.g. "UU-27-2022") for knowledge
//! graph edges. Four pattern families:
//! - standard full-form citations ("Undang-Undang Nomor 27 Tahun 2022")
//! - abbreviated citations ("UU No. 27/2022")
//! - cross-reference clauses ("sebagaimana dimaksud dalam ...")
//! - amendment clauses ("telah beberapa kali diubah dengan ...")

use once_cell::sync::Lazy;
use regex::Regex;

use omnilex_core::{normalize_jenis, LegalReference};

static PATTERN_STANDARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<jenis>Undang-Undang|Peraturan Pemerintah|Peraturan Presiden",
        r"|Peraturan Menteri|Keputusan Presiden)",
        r"\s+Nomor\s+(?P<nomor>\d+(?:/[A-Z]+)?)",
        r"\s+Tahun\s+(?P<tahun>\d{4})",
    ))
    .unwrap()
});

static PATTERN_ABBREVIATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<jenis>UU|PP|Perpres|Permen|Keppres|PMK|Perppu)",
        r"(?:\s+No\.?|\s+Nomor)?\s*",
        r"(?P<nomor>\d+)",
        r"(?:/|(?:\s+Tahun\s+))",
        r"(?P<tahun>\d{4})",
    ))
    .unwrap()
});

static PATTERN_CROSS_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)sebagaimana\s+(?P<relation>dimaksud dalam|telah diubah dengan",
        r"|telah dicabut dengan|tercantum dalam)",
        r"\s+(?P<citation>(?:Undang-Undang|UU|PP|Perpres).*?(?:Tahun\s+\d{4}|\d{4}))",
    ))
    .unwrap()
});

static PATTERN_AMENDMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)telah\s+(?:\w+\s+kali\s+)?",
        r"(?P<action>diubah|dicabut|diganti)",
        r"(?:\s+terakhir)?",
        r"\s+dengan\s+",
        r"(?P<citation>(?:PP|UU|Perpres|Permen).*?(?:Tahun\s+\d{4}|\d{4}))",
    ))
    .unwrap()
});

/// Extract (jenis, nomor, tahun) from a citation substring captured by
/// the cross-reference or amendment patterns.
fn extract_from_citation(citation_text: &str) -> Option<(String, String, String)> {
    if let Some(m) = PATTERN_STANDARD.captures(citation_text) {
        return Some((
            m["jenis"].to_string(),
            m["nomor"].to_string(),
            m["tahun"].to_string(),
        ));
    }
    if let Some(m) = PATTERN_ABBREVIATED.captures(citation_text) {
        return Some((
            m["jenis"].to_string(),
            m["nomor"].to_string(),
            m["tahun"].to_string(),
        ));
    }
    None
}

/// Extract all legal cross-references from Indonesian legal text.
///
/// Runs all four patterns, normalizes each match, deduplicates by
/// canonical form (a later relation-bearing match upgrades an earlier
/// bare citation), and returns results sorted by canonical form.
pub fn extract_legal_references(text: &str) -> Vec<LegalReference> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut seen: std::collections::HashMap<String, LegalReference> =
        std::collections::HashMap::new();

    let mut insert = |raw_text: String,
                      jenis_raw: &str,
                      nomor: String,
                      tahun: String,
                      relation: Option<String>| {
        let jenis = normalize_jenis(jenis_raw);
        let canonical = format!("{}-{}-{}", jenis, nomor, tahun);
        match seen.get(&canonical) {
            None => {
                seen.insert(
                    canonical.clone(),
                    LegalReference {
                        raw_text,
                        jenis,
                        nomor,
                        tahun,
                        relation,
                        canonical,
                    },
                );
            }
            // Upgrade: an earlier pattern matched without relation context
            Some(existing) if existing.relation.is_none() && relation.is_some() => {
                seen.insert(
                    canonical.clone(),
                    LegalReference {
                        raw_text,
                        jenis,
                        nomor,
                        tahun,
                        relation,
                        canonical,
                    },
                );
            }
            Some(_) => {}
        }
    };

    for m in PATTERN_STANDARD.captures_iter(text) {
        insert(
            m[0].to_string(),
            &m["jenis"],
            m["nomor"].to_string(),
            m["tahun"].to_string(),
            None,
        );
    }

    for m in PATTERN_ABBREVIATED.captures_iter(text) {
        insert(
            m[0].to_string(),
            &m["jenis"],
            m["nomor"].to_string(),
            m["tahun"].to_string(),
            None,
        );
    }

    for m in PATTERN_CROSS_REF.captures_iter(text) {
        let relation = m["relation"].trim().to_string();
        if let Some((jenis, nomor, tahun)) = extract_from_citation(&m["citation"]) {
            insert(m[0].to_string(), &jenis, nomor, tahun, Some(relation));
        }
    }

    for m in PATTERN_AMENDMENTS.captures_iter(text) {
        let action = m["action"].trim().to_string();
        if let Some((jenis, nomor, tahun)) = extract_from_citation(&m["citation"]) {
            insert(m[0].to_string(), &jenis, nomor, tahun, Some(action));
        }
    }

    let mut results: Vec<LegalReference> = seen.into_values().collect();
    results.sort_by(|a, b| a.canonical.cmp(&b.canonical));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_citation() {
        let refs = extract_legal_references(
            "Ketentuan dalam Undang-Undang Nomor 27 Tahun 2022 tentang Pelindungan Data Pribadi",
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].canonical, "UU-27-2022");
        assert_eq!(refs[0].jenis, "UU");
        assert!(refs[0].relation.is_none());
    }

    #[test]
    fn test_abbreviated_citation() {
        let refs = extract_legal_references("diatur lebih lanjut dalam PP No. 35/2021");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].canonical, "PP-35-2021");
    }

    #[test]
    fn test_cross_reference_clause_carries_relation() {
        let refs = extract_legal_references(
            "sebagaimana dimaksud dalam Undang-Undang Nomor 13 Tahun 2003",
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].relation.as_deref(), Some("dimaksud dalam"));
        assert_eq!(refs[0].canonical, "UU-13-2003");
    }

    #[test]
    fn test_amendment_clause_upgrades_relation() {
        let refs = extract_legal_references(
            "UU Nomor 11 Tahun 2008 telah beberapa kali diubah dengan UU Nomor 19 Tahun 2016",
        );
        let amended = refs.iter().find(|r| r.canonical == "UU-19-2016").unwrap();
        assert_eq!(amended.relation.as_deref(), Some("diubah"));
        assert!(refs.iter().any(|r| r.canonical == "UU-11-2008"));
    }

    #[test]
    fn test_dedup_by_canonical() {
        let refs = extract_legal_references(
            "UU Nomor 13 Tahun 2003 dan Undang-Undang Nomor 13 Tahun 2003 serta UU 13/2003",
        );
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_legal_references("   ").is_empty());
    }

    #[test]
    fn test_results_sorted_by_canonical() {
        let refs = extract_legal_references("UU 13/2003 dan PP 35/2021 dan UU 11/2020");
        let canonicals: Vec<&str> = refs.iter().map(|r| r.canonical.as_str()).collect();
        let mut sorted = canonicals.clone();
        sorted.sort();
        assert_eq!(canonicals, sorted);
    }
}
