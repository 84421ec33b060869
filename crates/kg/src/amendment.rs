//! Amendment and revocation detection
//!
//! Identifies amendment, revocation, replacement, and supplementation
//! language in regulation text and titles, producing typed relations
//! between regulations. Body-text matches carry confidence 1.0;
//! title-derived matches carry 0.8. Unparseable targets are skipped with
//! a warning, never fabricated.

use once_cell::sync::Lazy;
use regex::Regex;

use omnilex_core::{normalize_jenis, AmendmentRelation, AmendmentType};

/// Regex fragment matching a target regulation citation.
const TARGET_PATTERN: &str = concat!(
    r"(?P<target>",
    r"(?:Undang-Undang|Peraturan Pemerintah|Peraturan Presiden",
    r"|Peraturan Menteri|UU|PP|Perpres|Permen)",
    r"(?:\s+Nomor|\s+No\.?)?\s+",
    r"(?:\d+)",
    r"(?:\s+Tahun\s+\d{4}|/\d{4})",
    r")"
);

static AMENDMENT_PATTERNS: Lazy<Vec<(AmendmentType, Regex)>> = Lazy::new(|| {
    vec![
        (
            AmendmentType::Amends,
            Regex::new(&format!(r"(?i)(?:mengubah|perubahan\s+atas)\s+{}", TARGET_PATTERN))
                .unwrap(),
        ),
        (
            AmendmentType::Revokes,
            Regex::new(&format!(r"(?i)(?:mencabut|pencabutan)\s+{}", TARGET_PATTERN)).unwrap(),
        ),
        (
            AmendmentType::Replaces,
            Regex::new(&format!(r"(?i)(?:mengganti|penggantian)\s+{}", TARGET_PATTERN)).unwrap(),
        ),
        (
            AmendmentType::Supplements,
            Regex::new(&format!(
                r"(?i)(?:melengkapi|penambahan\s+atas)\s+{}",
                TARGET_PATTERN
            ))
            .unwrap(),
        ),
    ]
});

// The ordinal ("Perubahan Kedua Atas ...") is optional and ignored.
static TITLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:perubahan(?:\s+\w+)?|pencabutan|penggantian)\s+(?:atas\s+)?{}",
        TARGET_PATTERN
    ))
    .unwrap()
});

static TARGET_FULL_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<jenis>Undang-Undang|Peraturan Pemerintah|Peraturan Presiden",
        r"|Peraturan Menteri)",
        r"\s+(?:Nomor|No\.?)\s*(?P<nomor>\d+)",
        r"\s+Tahun\s+(?P<tahun>\d{4})",
    ))
    .unwrap()
});

static TARGET_ABBREVIATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<jenis>UU|PP|Perpres|Permen)",
        r"(?:\s+(?:Nomor|No\.?))?\s*(?P<nomor>\d+)",
        r"(?:\s+Tahun\s+(?P<tahun>\d{4})|/(?P<tahun2>\d{4}))",
    ))
    .unwrap()
});

fn title_type(keyword: &str) -> Option<AmendmentType> {
    match keyword.to_lowercase().as_str() {
        "perubahan" => Some(AmendmentType::Amends),
        "pencabutan" => Some(AmendmentType::Revokes),
        "penggantian" => Some(AmendmentType::Replaces),
        _ => None,
    }
}

/// Detects amendment/revocation/replacement language in regulation text.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmendmentDetector;

impl AmendmentDetector {
    pub fn new() -> Self {
        Self
    }

    /// Parse a target citation into canonical form ("UU-11-2008").
    ///
    /// Handles full-form ("Undang-Undang Nomor 11 Tahun 2008") and
    /// abbreviated ("UU No. 11/2008") citations.
    fn parse_target(target_text: &str) -> Option<String> {
        if let Some(m) = TARGET_FULL_FORM.captures(target_text) {
            let jenis = normalize_jenis(&m["jenis"]);
            return Some(format!("{}-{}-{}", jenis, &m["nomor"], &m["tahun"]));
        }

        if let Some(m) = TARGET_ABBREVIATED.captures(target_text) {
            let jenis = normalize_jenis(&m["jenis"]);
            let tahun = m
                .name("tahun")
                .or_else(|| m.name("tahun2"))
                .map(|g| g.as_str())?;
            return Some(format!("{}-{}-{}", jenis, &m["nomor"], tahun));
        }

        None
    }

    /// Detect amendment relationships in regulation body text.
    ///
    /// Scans for all pattern families and returns relations with
    /// confidence 1.0 for exact body-text matches.
    pub fn detect_amendments(
        &self,
        text: &str,
        source_regulation_id: &str,
    ) -> Vec<AmendmentRelation> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for (amendment_type, pattern) in AMENDMENT_PATTERNS.iter() {
            for m in pattern.captures_iter(text) {
                let target_text = &m["target"];
                let Some(canonical) = Self::parse_target(target_text) else {
                    tracing::warn!(target = target_text, "Could not parse target regulation");
                    continue;
                };
                results.push(AmendmentRelation {
                    source_regulation: source_regulation_id.to_string(),
                    target_regulation: canonical,
                    amendment_type: *amendment_type,
                    raw_text: m[0].to_string(),
                    confidence: 1.0,
                });
            }
        }
        results
    }

    /// Detect amendment relationships from a regulation's title.
    ///
    /// Titles like "Perubahan atas UU Nomor 11 Tahun 2008" indicate the
    /// regulation amends UU-11-2008. Title detections carry 0.8.
    pub fn detect_from_title(&self, title: &str, regulation_id: &str) -> Vec<AmendmentRelation> {
        if title.trim().is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for m in TITLE_PATTERN.captures_iter(title) {
            let keyword = m[0].split_whitespace().next().unwrap_or_default();
            let Some(amendment_type) = title_type(keyword) else {
                continue;
            };

            let target_text = &m["target"];
            let Some(canonical) = Self::parse_target(target_text) else {
                tracing::warn!(
                    target = target_text,
                    "Could not parse target regulation from title"
                );
                continue;
            };

            results.push(AmendmentRelation {
                source_regulation: regulation_id.to_string(),
                target_regulation: canonical,
                amendment_type,
                raw_text: m[0].to_string(),
                confidence: 0.8,
            });
        }
        results
    }
}
