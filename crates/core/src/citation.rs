//! Canonical regulation id normalization
//!
//! Knowledge-graph node ids and chunk citation ids use the lowercase
//! underscore form `{jenis}_{nomor}_{tahun}` (e.g. `uu_11_2020`),
//! optionally extended with `_pasal_{n}[_ayat_{n}]` suffixes. The API
//! surface accepts several looser spellings and normalizes them here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::ChunkMetadata;

static NORMALIZED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_]+_\d+_\d{4}$").unwrap());
static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-]+").unwrap());
static NO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"no\.?\s*").unwrap());
static TAHUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"tahun\s*").unwrap());
static UNDERSCORE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Normalize a regulation id to the canonical KG node form.
///
/// Accepts `UU_11_2020`, `uu-11-2020`, `UU No. 11 Tahun 2020` and emits
/// `uu_11_2020`. Idempotent: already-normalized input passes through.
pub fn normalize_regulation_id(citation_id: &str) -> String {
    if NORMALIZED_RE.is_match(citation_id) {
        return citation_id.to_string();
    }
    let normalized = citation_id.to_lowercase().trim().to_string();
    let normalized = SEPARATOR_RE.replace_all(&normalized, "_");
    let normalized = NO_RE.replace_all(&normalized, "");
    let normalized = TAHUN_RE.replace_all(&normalized, "");
    let normalized = UNDERSCORE_RUN_RE.replace_all(&normalized, "_");
    normalized.trim_matches('_').to_string()
}

/// Build the canonical `{jenis}_{nomor}_{tahun}` regulation id from chunk
/// metadata, or `None` when any of the three fields is missing.
pub fn regulation_id_from_metadata(metadata: &ChunkMetadata) -> Option<String> {
    let jenis = metadata.jenis_dokumen.as_deref()?;
    let nomor = metadata.nomor.as_deref()?;
    let tahun = metadata.tahun?;
    if jenis.is_empty() || nomor.is_empty() {
        return None;
    }
    Some(format!("{}_{}_{}", jenis.to_lowercase(), nomor, tahun))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_normalized_passthrough() {
        assert_eq!(normalize_regulation_id("uu_11_2020"), "uu_11_2020");
    }

    #[test]
    fn test_uppercase_underscore_form() {
        assert_eq!(normalize_regulation_id("UU_11_2020"), "uu_11_2020");
    }

    #[test]
    fn test_hyphenated_form() {
        assert_eq!(normalize_regulation_id("uu-11-2020"), "uu_11_2020");
    }

    #[test]
    fn test_verbose_form() {
        assert_eq!(
            normalize_regulation_id("UU No. 11 Tahun 2020"),
            "uu_11_2020"
        );
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_regulation_id("UU No. 11 Tahun 2020");
        let twice = normalize_regulation_id(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_regulation_id_from_metadata() {
        let meta = ChunkMetadata {
            jenis_dokumen: Some("UU".to_string()),
            nomor: Some("11".to_string()),
            tahun: Some(2020),
            ..Default::default()
        };
        assert_eq!(
            regulation_id_from_metadata(&meta).as_deref(),
            Some("uu_11_2020")
        );

        let incomplete = ChunkMetadata {
            jenis_dokumen: Some("UU".to_string()),
            ..Default::default()
        };
        assert!(regulation_id_from_metadata(&incomplete).is_none());
    }
}
