//! Indonesian legal-text tokenizer
//!
//! Tokenization order matters: legal abbreviations expand before stopword
//! removal so "UU" becomes "undang undang" instead of leaking through as
//! a bare "uu" content token. Consecutive filtered unigrams additionally
//! emit a joined bigram ("perseroan_terbatas") so BM25 can match common
//! legal phrases.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Legal abbreviation expansions applied before tokenization.
static LEGAL_ABBREVS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bpt\b", "perseroan terbatas"),
        (r"\bcv\b", "commanditaire vennootschap"),
        (r"\buu\b", "undang undang"),
        (r"\bpp\b", "peraturan pemerintah"),
        (r"\bperpres\b", "peraturan presiden"),
        (r"\bperda\b", "peraturan daerah"),
        (r"\bphk\b", "pemutusan hubungan kerja"),
        (r"\bnib\b", "nomor induk berusaha"),
        (r"\bkuhp\b", "kitab undang hukum pidana"),
        (r"\bkuhap\b", "kitab undang hukum acara pidana"),
        (r"\bkuhper\b", "kitab undang hukum perdata"),
    ]
    .into_iter()
    .map(|(pattern, expansion)| (Regex::new(pattern).unwrap(), expansion))
    .collect()
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z0-9]+").unwrap());

/// Indonesian stopwords: common function words that carry no retrieval
/// signal in legal text.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "dan", "atau", "yang", "di", "ke", "dari", "untuk", "dengan", "pada", "ini", "itu",
        "adalah", "sebagai", "dalam", "oleh", "tidak", "akan", "dapat", "telah", "tersebut",
        "bahwa", "jika", "maka", "atas", "setiap", "ada", "bagi", "bisa", "hal", "hingga",
        "jadi", "juga", "karena", "kita", "lebih", "lain", "masih", "mereka", "saat", "sangat",
        "saya", "se", "suatu", "sudah", "tanpa", "tapi", "tetapi", "yaitu",
    ])
});

/// Tokenize Indonesian legal text into unigrams plus bigrams.
///
/// Steps: lowercase, expand legal abbreviations, extract alphanumeric
/// tokens of length ≥ 2, drop stopwords, then append a `a_b` bigram for
/// each adjacent pair of surviving unigrams.
pub fn tokenize_indonesian(text: &str) -> Vec<String> {
    let mut text = text.to_lowercase();
    for (pattern, expansion) in LEGAL_ABBREVS.iter() {
        text = pattern.replace_all(&text, *expansion).into_owned();
    }

    let unigrams: Vec<String> = WORD_RE
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .filter(|token| token.len() > 1 && !STOPWORDS.contains(token.as_str()))
        .collect();

    let bigrams: Vec<String> = unigrams
        .windows(2)
        .map(|pair| format!("{}_{}", pair[0], pair[1]))
        .collect();

    let mut tokens = unigrams;
    tokens.extend(bigrams);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation_expansion_before_stopwords() {
        // "UU" must expand rather than leak through as a content token
        let tokens = tokenize_indonesian("UU Cipta Kerja");
        assert!(tokens.contains(&"undang".to_string()));
        assert!(!tokens.contains(&"uu".to_string()));
        assert!(tokens.contains(&"cipta".to_string()));
    }

    #[test]
    fn test_no_stopwords_emitted() {
        let tokens = tokenize_indonesian("syarat dan ketentuan yang berlaku untuk perusahaan");
        for token in &tokens {
            // Bigram components checked separately below
            if !token.contains('_') {
                assert!(!STOPWORDS.contains(token.as_str()), "stopword leaked: {token}");
            }
        }
    }

    #[test]
    fn test_bigram_components_are_unigrams() {
        let tokens = tokenize_indonesian("pendirian perseroan terbatas memerlukan akta notaris");
        let unigrams: HashSet<&str> = tokens
            .iter()
            .filter(|t| !t.contains('_'))
            .map(|t| t.as_str())
            .collect();
        for bigram in tokens.iter().filter(|t| t.contains('_')) {
            let (left, right) = bigram.split_once('_').unwrap();
            assert!(unigrams.contains(left), "bigram left missing: {bigram}");
            assert!(unigrams.contains(right), "bigram right missing: {bigram}");
        }
    }

    #[test]
    fn test_pt_expands() {
        let tokens = tokenize_indonesian("bagaimana mendirikan PT?");
        assert!(tokens.contains(&"perseroan".to_string()));
        assert!(tokens.contains(&"terbatas".to_string()));
        assert!(tokens.contains(&"perseroan_terbatas".to_string()));
    }

    #[test]
    fn test_short_tokens_dropped() {
        let tokens = tokenize_indonesian("a b c pasal 5");
        assert!(!tokens.contains(&"a".to_string()));
        assert!(!tokens.contains(&"5".to_string()));
        assert!(tokens.contains(&"pasal".to_string()));
    }

    #[test]
    fn test_empty_and_stopword_only_input() {
        assert!(tokenize_indonesian("").is_empty());
        assert!(tokenize_indonesian("yang di ke dari").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let a = tokenize_indonesian("pemutusan hubungan kerja karyawan tetap");
        let b = tokenize_indonesian("pemutusan hubungan kerja karyawan tetap");
        assert_eq!(a, b);
    }
}
