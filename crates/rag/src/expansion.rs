//! Query expansion with legal-term synonyms
//!
//! Rule-based expansion over a fixed table of Indonesian legal synonym
//! groups. The table is retrieval behavior, not styling: changing it
//! changes recall, so entries are kept verbatim.

use regex::Regex;

/// Indonesian legal term synonym groups.
///
/// 60 groups covering regulation type abbreviations, business entity
/// forms, employment terms, licensing, tax, investment, land and
/// environment, legal-code abbreviations, domain terms, and named
/// regulations.
static SYNONYM_GROUPS: &[&[&str]] = &[
    // Business entity & corporate terms
    &["PT", "Perseroan Terbatas", "perusahaan"],
    &["CV", "Commanditaire Vennootschap", "persekutuan komanditer"],
    &["firma", "Fa", "persekutuan firma"],
    &["koperasi", "badan usaha koperasi"],
    &["BUMN", "Badan Usaha Milik Negara", "perusahaan negara"],
    &["BUMD", "Badan Usaha Milik Daerah", "perusahaan daerah"],
    &["yayasan", "badan hukum yayasan", "organisasi nirlaba"],
    &["direksi", "direktur", "pengurus perseroan"],
    &["komisaris", "dewan komisaris", "pengawas"],
    &["RUPS", "Rapat Umum Pemegang Saham"],
    // Employment & labor terms
    &["karyawan", "pekerja", "buruh", "tenaga kerja"],
    &["PHK", "Pemutusan Hubungan Kerja", "pemberhentian kerja"],
    &["PKWT", "Perjanjian Kerja Waktu Tertentu", "kontrak kerja"],
    &["PKWTT", "Perjanjian Kerja Waktu Tidak Tertentu", "karyawan tetap"],
    &["gaji", "upah", "penghasilan", "remunerasi"],
    &["UMR", "UMK", "UMP", "upah minimum", "upah minimum regional"],
    &["pesangon", "uang pesangon", "kompensasi PHK"],
    &["lembur", "kerja lembur", "waktu kerja tambahan"],
    &["cuti", "cuti tahunan", "istirahat kerja", "hak istirahat"],
    &["serikat pekerja", "serikat buruh", "organisasi pekerja"],
    // Licensing & permits
    &["NIB", "Nomor Induk Berusaha", "izin berusaha"],
    &["izin", "perizinan", "lisensi", "permit"],
    &["OSS", "Online Single Submission", "perizinan daring"],
    &["UMKM", "Usaha Mikro Kecil Menengah", "usaha kecil"],
    &["TDP", "Tanda Daftar Perusahaan"],
    &["SIUP", "Surat Izin Usaha Perdagangan", "izin usaha"],
    &["IMB", "Izin Mendirikan Bangunan", "PBG", "Persetujuan Bangunan Gedung"],
    // Tax & fiscal terms
    &["pajak", "perpajakan", "fiskal"],
    &["NPWP", "Nomor Pokok Wajib Pajak"],
    &["PPN", "Pajak Pertambahan Nilai", "VAT"],
    &["PPh", "Pajak Penghasilan", "income tax"],
    &["Bea Cukai", "kepabeanan", "cukai"],
    &["retribusi", "pungutan daerah", "retribusi daerah"],
    // Investment & capital
    &["modal", "investasi", "penanaman modal"],
    &["PMA", "Penanaman Modal Asing", "investasi asing"],
    &["PMDN", "Penanaman Modal Dalam Negeri", "investasi domestik"],
    // Land & environment
    &["tanah", "agraria", "pertanahan"],
    &["lingkungan", "lingkungan hidup", "ekologi"],
    &["Amdal", "Analisis Mengenai Dampak Lingkungan", "kajian lingkungan"],
    &["HGU", "Hak Guna Usaha", "hak atas tanah"],
    // Regulation type abbreviations
    &["UU", "Undang-Undang", "undang undang"],
    &["PP", "Peraturan Pemerintah"],
    &["Perpres", "Peraturan Presiden"],
    &["Permen", "Peraturan Menteri"],
    &["Perda", "Peraturan Daerah"],
    &["Perpu", "Peraturan Pemerintah Pengganti Undang-Undang"],
    &["SKB", "Surat Keputusan Bersama"],
    // Legal code abbreviations
    &["KUHPerdata", "Kitab Undang-Undang Hukum Perdata", "BW", "Burgerlijk Wetboek"],
    &["KUHP", "Kitab Undang-Undang Hukum Pidana", "KUHPidana"],
    &["KUHAP", "Kitab Undang-Undang Hukum Acara Pidana"],
    // Legal domain terms
    &["pidana", "kriminal", "hukum pidana"],
    &["perdata", "sipil", "hukum perdata", "hukum privat"],
    &["kontrak", "perjanjian", "perikatan"],
    &["gugatan", "tuntutan", "dakwaan"],
    &["banding", "naik banding", "upaya hukum banding"],
    // Specific regulations & programs
    &["Cipta Kerja", "Omnibus Law", "UU 11/2020"],
    &["data pribadi", "privasi", "PDP", "pelindungan data"],
    &["CSR", "Tanggung Jawab Sosial", "tanggung jawab sosial dan lingkungan", "TJSL"],
    &["BPJS", "Badan Penyelenggara Jaminan Sosial", "jaminan sosial"],
    &["PKB", "Perjanjian Kerja Bersama", "kesepakatan kerja bersama"],
];

/// Rule-based query expander over the legal synonym table.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExpander;

impl QueryExpander {
    pub fn new() -> Self {
        Self
    }

    /// Generate query variants via synonym expansion.
    ///
    /// Returns the original plus up to two variants:
    /// 1. The original query (always, first)
    /// 2. The first matched term in each of up to two groups replaced
    ///    with its first alternative
    /// 3. Up to three alternative terms appended as extra keywords
    pub fn expand(&self, query: &str) -> Vec<String> {
        let mut queries = vec![query.to_string()];
        let query_lower = query.to_lowercase();

        // First matching term per group, with its alternatives
        let mut expanded_terms: Vec<(&str, Vec<&str>)> = Vec::new();
        for group in SYNONYM_GROUPS {
            for term in *group {
                if query_lower.contains(&term.to_lowercase()) {
                    let alternatives: Vec<&str> = group
                        .iter()
                        .copied()
                        .filter(|t| !t.eq_ignore_ascii_case(term))
                        .collect();
                    if !alternatives.is_empty() {
                        expanded_terms.push((term, alternatives));
                    }
                    break; // only the first matching term per group
                }
            }
        }

        if expanded_terms.is_empty() {
            return queries;
        }

        // Variant 1: replace the first matched term (up to two groups)
        let mut variant = query.to_string();
        for (term, alternatives) in expanded_terms.iter().take(2) {
            let pattern = Regex::new(&format!("(?i){}", regex::escape(term)));
            if let Ok(pattern) = pattern {
                variant = pattern.replace(&variant, alternatives[0]).into_owned();
            }
        }
        if variant != query && !queries.contains(&variant) {
            queries.push(variant);
        }

        // Variant 2: append alternative terms as extra keywords
        let extra_keywords: Vec<&str> = expanded_terms
            .iter()
            .filter_map(|(_, alternatives)| alternatives.first().copied())
            .take(3)
            .collect();
        if !extra_keywords.is_empty() {
            let variant = format!("{} {}", query, extra_keywords.join(" "));
            if !queries.contains(&variant) {
                queries.push(variant);
            }
        }

        queries.truncate(3);
        queries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_always_first() {
        let expander = QueryExpander::new();
        let variants = expander.expand("Apa syarat mendirikan PT?");
        assert_eq!(variants[0], "Apa syarat mendirikan PT?");
        assert!(variants.len() <= 3);
    }

    #[test]
    fn test_synonym_substitution() {
        let expander = QueryExpander::new();
        let variants = expander.expand("syarat pendirian PT");
        // "PT" replaced by "Perseroan Terbatas" in some variant
        assert!(variants
            .iter()
            .any(|v| v.contains("Perseroan Terbatas")));
    }

    #[test]
    fn test_no_match_returns_original_only() {
        let expander = QueryExpander::new();
        let variants = expander.expand("zzz qqq www");
        assert_eq!(variants, vec!["zzz qqq www".to_string()]);
    }

    #[test]
    fn test_keyword_append_variant() {
        let expander = QueryExpander::new();
        let variants = expander.expand("aturan PHK karyawan");
        // Appended-keyword variant starts with the original query text
        assert!(variants
            .iter()
            .skip(1)
            .any(|v| v.starts_with("aturan PHK karyawan ")));
    }

    #[test]
    fn test_max_three_variants() {
        let expander = QueryExpander::new();
        let variants = expander.expand("PHK pesangon upah minimum pajak izin PT CV");
        assert!(variants.len() <= 3);
    }

    #[test]
    fn test_named_regulation_group() {
        let expander = QueryExpander::new();
        let variants = expander.expand("Apa itu Cipta Kerja?");
        assert!(variants.iter().any(|v| v.contains("Omnibus Law")));
    }
}
