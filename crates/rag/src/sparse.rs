//! Sparse BM25 retrieval
//!
//! Okapi BM25 over the full corpus, built once at startup from scrolled
//! payloads through the Indonesian tokenizer. Negative IDF values (terms
//! in more than half the corpus) are floored to `epsilon * average_idf`
//! so very common legal boilerplate still contributes a small positive
//! signal instead of flipping the ranking.

use std::collections::HashMap;

use omnilex_core::SearchResult;

use crate::tokenizer::tokenize_indonesian;
use crate::vector_store::ScrolledChunk;

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

/// Okapi BM25 index over a static corpus.
#[derive(Debug, Default)]
pub struct Bm25Index {
    doc_term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    idf: HashMap<String, f64>,
    avgdl: f64,
}

impl Bm25Index {
    /// Build the index from tokenized documents.
    pub fn new(tokenized_corpus: &[Vec<String>]) -> Self {
        let corpus_size = tokenized_corpus.len();
        if corpus_size == 0 {
            return Self::default();
        }

        let mut doc_term_freqs = Vec::with_capacity(corpus_size);
        let mut doc_lens = Vec::with_capacity(corpus_size);
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for tokens in tokenized_corpus {
            doc_lens.push(tokens.len());
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_default() += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            doc_term_freqs.push(freqs);
        }

        let avgdl = doc_lens.iter().sum::<usize>() as f64 / corpus_size as f64;

        // IDF with the rank-bm25 negative floor
        let mut idf: HashMap<String, f64> = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0;
        let mut negative_terms: Vec<String> = Vec::new();
        for (term, nd) in doc_freq {
            let value =
                ((corpus_size as f64 - nd as f64 + 0.5) / (nd as f64 + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative_terms.push(term.clone());
            }
            idf.insert(term, value);
        }
        let average_idf = idf_sum / idf.len().max(1) as f64;
        let floor = EPSILON * average_idf;
        for term in negative_terms {
            idf.insert(term, floor);
        }

        Self {
            doc_term_freqs,
            doc_lens,
            idf,
            avgdl,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.doc_term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_term_freqs.is_empty()
    }

    /// BM25 scores for the query against every document, in corpus order.
    pub fn get_scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f64; self.doc_term_freqs.len()];

        for token in query_tokens {
            let Some(idf) = self.idf.get(token) else {
                continue;
            };
            for (doc_index, freqs) in self.doc_term_freqs.iter().enumerate() {
                let Some(freq) = freqs.get(token) else {
                    continue;
                };
                let freq = f64::from(*freq);
                let dl = self.doc_lens[doc_index] as f64;
                let denominator = freq + K1 * (1.0 - B + B * dl / self.avgdl);
                scores[doc_index] += idf * freq * (K1 + 1.0) / denominator;
            }
        }

        scores.into_iter().map(|s| s as f32).collect()
    }
}

/// Corpus documents paired with their BM25 index.
pub struct SparseCorpus {
    chunks: Vec<ScrolledChunk>,
    index: Bm25Index,
}

impl SparseCorpus {
    /// Build from scrolled chunks, tokenizing each text.
    pub fn build(chunks: Vec<ScrolledChunk>) -> Self {
        let tokenized: Vec<Vec<String>> = chunks
            .iter()
            .map(|chunk| tokenize_indonesian(&chunk.text))
            .collect();
        let index = Bm25Index::new(&tokenized);
        tracing::info!(docs = chunks.len(), "BM25 corpus built");
        Self { chunks, index }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[ScrolledChunk] {
        &self.chunks
    }

    /// Top-k BM25 results for a query; zero-score documents are skipped.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        if self.is_empty() {
            return Vec::new();
        }

        let query_tokens = tokenize_indonesian(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let scores = self.index.get_scores(&query_tokens);
        let mut scored: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(index, score)| {
                let chunk = &self.chunks[index];
                SearchResult {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    citation: chunk.citation.clone(),
                    citation_id: chunk.citation_id.clone(),
                    score,
                    metadata: chunk.metadata.clone(),
                }
            })
            .collect()
    }

    /// Chunk counts grouped by base regulation id (citation_id prefix
    /// before any `_pasal_` suffix).
    pub fn chunk_counts_by_regulation(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for chunk in &self.chunks {
            if chunk.citation_id.is_empty() {
                continue;
            }
            let lowered = chunk.citation_id.to_lowercase();
            let base = lowered
                .split("_pasal_")
                .next()
                .unwrap_or(&lowered)
                .to_string();
            *counts.entry(base).or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnilex_core::ChunkMetadata;

    fn chunk(id: &str, citation_id: &str, text: &str) -> ScrolledChunk {
        ScrolledChunk {
            id: id.to_string(),
            text: text.to_string(),
            citation: citation_id.to_uppercase(),
            citation_id: citation_id.to_string(),
            metadata: ChunkMetadata::default(),
        }
    }

    fn sample_corpus() -> SparseCorpus {
        SparseCorpus::build(vec![
            chunk(
                "1",
                "uu_40_2007_pasal_32",
                "Modal dasar Perseroan paling sedikit Rp50.000.000,00",
            ),
            chunk(
                "2",
                "uu_13_2003_pasal_156",
                "Dalam hal terjadi pemutusan hubungan kerja, pengusaha wajib membayar uang pesangon",
            ),
            chunk(
                "3",
                "uu_40_2007_pasal_7",
                "Perseroan didirikan oleh 2 orang atau lebih dengan akta notaris",
            ),
        ])
    }

    #[test]
    fn test_scores_length_matches_corpus() {
        let corpus = sample_corpus();
        let tokens = tokenize_indonesian("modal dasar perseroan");
        let scores = corpus.index.get_scores(&tokens);
        assert_eq!(scores.len(), 3);
    }

    #[test]
    fn test_relevant_doc_ranks_first() {
        let corpus = sample_corpus();
        let results = corpus.search("modal dasar perseroan", 3);
        assert!(!results.is_empty());
        assert_eq!(results[0].citation_id, "uu_40_2007_pasal_32");
    }

    #[test]
    fn test_phk_expansion_matches_pesangon_doc() {
        // "PHK" expands to "pemutusan hubungan kerja" before matching
        let corpus = sample_corpus();
        let results = corpus.search("aturan PHK", 3);
        assert!(!results.is_empty());
        assert_eq!(results[0].citation_id, "uu_13_2003_pasal_156");
    }

    #[test]
    fn test_zero_scores_excluded() {
        let corpus = sample_corpus();
        let results = corpus.search("xyzzy quux", 3);
        assert!(results.is_empty());
    }

    #[test]
    fn test_stopword_only_query() {
        let corpus = sample_corpus();
        assert!(corpus.search("yang di ke", 3).is_empty());
    }

    #[test]
    fn test_empty_corpus() {
        let corpus = SparseCorpus::build(vec![]);
        assert!(corpus.is_empty());
        assert!(corpus.search("perseroan", 3).is_empty());
    }

    #[test]
    fn test_chunk_counts_by_regulation() {
        let corpus = sample_corpus();
        let counts = corpus.chunk_counts_by_regulation();
        assert_eq!(counts.get("uu_40_2007"), Some(&2));
        assert_eq!(counts.get("uu_13_2003"), Some(&1));
    }

    #[test]
    fn test_scores_non_negative() {
        let corpus = sample_corpus();
        // "perseroan" appears in 2 of 3 docs: raw IDF is negative and
        // must be floored to a positive epsilon-scaled value
        let tokens = tokenize_indonesian("perseroan");
        let scores = corpus.index.get_scores(&tokens);
        for score in scores {
            assert!(score >= 0.0);
        }
    }
}
