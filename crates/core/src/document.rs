//! Chunk payload and search result types
//!
//! A chunk is one retrievable unit of regulation text, created by the
//! ingestion pipeline and immutable at serving time. Its payload travels
//! through the retrieval pipeline inside a [`SearchResult`] whose score
//! semantics change per stage (cosine, BM25, RRF, boosted, reranked).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata payload stored alongside each chunk.
///
/// The composite key (jenis, nomor, tahun, pasal, ayat) is unique per
/// chunk; `content_hash` identifies the whitespace-normalized text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Regulation type (UU, PP, Perpres, Permen, Perda, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jenis_dokumen: Option<String>,
    /// Regulation number (nomor)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomor: Option<String>,
    /// Year of enactment (tahun)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tahun: Option<i64>,
    /// Short title (judul)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judul: Option<String>,
    /// Subject matter (tentang)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tentang: Option<String>,
    /// Chapter (bab)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bab: Option<String>,
    /// Article number (pasal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pasal: Option<String>,
    /// Paragraph number (ayat)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ayat: Option<String>,
    /// Citation id of the parent chunk (for parent-child expansion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_citation_id: Option<String>,
    /// Breadcrumb of enclosing structure ("UU 11/2020 > Bab II > Pasal 5")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_context: Option<String>,
    /// Whether this chunk is from the elucidation (penjelasan) section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_penjelasan: Option<bool>,
    /// Ingestion quality flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_flag: Option<String>,
    /// Hash of the whitespace-normalized chunk text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Source file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    /// Source label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Markdown format pattern detected at ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_pattern: Option<String>,
    /// Ingestion timestamp (ISO-8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<String>,
    /// Any additional payload fields the ingestion attached
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ChunkMetadata {
    /// Build metadata from a raw payload map (e.g. a Qdrant scroll record),
    /// dropping the text/citation fields that live on the result itself.
    pub fn from_payload(payload: HashMap<String, Value>) -> Self {
        let mut meta = ChunkMetadata::default();
        for (key, value) in payload {
            match key.as_str() {
                "text" | "citation" | "citation_id" => {}
                "jenis_dokumen" => meta.jenis_dokumen = value.as_str().map(str::to_string),
                "nomor" => {
                    meta.nomor = match value {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }
                }
                "tahun" => meta.tahun = value.as_i64(),
                "judul" => meta.judul = value.as_str().map(str::to_string),
                "tentang" => meta.tentang = value.as_str().map(str::to_string),
                "bab" => meta.bab = value.as_str().map(str::to_string),
                "pasal" => {
                    meta.pasal = match value {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }
                }
                "ayat" => {
                    meta.ayat = match value {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }
                }
                "parent_citation_id" => {
                    meta.parent_citation_id = value.as_str().map(str::to_string)
                }
                "parent_context" => meta.parent_context = value.as_str().map(str::to_string),
                "is_penjelasan" => meta.is_penjelasan = value.as_bool(),
                "quality_flag" => meta.quality_flag = value.as_str().map(str::to_string),
                "content_hash" => meta.content_hash = value.as_str().map(str::to_string),
                "filepath" => meta.filepath = value.as_str().map(str::to_string),
                "source" => meta.source = value.as_str().map(str::to_string),
                "format_pattern" => meta.format_pattern = value.as_str().map(str::to_string),
                "ingested_at" => meta.ingested_at = value.as_str().map(str::to_string),
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }
        meta
    }
}

/// Single search result carried through the retrieval pipeline.
///
/// The score is stage-dependent: cosine similarity after dense search,
/// raw BM25 after sparse search, accumulated RRF after fusion, then
/// boost-scaled and finally reranker-normalized into [0, 1]. Reported
/// scores are always non-negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Point id in the vector index
    pub id: String,
    /// Verbatim chunk text
    pub text: String,
    /// Human-readable citation ("UU No. 11 Tahun 2020 Pasal 5")
    pub citation: String,
    /// Canonical citation id ("uu_11_2020_pasal_5")
    pub citation_id: String,
    /// Stage-dependent relevance score
    pub score: f32,
    /// Chunk metadata payload
    pub metadata: ChunkMetadata,
}

impl SearchResult {
    /// Return a copy with the score replaced.
    pub fn with_score(&self, score: f32) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }
}
