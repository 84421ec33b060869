//! Vector store client (Qdrant)
//!
//! Dense ANN search with metadata filtering, startup-time scroll for the
//! BM25 corpus, and collection management including the bulk-ingest HNSW
//! toggle (`m=0` + zero indexing threshold during ingest, restored to
//! `m=16` / `ef_construct=100` afterwards).

use std::collections::HashMap;

use qdrant_client::qdrant::{
    value::Kind, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    HnswConfigDiffBuilder, OptimizersConfigDiffBuilder, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpdateCollectionBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::Value;
use uuid::Uuid;

use omnilex_core::{ChunkMetadata, SearchResult};

use crate::RagError;

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Qdrant endpoint
    pub url: String,
    /// API key for Qdrant Cloud (optional for local)
    pub api_key: Option<String>,
    /// Collection name (must match ingestion)
    pub collection: String,
    /// Vector dimensionality
    pub vector_dim: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: omnilex_config::constants::endpoints::QDRANT_DEFAULT.clone(),
            api_key: None,
            collection: omnilex_config::constants::retrieval::COLLECTION_NAME.to_string(),
            vector_dim: omnilex_config::constants::retrieval::HTTP_EMBEDDING_DIM,
        }
    }
}

/// Conjunction of equality constraints on chunk payload fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub jenis_dokumen: Option<String>,
    pub nomor: Option<String>,
    pub tahun: Option<i64>,
    pub pasal: Option<String>,
    pub ayat: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jenis_dokumen(mut self, jenis: impl Into<String>) -> Self {
        self.jenis_dokumen = Some(jenis.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.jenis_dokumen.is_none()
            && self.nomor.is_none()
            && self.tahun.is_none()
            && self.pasal.is_none()
            && self.ayat.is_none()
    }

    fn into_qdrant(self) -> Filter {
        let mut conditions = Vec::new();
        if let Some(jenis) = self.jenis_dokumen {
            conditions.push(Condition::matches("jenis_dokumen", jenis));
        }
        if let Some(nomor) = self.nomor {
            conditions.push(Condition::matches("nomor", nomor));
        }
        if let Some(tahun) = self.tahun {
            conditions.push(Condition::matches("tahun", tahun));
        }
        if let Some(pasal) = self.pasal {
            conditions.push(Condition::matches("pasal", pasal));
        }
        if let Some(ayat) = self.ayat {
            conditions.push(Condition::matches("ayat", ayat));
        }
        Filter::must(conditions)
    }
}

/// One chunk payload scrolled from the collection.
#[derive(Debug, Clone)]
pub struct ScrolledChunk {
    pub id: String,
    pub text: String,
    pub citation: String,
    pub citation_id: String,
    pub metadata: ChunkMetadata,
}

/// Vector store client
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    /// Connect to Qdrant, applying the API key when configured.
    pub fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Create the collection with serving HNSW parameters if absent.
    pub async fn ensure_collection(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection)
                        .vectors_config(VectorParamsBuilder::new(
                            self.config.vector_dim as u64,
                            Distance::Cosine,
                        ))
                        .hnsw_config(HnswConfigDiffBuilder::default().m(16).ef_construct(100)),
                )
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;
        }
        Ok(())
    }

    /// Disable HNSW graph maintenance for bulk ingest (m=0, no indexing
    /// threshold); dramatically faster upserts.
    pub async fn begin_bulk_ingest(&self) -> Result<(), RagError> {
        self.client
            .update_collection(
                UpdateCollectionBuilder::new(&self.config.collection)
                    .hnsw_config(HnswConfigDiffBuilder::default().m(0))
                    .optimizers_config(
                        OptimizersConfigDiffBuilder::default().indexing_threshold(0),
                    ),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(())
    }

    /// Restore serving HNSW parameters after bulk ingest.
    pub async fn finish_bulk_ingest(&self) -> Result<(), RagError> {
        self.client
            .update_collection(
                UpdateCollectionBuilder::new(&self.config.collection)
                    .hnsw_config(HnswConfigDiffBuilder::default().m(16).ef_construct(100))
                    .optimizers_config(
                        OptimizersConfigDiffBuilder::default().indexing_threshold(20_000),
                    ),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(())
    }

    /// Upsert chunk payloads with their embeddings. Point ids are
    /// derived deterministically from the citation id + content hash so
    /// re-ingestion updates in place.
    pub async fn upsert(
        &self,
        chunks: &[ScrolledChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::VectorStore(
                "chunk and embedding count mismatch".to_string(),
            ));
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                let mut payload_json = serde_json::to_value(&chunk.metadata)
                    .unwrap_or(Value::Object(Default::default()));
                if let Value::Object(ref mut map) = payload_json {
                    map.insert("text".to_string(), Value::String(chunk.text.clone()));
                    map.insert("citation".to_string(), Value::String(chunk.citation.clone()));
                    map.insert(
                        "citation_id".to_string(),
                        Value::String(chunk.citation_id.clone()),
                    );
                }
                let payload = Payload::try_from(payload_json).unwrap_or_default();

                let point_id = Uuid::new_v5(
                    &Uuid::NAMESPACE_OID,
                    format!(
                        "{}:{}",
                        chunk.citation_id,
                        chunk.metadata.content_hash.as_deref().unwrap_or("")
                    )
                    .as_bytes(),
                )
                .to_string();

                PointStruct::new(point_id, embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points))
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(())
    }

    /// Dense nearest-neighbor search with an optional payload filter.
    pub async fn query_points(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let mut builder = SearchPointsBuilder::new(
            &self.config.collection,
            query_embedding.to_vec(),
            top_k as u64,
        )
        .with_payload(true);

        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            builder = builder.filter(filter.into_qdrant());
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                let id = point
                    .id
                    .and_then(|pid| pid.point_id_options)
                    .map(point_id_to_string)
                    .unwrap_or_default();
                let payload = qdrant_payload_to_json(point.payload);
                let (text, citation, citation_id, metadata) = split_payload(payload);
                SearchResult {
                    id,
                    text,
                    citation,
                    citation_id,
                    score: point.score,
                    metadata,
                }
            })
            .collect();

        Ok(results)
    }

    /// Scroll all payloads from the collection (vectors excluded).
    /// Used once at startup to build the BM25 corpus.
    pub async fn scroll_all(&self, batch_size: usize) -> Result<Vec<ScrolledChunk>, RagError> {
        let mut chunks = Vec::new();
        let mut offset = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.config.collection)
                .limit(batch_size as u32)
                .with_payload(true)
                .with_vectors(false);
            if let Some(offset_id) = offset {
                builder = builder.offset(offset_id);
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            for point in response.result {
                let id = point
                    .id
                    .and_then(|pid| pid.point_id_options)
                    .map(point_id_to_string)
                    .unwrap_or_default();
                let payload = qdrant_payload_to_json(point.payload);
                let (text, citation, citation_id, metadata) = split_payload(payload);
                chunks.push(ScrolledChunk {
                    id,
                    text,
                    citation,
                    citation_id,
                    metadata,
                });
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::info!(count = chunks.len(), "Scrolled corpus from vector store");
        Ok(chunks)
    }

    /// Delete all points matching a filter (used by incremental sync).
    pub async fn delete_by_filter(&self, filter: SearchFilter) -> Result<(), RagError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.config.collection)
                    .points(filter.into_qdrant()),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(())
    }

    /// Point count in the collection.
    pub async fn count(&self) -> Result<u64, RagError> {
        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or_default())
    }
}

fn point_id_to_string(options: qdrant_client::qdrant::point_id::PointIdOptions) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match options {
        PointIdOptions::Uuid(uuid) => uuid,
        PointIdOptions::Num(num) => num.to_string(),
    }
}

/// Convert a Qdrant payload map into plain JSON.
fn qdrant_payload_to_json(
    payload: HashMap<String, qdrant_client::qdrant::Value>,
) -> HashMap<String, Value> {
    payload
        .into_iter()
        .map(|(key, value)| (key, qdrant_value_to_json(value)))
        .collect()
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> Value {
    match value.kind {
        Some(Kind::NullValue(_)) | None => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => {
            serde_json::Number::from_f64(d).map(Value::Number).unwrap_or(Value::Null)
        }
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(map)) => Value::Object(
            map.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
    }
}

/// Split a payload into (text, citation, citation_id, metadata).
fn split_payload(mut payload: HashMap<String, Value>) -> (String, String, String, ChunkMetadata) {
    let text = payload
        .remove("text")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let citation = payload
        .remove("citation")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let citation_id = payload
        .remove("citation_id")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let metadata = ChunkMetadata::from_payload(payload);
    (text, citation, citation_id, metadata)
}
