//! Core types for the Indonesian legal RAG engine
//!
//! This crate provides the foundational types shared across all other
//! crates:
//! - Chunk payload metadata and search results
//! - Legal reference and amendment value types
//! - Canonical regulation/citation id normalization
//! - The top-level error type

pub mod citation;
pub mod document;
pub mod error;
pub mod reference;

pub use citation::{normalize_regulation_id, regulation_id_from_metadata};
pub use document::{ChunkMetadata, SearchResult};
pub use error::{Error, Result};
pub use reference::{normalize_jenis, AmendmentRelation, AmendmentType, LegalReference};
