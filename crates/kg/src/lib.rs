//! Knowledge graph for Indonesian legal documents
//!
//! Features:
//! - Typed nodes for the legal hierarchy (UU/PP/Perpres/Permen, Bab, Pasal)
//! - Directed multi-relation edges with per-type metadata
//! - Reverse-edge closure (AMENDS → AMENDED_BY etc.)
//! - BFS traversal of regulation relations under a deadline
//! - JSON persistence for startup-time loading
//! - Corpus-scope cross-reference and amendment extraction

pub mod amendment;
pub mod cross_reference;
pub mod graph;
pub mod persistence;
pub mod schema;

pub use amendment::AmendmentDetector;
pub use cross_reference::extract_legal_references;
pub use graph::{
    CrossReferences, GraphStats, HierarchyNode, LegalKnowledgeGraph, RegulationDetail,
    RegulationListQuery, RegulationSummary, RelatedRegulation, TimelineEntry,
};
pub use persistence::{load_graph, save_graph};
pub use schema::{EdgeType, Node, NodeKind};

use thiserror::Error;

/// Knowledge graph errors
#[derive(Error, Debug)]
pub enum KgError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<KgError> for omnilex_core::Error {
    fn from(err: KgError) -> Self {
        omnilex_core::Error::Kg(err.to_string())
    }
}
