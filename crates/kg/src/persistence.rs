//! JSON persistence for the knowledge graph
//!
//! The on-disk document is `{"nodes": [...], "edges": [...]}`. Loading
//! reconstructs the graph and runs the reverse-edge closure so older
//! snapshots without derived edges stay queryable in both directions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::{EdgeData, LegalKnowledgeGraph};
use crate::schema::Node;
use crate::KgError;

/// Serialized edge record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub data: EdgeData,
}

/// Serialized graph document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRecord>,
}

impl LegalKnowledgeGraph {
    /// Serialize the entire graph into a persistable document.
    pub fn to_document(&self) -> GraphDocument {
        let mut nodes: Vec<Node> = self.iter_nodes().cloned().collect();
        nodes.sort_by(|a, b| a.id().cmp(b.id()));

        let mut edges: Vec<EdgeRecord> = self
            .iter_edges()
            .map(|(source, target, data)| EdgeRecord {
                source: source.to_string(),
                target: target.to_string(),
                data: data.clone(),
            })
            .collect();
        edges.sort_by(|a, b| (a.source.as_str(), a.target.as_str())
            .cmp(&(b.source.as_str(), b.target.as_str())));

        GraphDocument { nodes, edges }
    }

    /// Rebuild a graph from a persisted document and close reverse edges.
    pub fn from_document(document: GraphDocument) -> Self {
        let mut kg = LegalKnowledgeGraph::new();
        for node in document.nodes {
            kg.add_node(node);
        }
        for edge in document.edges {
            for edge_type in edge.data.edge_types {
                let metadata = edge.data.metadata_map.get(&edge_type.to_string()).cloned();
                kg.add_edge(&edge.source, &edge.target, edge_type, metadata);
            }
        }
        let added = kg.ensure_reverse_edges();
        if added > 0 {
            tracing::info!(added, "Reverse edges derived on graph load");
        }
        kg
    }
}

/// Write the graph as pretty-printed JSON, creating parent directories.
pub fn save_graph(graph: &LegalKnowledgeGraph, filepath: &Path) -> Result<(), KgError> {
    if let Some(parent) = filepath.parent() {
        fs::create_dir_all(parent).map_err(|e| KgError::Persistence(e.to_string()))?;
    }
    let document = graph.to_document();
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| KgError::Persistence(e.to_string()))?;
    fs::write(filepath, json).map_err(|e| KgError::Persistence(e.to_string()))?;
    Ok(())
}

/// Load a graph from a JSON file.
pub fn load_graph(filepath: &Path) -> Result<LegalKnowledgeGraph, KgError> {
    let json = fs::read_to_string(filepath).map_err(|e| KgError::Persistence(e.to_string()))?;
    let document: GraphDocument =
        serde_json::from_str(&json).map_err(|e| KgError::Persistence(e.to_string()))?;
    Ok(LegalKnowledgeGraph::from_document(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EdgeType, LawStatus};

    fn sample() -> LegalKnowledgeGraph {
        let mut kg = LegalKnowledgeGraph::new();
        kg.add_regulation(Node::Law {
            id: "uu_11_2020".to_string(),
            number: 11,
            year: 2020,
            title: "UU Cipta Kerja".to_string(),
            about: "Cipta Kerja".to_string(),
            status: LawStatus::Active,
            enactment_date: Some("2020-11-02".to_string()),
        });
        kg.add_regulation(Node::Law {
            id: "uu_13_2003".to_string(),
            number: 13,
            year: 2003,
            title: "UU Ketenagakerjaan".to_string(),
            about: "Ketenagakerjaan".to_string(),
            status: LawStatus::Amended,
            enactment_date: None,
        });
        kg.add_edge("uu_11_2020", "uu_13_2003", EdgeType::Amends, None);
        kg.add_edge(
            "uu_11_2020",
            "uu_13_2003",
            EdgeType::References,
            Some(serde_json::json!({"pasal": "81"})),
        );
        kg
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut kg = sample();
        kg.ensure_reverse_edges();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg").join("graph.json");
        save_graph(&kg, &path).unwrap();

        let loaded = load_graph(&path).unwrap();
        assert_eq!(loaded.node_count(), kg.node_count());
        assert_eq!(loaded.edge_count(), kg.edge_count());

        // Multi-typed edge survives with both types and metadata
        let detail = loaded.get_regulation_detail("uu_11_2020").unwrap();
        assert!(detail
            .amendments
            .iter()
            .any(|a| a.edge_type == EdgeType::Amends));

        let stats = loaded.get_stats();
        assert_eq!(stats.edges_by_type.get("AMENDS"), Some(&1));
        assert_eq!(stats.edges_by_type.get("REFERENCES"), Some(&1));
        assert_eq!(stats.edges_by_type.get("AMENDED_BY"), Some(&1));
    }

    #[test]
    fn test_load_derives_reverse_edges() {
        // A snapshot saved before the reverse pass still loads complete
        let kg = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        save_graph(&kg, &path).unwrap();

        let loaded = load_graph(&path).unwrap();
        let amendments = loaded.get_amendments("uu_13_2003");
        assert_eq!(amendments.len(), 1);
        let stats = loaded.get_stats();
        assert_eq!(stats.edges_by_type.get("AMENDED_BY"), Some(&1));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load_graph(Path::new("/nonexistent/graph.json"));
        assert!(err.is_err());
    }
}
