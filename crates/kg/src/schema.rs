//! Node and edge schema for the legal knowledge graph
//!
//! Node types map to the Indonesian legal document hierarchy:
//! - UU (Undang-Undang) → `Law`
//! - PP (Peraturan Pemerintah) → `GovernmentRegulation`
//! - Perpres (Peraturan Presiden) → `PresidentialRegulation`
//! - Permen (Peraturan Menteri) → `MinisterialRegulation`
//! - Bab → `Chapter`
//! - Pasal → `Article`
//!
//! Node id format: `{jenis_dokumen_lower}_{nomor}_{tahun}` (e.g.
//! `uu_11_2020`), extended with `_bab_{n}` / `_pasal_{n}` for children.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Relationship types between nodes.
///
/// The first seven are authored by ingestion; the reverse types are
/// derived by [`ensure_reverse_edges`](crate::graph::LegalKnowledgeGraph::ensure_reverse_edges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Hierarchy: regulation → chapter → article
    Contains,
    /// PP/Perpres → the law it implements
    Implements,
    /// Law → law it amends
    Amends,
    /// Law → law it revokes
    Revokes,
    /// Law → law it replaces
    Replaces,
    /// Article → article cross-reference
    References,
    /// Law → law it supersedes
    Supersedes,
    // Derived reverse relations
    AmendedBy,
    RevokedBy,
    ReplacedBy,
    ImplementedBy,
}

impl EdgeType {
    /// The inverse relation, for edge types that define one.
    pub fn reverse(&self) -> Option<EdgeType> {
        match self {
            EdgeType::Amends => Some(EdgeType::AmendedBy),
            EdgeType::Revokes => Some(EdgeType::RevokedBy),
            EdgeType::Replaces => Some(EdgeType::ReplacedBy),
            EdgeType::Implements => Some(EdgeType::ImplementedBy),
            _ => None,
        }
    }

    /// Edge types that express an amendment-family relation.
    pub fn is_amendment_family(&self) -> bool {
        matches!(
            self,
            EdgeType::Amends
                | EdgeType::AmendedBy
                | EdgeType::Revokes
                | EdgeType::RevokedBy
                | EdgeType::Replaces
                | EdgeType::ReplacedBy
        )
    }

    /// Edge types followed by regulation-level BFS traversal.
    pub fn is_regulation_relation(&self) -> bool {
        matches!(
            self,
            EdgeType::Implements | EdgeType::Amends | EdgeType::References | EdgeType::Supersedes
        )
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeType::Contains => "CONTAINS",
            EdgeType::Implements => "IMPLEMENTS",
            EdgeType::Amends => "AMENDS",
            EdgeType::Revokes => "REVOKES",
            EdgeType::Replaces => "REPLACES",
            EdgeType::References => "REFERENCES",
            EdgeType::Supersedes => "SUPERSEDES",
            EdgeType::AmendedBy => "AMENDED_BY",
            EdgeType::RevokedBy => "REVOKED_BY",
            EdgeType::ReplacedBy => "REPLACED_BY",
            EdgeType::ImplementedBy => "IMPLEMENTED_BY",
        };
        f.write_str(s)
    }
}

/// Node kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Law,
    GovernmentRegulation,
    PresidentialRegulation,
    MinisterialRegulation,
    Chapter,
    Article,
}

impl NodeKind {
    pub fn is_regulation(&self) -> bool {
        matches!(
            self,
            NodeKind::Law
                | NodeKind::GovernmentRegulation
                | NodeKind::PresidentialRegulation
                | NodeKind::MinisterialRegulation
        )
    }
}

/// Current legal status of a law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LawStatus {
    #[default]
    Active,
    Amended,
    Repealed,
}

impl fmt::Display for LawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LawStatus::Active => "active",
            LawStatus::Amended => "amended",
            LawStatus::Repealed => "repealed",
        };
        f.write_str(s)
    }
}

/// A knowledge graph node, tagged by `node_type` for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum Node {
    /// Undang-Undang (UU) — primary legislation enacted by parliament
    Law {
        id: String,
        number: i64,
        year: i64,
        title: String,
        about: String,
        #[serde(default)]
        status: LawStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enactment_date: Option<String>,
    },
    /// Peraturan Pemerintah (PP) — implementing regulation by government
    GovernmentRegulation {
        id: String,
        number: i64,
        year: i64,
        title: String,
        about: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_law_id: Option<String>,
    },
    /// Peraturan Presiden (Perpres)
    PresidentialRegulation {
        id: String,
        number: i64,
        year: i64,
        title: String,
        about: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_law_id: Option<String>,
    },
    /// Peraturan Menteri (Permen)
    MinisterialRegulation {
        id: String,
        number: i64,
        year: i64,
        title: String,
        about: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issuing_ministry: Option<String>,
    },
    /// Bab: chapter within a regulation; number is a Roman numeral
    Chapter {
        id: String,
        number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        parent_regulation_id: String,
    },
    /// Pasal: article within a regulation or chapter
    Article {
        id: String,
        number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_summary: Option<String>,
        full_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_chapter_id: Option<String>,
        parent_regulation_id: String,
    },
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Law { id, .. }
            | Node::GovernmentRegulation { id, .. }
            | Node::PresidentialRegulation { id, .. }
            | Node::MinisterialRegulation { id, .. }
            | Node::Chapter { id, .. }
            | Node::Article { id, .. } => id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Law { .. } => NodeKind::Law,
            Node::GovernmentRegulation { .. } => NodeKind::GovernmentRegulation,
            Node::PresidentialRegulation { .. } => NodeKind::PresidentialRegulation,
            Node::MinisterialRegulation { .. } => NodeKind::MinisterialRegulation,
            Node::Chapter { .. } => NodeKind::Chapter,
            Node::Article { .. } => NodeKind::Article,
        }
    }

    pub fn is_regulation(&self) -> bool {
        self.kind().is_regulation()
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Node::Law { title, .. }
            | Node::GovernmentRegulation { title, .. }
            | Node::PresidentialRegulation { title, .. }
            | Node::MinisterialRegulation { title, .. } => Some(title),
            Node::Chapter { title, .. } => title.as_deref(),
            Node::Article { .. } => None,
        }
    }

    pub fn about(&self) -> Option<&str> {
        match self {
            Node::Law { about, .. }
            | Node::GovernmentRegulation { about, .. }
            | Node::PresidentialRegulation { about, .. }
            | Node::MinisterialRegulation { about, .. } => Some(about),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<i64> {
        match self {
            Node::Law { year, .. }
            | Node::GovernmentRegulation { year, .. }
            | Node::PresidentialRegulation { year, .. }
            | Node::MinisterialRegulation { year, .. } => Some(*year),
            _ => None,
        }
    }

    pub fn regulation_number(&self) -> Option<i64> {
        match self {
            Node::Law { number, .. }
            | Node::GovernmentRegulation { number, .. }
            | Node::PresidentialRegulation { number, .. }
            | Node::MinisterialRegulation { number, .. } => Some(*number),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<LawStatus> {
        match self {
            Node::Law { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Concatenated text fields used by the simple node search.
    pub fn searchable_text(&self) -> String {
        match self {
            Node::Law { title, about, .. }
            | Node::GovernmentRegulation { title, about, .. }
            | Node::PresidentialRegulation { title, about, .. }
            | Node::MinisterialRegulation { title, about, .. } => format!("{} {}", title, about),
            Node::Chapter { title, .. } => title.clone().unwrap_or_default(),
            Node::Article {
                full_text,
                content_summary,
                ..
            } => match content_summary {
                Some(summary) => format!("{} {}", full_text, summary),
                None => full_text.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn law() -> Node {
        Node::Law {
            id: "uu_11_2020".to_string(),
            number: 11,
            year: 2020,
            title: "UU Cipta Kerja".to_string(),
            about: "Cipta Kerja".to_string(),
            status: LawStatus::Active,
            enactment_date: None,
        }
    }

    #[test]
    fn test_edge_type_serde_screaming_snake() {
        let json = serde_json::to_string(&EdgeType::AmendedBy).unwrap();
        assert_eq!(json, "\"AMENDED_BY\"");
        let parsed: EdgeType = serde_json::from_str("\"CONTAINS\"").unwrap();
        assert_eq!(parsed, EdgeType::Contains);
    }

    #[test]
    fn test_edge_reverse_mapping() {
        assert_eq!(EdgeType::Amends.reverse(), Some(EdgeType::AmendedBy));
        assert_eq!(EdgeType::Revokes.reverse(), Some(EdgeType::RevokedBy));
        assert_eq!(EdgeType::Replaces.reverse(), Some(EdgeType::ReplacedBy));
        assert_eq!(EdgeType::Implements.reverse(), Some(EdgeType::ImplementedBy));
        assert_eq!(EdgeType::Contains.reverse(), None);
        assert_eq!(EdgeType::References.reverse(), None);
    }

    #[test]
    fn test_node_tagged_serialization() {
        let json = serde_json::to_value(law()).unwrap();
        assert_eq!(json["node_type"], "law");
        assert_eq!(json["status"], "active");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), NodeKind::Law);
        assert_eq!(back.id(), "uu_11_2020");
    }

    #[test]
    fn test_regulation_predicates() {
        assert!(law().is_regulation());
        let article = Node::Article {
            id: "uu_11_2020_pasal_5".to_string(),
            number: "5".to_string(),
            content_summary: None,
            full_text: "isi pasal".to_string(),
            parent_chapter_id: None,
            parent_regulation_id: "uu_11_2020".to_string(),
        };
        assert!(!article.is_regulation());
        assert_eq!(article.searchable_text(), "isi pasal");
    }
}
