//! Directed multi-relation graph of legal documents
//!
//! Nodes are keyed by canonical id; a (source, target) pair carries a set
//! of edge types plus per-type metadata, so multiple relations (e.g.
//! IMPLEMENTS and REFERENCES) can coexist on the same pair.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{EdgeType, LawStatus, Node, NodeKind};

/// Typed relation data stored per (source, target) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeData {
    /// All relation types present on this pair
    pub edge_types: BTreeSet<EdgeType>,
    /// Per-edge-type metadata, keyed by the edge type's display form
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata_map: HashMap<String, Value>,
}

impl EdgeData {
    pub fn has_type(&self, edge_type: EdgeType) -> bool {
        self.edge_types.contains(&edge_type)
    }

    /// Any type in the regulation-relation family (BFS traversal set).
    fn regulation_relation(&self) -> Option<EdgeType> {
        self.edge_types
            .iter()
            .copied()
            .find(EdgeType::is_regulation_relation)
    }
}

/// One regulation reached by BFS traversal.
#[derive(Debug, Clone)]
pub struct RelatedRegulation {
    pub node: Node,
    /// Hops from the source regulation
    pub hop: usize,
    /// Path of (edge_type, node_id) steps; reverse-direction steps are
    /// marked with a `~` prefix on the edge type
    pub path: Vec<(String, String)>,
}

/// Node/edge counts grouped by type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_type: HashMap<String, usize>,
    pub edges_by_type: HashMap<String, usize>,
}

/// Hierarchy tree rooted at a regulation.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyNode {
    pub node: Node,
    pub children: Vec<HierarchyNode>,
}

/// Regulation list entry with aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationSummary {
    pub id: String,
    pub node_type: NodeKind,
    pub number: i64,
    pub year: i64,
    pub title: String,
    pub about: String,
    pub status: String,
    pub chapter_count: usize,
    pub article_count: usize,
    pub amendment_count: usize,
    pub cross_reference_count: usize,
    /// Filled in by the API layer from the vector index
    pub indexed_chunk_count: usize,
}

/// Article detail with outgoing cross-references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub id: String,
    pub number: String,
    pub full_text: String,
    pub content_summary: Option<String>,
    pub parent_chapter_id: Option<String>,
    pub cross_references: Vec<String>,
}

/// Chapter detail with contained articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDetail {
    pub id: String,
    pub number: String,
    pub title: Option<String>,
    pub articles: Vec<ArticleDetail>,
}

/// Amendment relationship attached to a regulation detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmendmentInfo {
    pub regulation_id: String,
    pub regulation_title: String,
    pub year: i64,
    /// "forward" (this regulation acts) or "backward" (acted upon)
    pub direction: String,
    pub edge_type: EdgeType,
}

/// Full regulation detail: hierarchy plus relationships.
#[derive(Debug, Clone, Serialize)]
pub struct RegulationDetail {
    pub node: Node,
    pub chapters: Vec<ChapterDetail>,
    pub amendments: Vec<AmendmentInfo>,
    pub implementing_regulations: Vec<RegulationSummary>,
    pub parent_law: Option<RegulationSummary>,
    pub cross_reference_count: usize,
    pub indexed_chunk_count: usize,
}

/// Chronological amendment/revocation timeline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub regulation_id: String,
    pub regulation_title: String,
    pub year: i64,
    pub number: i64,
    pub edge_type: EdgeType,
    pub direction: String,
    pub target_id: String,
    pub target_title: String,
}

/// Outgoing and incoming article cross-references.
#[derive(Debug, Clone, Serialize)]
pub struct CrossReferences {
    pub references_to: Vec<Node>,
    pub referenced_by: Vec<Node>,
}

/// Filters and sorting for the regulation library listing.
#[derive(Debug, Clone, Default)]
pub struct RegulationListQuery {
    pub node_type: Option<NodeKind>,
    pub status: Option<LawStatus>,
    pub year: Option<i64>,
    pub search_query: Option<String>,
    /// One of "year", "number", "title", "article_count"
    pub sort_by: Option<String>,
    pub ascending: bool,
}

/// Knowledge graph of Indonesian legal documents.
#[derive(Debug, Default, Clone)]
pub struct LegalKnowledgeGraph {
    nodes: HashMap<String, Node>,
    edges: HashMap<(String, String), EdgeData>,
    out_adjacency: HashMap<String, Vec<String>>,
    in_adjacency: HashMap<String, Vec<String>>,
}

impl LegalKnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Add operations ───────────────────────────────────────────────

    /// Add or replace a node of any kind.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id().to_string(), node);
    }

    /// Add a regulation node (Law, PP, Perpres, or Permen).
    pub fn add_regulation(&mut self, node: Node) {
        debug_assert!(node.is_regulation());
        self.add_node(node);
    }

    /// Add a chapter node and a CONTAINS edge from its parent regulation.
    pub fn add_chapter(&mut self, chapter: Node) {
        if let Node::Chapter {
            id,
            parent_regulation_id,
            ..
        } = &chapter
        {
            let (parent, child) = (parent_regulation_id.clone(), id.clone());
            self.add_node(chapter);
            self.add_edge(&parent, &child, EdgeType::Contains, None);
        }
    }

    /// Add an article node and a CONTAINS edge from its parent
    /// (chapter when present, regulation otherwise).
    pub fn add_article(&mut self, article: Node) {
        if let Node::Article {
            id,
            parent_chapter_id,
            parent_regulation_id,
            ..
        } = &article
        {
            let parent = parent_chapter_id
                .clone()
                .unwrap_or_else(|| parent_regulation_id.clone());
            let child = id.clone();
            self.add_node(article);
            self.add_edge(&parent, &child, EdgeType::Contains, None);
        }
    }

    /// Add a typed directed edge.
    ///
    /// Merge semantics: an existing (source, target) pair keeps its other
    /// edge types and their metadata; the new type joins `edge_types` and
    /// its metadata is stored under the type's key.
    pub fn add_edge(
        &mut self,
        source_id: &str,
        target_id: &str,
        edge_type: EdgeType,
        metadata: Option<Value>,
    ) {
        let key = (source_id.to_string(), target_id.to_string());
        let is_new_pair = !self.edges.contains_key(&key);

        let data = self.edges.entry(key).or_default();
        data.edge_types.insert(edge_type);
        if let Some(metadata) = metadata {
            data.metadata_map
                .entry(edge_type.to_string())
                .or_insert(metadata);
        }

        if is_new_pair {
            self.out_adjacency
                .entry(source_id.to_string())
                .or_default()
                .push(target_id.to_string());
            self.in_adjacency
                .entry(target_id.to_string())
                .or_default()
                .push(source_id.to_string());
        }
    }

    // ── Basic accessors ──────────────────────────────────────────────

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Regulation node data by id, or `None` if absent or structural.
    pub fn get_regulation(&self, reg_id: &str) -> Option<&Node> {
        self.nodes.get(reg_id).filter(|n| n.is_regulation())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge_data(&self, source: &str, target: &str) -> Option<&EdgeData> {
        self.edges
            .get(&(source.to_string(), target.to_string()))
    }

    /// Outgoing (target, data) pairs in insertion order.
    fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = (&'a str, &'a EdgeData)> + 'a {
        self.out_adjacency
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(move |target| {
                self.edge_data(node_id, target)
                    .map(|data| (target.as_str(), data))
            })
    }

    /// Incoming (source, data) pairs in insertion order.
    fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = (&'a str, &'a EdgeData)> + 'a {
        self.in_adjacency
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(move |source| {
                self.edge_data(source, node_id)
                    .map(|data| (source.as_str(), data))
            })
    }

    /// Iterate all (source, target, data) triples.
    pub fn iter_edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.edges
            .iter()
            .map(|((s, t), data)| (s.as_str(), t.as_str(), data))
    }

    /// Iterate all nodes.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    // ── Query operations ─────────────────────────────────────────────

    /// Full hierarchy tree rooted at a regulation: chapters with their
    /// articles, and articles directly under the regulation.
    pub fn get_hierarchy(&self, regulation_id: &str) -> Option<HierarchyNode> {
        let root = self.get_regulation(regulation_id)?;

        let mut children = Vec::new();
        for (child_id, data) in self.outgoing(regulation_id) {
            if !data.has_type(EdgeType::Contains) {
                continue;
            }
            let Some(child) = self.nodes.get(child_id) else {
                continue;
            };
            let mut grandchildren = Vec::new();
            for (grandchild_id, grandchild_data) in self.outgoing(child_id) {
                if !grandchild_data.has_type(EdgeType::Contains) {
                    continue;
                }
                if let Some(grandchild) = self.nodes.get(grandchild_id) {
                    grandchildren.push(HierarchyNode {
                        node: grandchild.clone(),
                        children: Vec::new(),
                    });
                }
            }
            children.push(HierarchyNode {
                node: child.clone(),
                children: grandchildren,
            });
        }

        Some(HierarchyNode {
            node: root.clone(),
            children,
        })
    }

    /// Nodes the given article references or is referenced by.
    pub fn get_references(&self, article_id: &str) -> Vec<&Node> {
        let mut refs = Vec::new();
        for (target, data) in self.outgoing(article_id) {
            if data.has_type(EdgeType::References) {
                if let Some(node) = self.nodes.get(target) {
                    refs.push(node);
                }
            }
        }
        for (source, data) in self.incoming(article_id) {
            if data.has_type(EdgeType::References) {
                if let Some(node) = self.nodes.get(source) {
                    refs.push(node);
                }
            }
        }
        refs
    }

    /// Amendment chain for a law: laws that amend it and laws it amends.
    pub fn get_amendments(&self, law_id: &str) -> Vec<&Node> {
        let mut amendments = Vec::new();
        for (source, data) in self.incoming(law_id) {
            if data.has_type(EdgeType::Amends) {
                if let Some(node) = self.nodes.get(source) {
                    amendments.push(node);
                }
            }
        }
        for (target, data) in self.outgoing(law_id) {
            if data.has_type(EdgeType::Amends) {
                if let Some(node) = self.nodes.get(target) {
                    amendments.push(node);
                }
            }
        }
        amendments
    }

    /// PP/Perpres that implement the given law (incoming IMPLEMENTS).
    pub fn get_implementing_regulations(&self, law_id: &str) -> Vec<&Node> {
        self.incoming(law_id)
            .filter(|(_, data)| data.has_type(EdgeType::Implements))
            .filter_map(|(source, _)| self.nodes.get(source))
            .collect()
    }

    /// Regulations related to `reg_id` via BFS over IMPLEMENTS / AMENDS /
    /// REFERENCES / SUPERSEDES edges, both directions, up to `max_hops`.
    ///
    /// The deadline is checked at every edge; on expiry the traversal
    /// returns whatever it has found so far. The source itself is
    /// excluded; only regulation-level nodes are returned.
    pub fn get_related_regulations(
        &self,
        reg_id: &str,
        max_hops: usize,
        timeout: Duration,
    ) -> Vec<RelatedRegulation> {
        if !self.nodes.contains_key(reg_id) {
            return Vec::new();
        }

        let deadline = Instant::now() + timeout;
        let mut queue: VecDeque<(String, usize, Vec<(String, String)>)> = VecDeque::new();
        queue.push_back((reg_id.to_string(), 0, Vec::new()));
        let mut visited: HashSet<String> = HashSet::from([reg_id.to_string()]);
        let mut results = Vec::new();

        'bfs: while let Some((current_id, hop, path)) = queue.pop_front() {
            if Instant::now() > deadline {
                tracing::debug!(reg_id, hop, "KG traversal deadline exceeded");
                break;
            }
            if hop >= max_hops {
                continue;
            }

            for (neighbor, data) in self.outgoing(&current_id) {
                if Instant::now() > deadline {
                    break 'bfs;
                }
                let Some(edge_type) = data.regulation_relation() else {
                    continue;
                };
                if visited.contains(neighbor) {
                    continue;
                }
                let Some(node) = self.nodes.get(neighbor) else {
                    continue;
                };
                if !node.is_regulation() {
                    continue;
                }

                visited.insert(neighbor.to_string());
                let mut new_path = path.clone();
                new_path.push((edge_type.to_string(), neighbor.to_string()));
                results.push(RelatedRegulation {
                    node: node.clone(),
                    hop: hop + 1,
                    path: new_path.clone(),
                });
                queue.push_back((neighbor.to_string(), hop + 1, new_path));
            }

            for (neighbor, data) in self.incoming(&current_id) {
                if Instant::now() > deadline {
                    break 'bfs;
                }
                let Some(edge_type) = data.regulation_relation() else {
                    continue;
                };
                if visited.contains(neighbor) {
                    continue;
                }
                let Some(node) = self.nodes.get(neighbor) else {
                    continue;
                };
                if !node.is_regulation() {
                    continue;
                }

                visited.insert(neighbor.to_string());
                let mut new_path = path.clone();
                new_path.push((format!("~{}", edge_type), neighbor.to_string()));
                results.push(RelatedRegulation {
                    node: node.clone(),
                    hop: hop + 1,
                    path: new_path.clone(),
                });
                queue.push_back((neighbor.to_string(), hop + 1, new_path));
            }
        }

        results
    }

    /// Case-insensitive text search across node title/about/text fields.
    pub fn search_nodes(&self, query: &str, node_type: Option<NodeKind>) -> Vec<&Node> {
        let query_lower = query.to_lowercase();
        self.nodes
            .values()
            .filter(|node| node_type.map_or(true, |kind| node.kind() == kind))
            .filter(|node| node.searchable_text().to_lowercase().contains(&query_lower))
            .collect()
    }

    /// Node and edge counts grouped by type.
    pub fn get_stats(&self) -> GraphStats {
        let mut nodes_by_type: HashMap<String, usize> = HashMap::new();
        for node in self.nodes.values() {
            let key = serde_json::to_value(node.kind())
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            *nodes_by_type.entry(key).or_default() += 1;
        }

        let mut edges_by_type: HashMap<String, usize> = HashMap::new();
        for data in self.edges.values() {
            for edge_type in &data.edge_types {
                *edges_by_type.entry(edge_type.to_string()).or_default() += 1;
            }
        }

        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            nodes_by_type,
            edges_by_type,
        }
    }

    /// Create reverse edges for all directional relationships.
    ///
    /// For every AMENDS(A→B) edge, ensures AMENDED_BY(B→A) exists; same
    /// for REVOKES / REPLACES / IMPLEMENTS. Idempotent: a second call
    /// adds zero edges. Returns the number of reverse types added.
    pub fn ensure_reverse_edges(&mut self) -> usize {
        let mut to_add: Vec<(String, String, EdgeType)> = Vec::new();

        for ((source, target), data) in &self.edges {
            for edge_type in &data.edge_types {
                let Some(reverse_type) = edge_type.reverse() else {
                    continue;
                };
                let reverse_exists = self
                    .edges
                    .get(&(target.clone(), source.clone()))
                    .map(|d| d.has_type(reverse_type))
                    .unwrap_or(false);
                if !reverse_exists {
                    to_add.push((target.clone(), source.clone(), reverse_type));
                }
            }
        }

        let added = to_add.len();
        for (source, target, edge_type) in to_add {
            self.add_edge(&source, &target, edge_type, None);
        }
        added
    }

    // ── Regulation library queries ───────────────────────────────────

    fn count_structure(&self, reg_id: &str) -> (usize, usize, usize) {
        let mut chapter_count = 0;
        let mut article_count = 0;
        let mut cross_reference_count = 0;

        for (child_id, data) in self.outgoing(reg_id) {
            if !data.has_type(EdgeType::Contains) {
                continue;
            }
            match self.nodes.get(child_id).map(Node::kind) {
                Some(NodeKind::Chapter) => {
                    chapter_count += 1;
                    for (grandchild_id, grandchild_data) in self.outgoing(child_id) {
                        if !grandchild_data.has_type(EdgeType::Contains) {
                            continue;
                        }
                        article_count += 1;
                        cross_reference_count += self
                            .outgoing(grandchild_id)
                            .filter(|(_, d)| d.has_type(EdgeType::References))
                            .count();
                    }
                }
                Some(NodeKind::Article) => {
                    article_count += 1;
                    cross_reference_count += self
                        .outgoing(child_id)
                        .filter(|(_, d)| d.has_type(EdgeType::References))
                        .count();
                }
                _ => {}
            }
        }

        (chapter_count, article_count, cross_reference_count)
    }

    fn count_amendment_edges(&self, reg_id: &str) -> usize {
        let outgoing = self
            .outgoing(reg_id)
            .flat_map(|(_, d)| d.edge_types.iter())
            .filter(|t| t.is_amendment_family())
            .count();
        let incoming = self
            .incoming(reg_id)
            .flat_map(|(_, d)| d.edge_types.iter())
            .filter(|t| t.is_amendment_family())
            .count();
        outgoing + incoming
    }

    fn summarize(&self, node: &Node) -> RegulationSummary {
        let (chapter_count, article_count, cross_reference_count) =
            self.count_structure(node.id());
        RegulationSummary {
            id: node.id().to_string(),
            node_type: node.kind(),
            number: node.regulation_number().unwrap_or(0),
            year: node.year().unwrap_or(0),
            title: node.title().unwrap_or_default().to_string(),
            about: node.about().unwrap_or_default().to_string(),
            status: node.status().unwrap_or_default().to_string(),
            chapter_count,
            article_count,
            amendment_count: self.count_amendment_edges(node.id()),
            cross_reference_count,
            indexed_chunk_count: 0,
        }
    }

    /// Regulation list with aggregate counts, filtered and sorted.
    pub fn get_regulation_list(&self, query: &RegulationListQuery) -> Vec<RegulationSummary> {
        let mut results: Vec<RegulationSummary> = self
            .nodes
            .values()
            .filter(|node| node.is_regulation())
            .filter(|node| query.node_type.map_or(true, |kind| node.kind() == kind))
            .filter(|node| {
                query
                    .status
                    .map_or(true, |status| node.status() == Some(status))
            })
            .filter(|node| query.year.map_or(true, |year| node.year() == Some(year)))
            .filter(|node| {
                query.search_query.as_deref().map_or(true, |sq| {
                    node.searchable_text()
                        .to_lowercase()
                        .contains(&sq.to_lowercase())
                })
            })
            .map(|node| self.summarize(node))
            .collect();

        match query.sort_by.as_deref() {
            Some("number") => results.sort_by_key(|r| r.number),
            Some("title") => results.sort_by(|a, b| {
                a.title.to_lowercase().cmp(&b.title.to_lowercase())
            }),
            Some("article_count") => results.sort_by_key(|r| r.article_count),
            _ => results.sort_by_key(|r| r.year),
        }
        if !query.ascending {
            results.reverse();
        }
        results
    }

    /// Full regulation detail with hierarchy and relationships.
    pub fn get_regulation_detail(&self, regulation_id: &str) -> Option<RegulationDetail> {
        let node = self.get_regulation(regulation_id)?;

        let mut chapters: Vec<ChapterDetail> = Vec::new();
        let mut cross_reference_count = 0;

        for (child_id, data) in self.outgoing(regulation_id) {
            if !data.has_type(EdgeType::Contains) {
                continue;
            }
            match self.nodes.get(child_id) {
                Some(Node::Chapter { id, number, title, .. }) => {
                    let mut articles = Vec::new();
                    for (grandchild_id, grandchild_data) in self.outgoing(child_id) {
                        if !grandchild_data.has_type(EdgeType::Contains) {
                            continue;
                        }
                        if let Some(Node::Article {
                            id,
                            number,
                            content_summary,
                            full_text,
                            parent_chapter_id,
                            ..
                        }) = self.nodes.get(grandchild_id)
                        {
                            let cross_refs: Vec<String> = self
                                .outgoing(grandchild_id)
                                .filter(|(_, d)| d.has_type(EdgeType::References))
                                .map(|(target, _)| target.to_string())
                                .collect();
                            cross_reference_count += cross_refs.len();
                            articles.push(ArticleDetail {
                                id: id.clone(),
                                number: number.clone(),
                                full_text: full_text.clone(),
                                content_summary: content_summary.clone(),
                                parent_chapter_id: parent_chapter_id.clone(),
                                cross_references: cross_refs,
                            });
                        }
                    }
                    chapters.push(ChapterDetail {
                        id: id.clone(),
                        number: number.clone(),
                        title: title.clone(),
                        articles,
                    });
                }
                Some(Node::Article { .. }) => {
                    cross_reference_count += self
                        .outgoing(child_id)
                        .filter(|(_, d)| d.has_type(EdgeType::References))
                        .count();
                }
                _ => {}
            }
        }

        chapters.sort_by_key(|c| chapter_sort_key(&c.number));

        let mut amendments = Vec::new();
        for (target, data) in self.outgoing(regulation_id) {
            for edge_type in data.edge_types.iter().filter(|t| t.is_amendment_family()) {
                let target_node = self.nodes.get(target);
                amendments.push(AmendmentInfo {
                    regulation_id: target.to_string(),
                    regulation_title: target_node
                        .and_then(Node::title)
                        .unwrap_or_default()
                        .to_string(),
                    year: target_node.and_then(Node::year).unwrap_or(0),
                    direction: "forward".to_string(),
                    edge_type: *edge_type,
                });
            }
        }
        for (source, data) in self.incoming(regulation_id) {
            for edge_type in data.edge_types.iter().filter(|t| t.is_amendment_family()) {
                let source_node = self.nodes.get(source);
                amendments.push(AmendmentInfo {
                    regulation_id: source.to_string(),
                    regulation_title: source_node
                        .and_then(Node::title)
                        .unwrap_or_default()
                        .to_string(),
                    year: source_node.and_then(Node::year).unwrap_or(0),
                    direction: "backward".to_string(),
                    edge_type: *edge_type,
                });
            }
        }

        let implementing_regulations: Vec<RegulationSummary> = self
            .incoming(regulation_id)
            .filter(|(_, d)| d.has_type(EdgeType::Implements))
            .filter_map(|(source, _)| self.nodes.get(source))
            .map(|n| self.summarize(n))
            .collect();

        let parent_law = self
            .outgoing(regulation_id)
            .find(|(_, d)| d.has_type(EdgeType::Implements))
            .and_then(|(target, _)| self.nodes.get(target))
            .map(|n| self.summarize(n));

        Some(RegulationDetail {
            node: node.clone(),
            chapters,
            amendments,
            implementing_regulations,
            parent_law,
            cross_reference_count,
            indexed_chunk_count: 0,
        })
    }

    /// Chronological amendment/revocation/supersession timeline.
    pub fn get_amendment_timeline(&self, regulation_id: &str) -> Vec<TimelineEntry> {
        let Some(reg) = self.nodes.get(regulation_id) else {
            return Vec::new();
        };

        let timeline_type =
            |t: EdgeType| t.is_amendment_family() || t == EdgeType::Supersedes;

        let mut entries = Vec::new();

        for (target, data) in self.outgoing(regulation_id) {
            for edge_type in data.edge_types.iter().filter(|t| timeline_type(**t)) {
                let target_node = self.nodes.get(target);
                entries.push(TimelineEntry {
                    regulation_id: regulation_id.to_string(),
                    regulation_title: reg.title().unwrap_or_default().to_string(),
                    year: reg.year().unwrap_or(0),
                    number: reg.regulation_number().unwrap_or(0),
                    edge_type: *edge_type,
                    direction: "forward".to_string(),
                    target_id: target.to_string(),
                    target_title: target_node
                        .and_then(Node::title)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }

        for (source, data) in self.incoming(regulation_id) {
            for edge_type in data.edge_types.iter().filter(|t| timeline_type(**t)) {
                let source_node = self.nodes.get(source);
                entries.push(TimelineEntry {
                    regulation_id: source.to_string(),
                    regulation_title: source_node
                        .and_then(Node::title)
                        .unwrap_or_default()
                        .to_string(),
                    year: source_node.and_then(Node::year).unwrap_or(0),
                    number: source_node.and_then(Node::regulation_number).unwrap_or(0),
                    edge_type: *edge_type,
                    direction: "backward".to_string(),
                    target_id: regulation_id.to_string(),
                    target_title: reg.title().unwrap_or_default().to_string(),
                });
            }
        }

        entries.sort_by_key(|e| e.year);
        entries
    }

    /// Both directions of article REFERENCES edges.
    pub fn get_article_cross_references(&self, article_id: &str) -> CrossReferences {
        let references_to = self
            .outgoing(article_id)
            .filter(|(_, d)| d.has_type(EdgeType::References))
            .filter_map(|(target, _)| self.nodes.get(target))
            .cloned()
            .collect();
        let referenced_by = self
            .incoming(article_id)
            .filter(|(_, d)| d.has_type(EdgeType::References))
            .filter_map(|(source, _)| self.nodes.get(source))
            .cloned()
            .collect();
        CrossReferences {
            references_to,
            referenced_by,
        }
    }
}

/// Chapter numbers are Roman numerals; unparseable ones sort last.
fn chapter_sort_key(number: &str) -> usize {
    const ROMAN: [(&str, usize); 20] = [
        ("I", 1),
        ("II", 2),
        ("III", 3),
        ("IV", 4),
        ("V", 5),
        ("VI", 6),
        ("VII", 7),
        ("VIII", 8),
        ("IX", 9),
        ("X", 10),
        ("XI", 11),
        ("XII", 12),
        ("XIII", 13),
        ("XIV", 14),
        ("XV", 15),
        ("XVI", 16),
        ("XVII", 17),
        ("XVIII", 18),
        ("XIX", 19),
        ("XX", 20),
    ];
    let upper = number.to_uppercase();
    ROMAN
        .iter()
        .find(|(r, _)| *r == upper)
        .map(|(_, v)| *v)
        .or_else(|| number.parse::<usize>().ok())
        .unwrap_or(999)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LawStatus;

    fn law(id: &str, number: i64, year: i64, title: &str) -> Node {
        Node::Law {
            id: id.to_string(),
            number,
            year,
            title: title.to_string(),
            about: title.to_string(),
            status: LawStatus::Active,
            enactment_date: None,
        }
    }

    fn sample_graph() -> LegalKnowledgeGraph {
        let mut kg = LegalKnowledgeGraph::new();
        kg.add_regulation(law("uu_11_2020", 11, 2020, "UU Cipta Kerja"));
        kg.add_regulation(law("uu_13_2003", 13, 2003, "UU Ketenagakerjaan"));
        kg.add_regulation(Node::GovernmentRegulation {
            id: "pp_35_2021".to_string(),
            number: 35,
            year: 2021,
            title: "PP PKWT dan PHK".to_string(),
            about: "PKWT, alih daya, waktu kerja, dan PHK".to_string(),
            parent_law_id: Some("uu_11_2020".to_string()),
        });
        kg.add_edge("uu_11_2020", "uu_13_2003", EdgeType::Amends, None);
        kg.add_edge("pp_35_2021", "uu_11_2020", EdgeType::Implements, None);
        kg
    }

    #[test]
    fn test_amendment_with_reverse_edges() {
        let mut kg = sample_graph();
        let added = kg.ensure_reverse_edges();
        assert_eq!(added, 2); // AMENDED_BY + IMPLEMENTED_BY

        // uu_11_2020 amends uu_13_2003 → both see each other
        let amendments = kg.get_amendments("uu_13_2003");
        assert_eq!(amendments.len(), 1);
        assert_eq!(amendments[0].id(), "uu_11_2020");

        let amendments = kg.get_amendments("uu_11_2020");
        assert_eq!(amendments.len(), 1);
        assert_eq!(amendments[0].id(), "uu_13_2003");

        let reverse = kg
            .edge_data("uu_13_2003", "uu_11_2020")
            .expect("reverse edge");
        assert!(reverse.has_type(EdgeType::AmendedBy));
    }

    #[test]
    fn test_ensure_reverse_edges_idempotent() {
        let mut kg = sample_graph();
        assert_eq!(kg.ensure_reverse_edges(), 2);
        assert_eq!(kg.ensure_reverse_edges(), 0);
    }

    #[test]
    fn test_multi_type_edge_merge() {
        let mut kg = sample_graph();
        kg.add_edge(
            "pp_35_2021",
            "uu_11_2020",
            EdgeType::References,
            Some(serde_json::json!({"pasal": "81"})),
        );

        let data = kg.edge_data("pp_35_2021", "uu_11_2020").unwrap();
        assert!(data.has_type(EdgeType::Implements));
        assert!(data.has_type(EdgeType::References));
        assert!(data.metadata_map.contains_key("REFERENCES"));
        // Still one edge pair
        assert_eq!(kg.edge_count(), 2);
    }

    #[test]
    fn test_implementing_regulations() {
        let kg = sample_graph();
        let impls = kg.get_implementing_regulations("uu_11_2020");
        assert_eq!(impls.len(), 1);
        assert_eq!(impls[0].id(), "pp_35_2021");
    }

    #[test]
    fn test_related_regulations_bfs() {
        let mut kg = sample_graph();
        kg.ensure_reverse_edges();

        let related =
            kg.get_related_regulations("uu_13_2003", 2, Duration::from_millis(500));
        let ids: Vec<&str> = related.iter().map(|r| r.node.id()).collect();
        // 1 hop: uu_11_2020 (reverse AMENDS); 2 hops: pp_35_2021
        assert!(ids.contains(&"uu_11_2020"));
        assert!(ids.contains(&"pp_35_2021"));

        let uu11 = related.iter().find(|r| r.node.id() == "uu_11_2020").unwrap();
        assert_eq!(uu11.hop, 1);
        assert!(uu11.path[0].0.starts_with('~'));
    }

    #[test]
    fn test_related_regulations_hop_limit() {
        let mut kg = sample_graph();
        kg.ensure_reverse_edges();
        let related =
            kg.get_related_regulations("uu_13_2003", 1, Duration::from_millis(500));
        let ids: Vec<&str> = related.iter().map(|r| r.node.id()).collect();
        assert!(ids.contains(&"uu_11_2020"));
        assert!(!ids.contains(&"pp_35_2021"));
    }

    #[test]
    fn test_related_regulations_missing_node() {
        let kg = sample_graph();
        assert!(kg
            .get_related_regulations("uu_99_1999", 2, Duration::from_millis(100))
            .is_empty());
    }

    #[test]
    fn test_hierarchy_and_counts() {
        let mut kg = sample_graph();
        kg.add_chapter(Node::Chapter {
            id: "uu_13_2003_bab_1".to_string(),
            number: "I".to_string(),
            title: Some("Ketentuan Umum".to_string()),
            parent_regulation_id: "uu_13_2003".to_string(),
        });
        kg.add_article(Node::Article {
            id: "uu_13_2003_pasal_1".to_string(),
            number: "1".to_string(),
            content_summary: None,
            full_text: "Dalam undang-undang ini yang dimaksud dengan...".to_string(),
            parent_chapter_id: Some("uu_13_2003_bab_1".to_string()),
            parent_regulation_id: "uu_13_2003".to_string(),
        });

        let hierarchy = kg.get_hierarchy("uu_13_2003").unwrap();
        assert_eq!(hierarchy.children.len(), 1);
        assert_eq!(hierarchy.children[0].children.len(), 1);

        let detail = kg.get_regulation_detail("uu_13_2003").unwrap();
        assert_eq!(detail.chapters.len(), 1);
        assert_eq!(detail.chapters[0].articles.len(), 1);
    }

    #[test]
    fn test_regulation_list_filters_and_sort() {
        let kg = sample_graph();
        let all = kg.get_regulation_list(&RegulationListQuery::default());
        assert_eq!(all.len(), 3);
        // Default sort: year descending
        assert_eq!(all[0].id, "pp_35_2021");

        let laws_only = kg.get_regulation_list(&RegulationListQuery {
            node_type: Some(NodeKind::Law),
            ..Default::default()
        });
        assert_eq!(laws_only.len(), 2);

        let searched = kg.get_regulation_list(&RegulationListQuery {
            search_query: Some("cipta".to_string()),
            ..Default::default()
        });
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].id, "uu_11_2020");
    }

    #[test]
    fn test_amendment_timeline() {
        let mut kg = sample_graph();
        kg.ensure_reverse_edges();
        let timeline = kg.get_amendment_timeline("uu_13_2003");
        assert!(!timeline.is_empty());
        // Chronological order
        for pair in timeline.windows(2) {
            assert!(pair[0].year <= pair[1].year);
        }
    }

    #[test]
    fn test_stats_counts_multi_types() {
        let mut kg = sample_graph();
        kg.add_edge("pp_35_2021", "uu_11_2020", EdgeType::References, None);
        let stats = kg.get_stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.edges_by_type.get("IMPLEMENTS"), Some(&1));
        assert_eq!(stats.edges_by_type.get("REFERENCES"), Some(&1));
    }

    #[test]
    fn test_search_nodes() {
        let kg = sample_graph();
        let hits = kg.search_nodes("ketenagakerjaan", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "uu_13_2003");

        let none = kg.search_nodes("ketenagakerjaan", Some(NodeKind::GovernmentRegulation));
        assert!(none.is_empty());
    }

    #[test]
    fn test_chapter_sort_key() {
        assert_eq!(chapter_sort_key("I"), 1);
        assert_eq!(chapter_sort_key("XIV"), 14);
        assert_eq!(chapter_sort_key("3"), 3);
        assert_eq!(chapter_sort_key("???"), 999);
    }
}
