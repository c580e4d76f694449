//! In-memory graph representation for the in-process algorithm backends.
//!
//! [`EntityGraph`] wraps a `petgraph::DiGraph` with a bidirectional
//! entity-id ↔ `NodeIndex` mapping. It is the intermediate representation
//! between store extraction and algorithm computation: the community and
//! analytics fallback backends both operate on it.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// A node in the extracted graph: just enough of the entity to compute on.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub entity_type: String,
    pub name: String,
}

/// An edge in the extracted graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub rel_type: String,
    pub weight: f64,
}

impl Default for GraphEdge {
    fn default() -> Self {
        Self {
            rel_type: "RELATED_TO".to_string(),
            weight: 1.0,
        }
    }
}

/// Wrapper around `petgraph::DiGraph` with O(1) id lookups.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    pub graph: DiGraph<GraphNode, GraphEdge>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            id_to_index: HashMap::with_capacity(nodes),
        }
    }

    /// Add a node; idempotent on id, returning the existing index.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// Add an edge between two ids; `None` if either endpoint is unknown.
    pub fn add_edge(
        &mut self,
        from_id: &str,
        to_id: &str,
        edge: GraphEdge,
    ) -> Option<petgraph::graph::EdgeIndex> {
        let from = *self.id_to_index.get(from_id)?;
        let to = *self.id_to_index.get(to_id)?;
        Some(self.graph.add_edge(from, to, edge))
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.graph.node_weight(*self.id_to_index.get(id)?)
    }

    pub fn get_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    /// Id of the node at `idx`.
    pub fn id_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].id
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
