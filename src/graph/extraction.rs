//! Store → petgraph extraction.
//!
//! Converts the current graph (or a bounded subgraph) into an in-memory
//! [`EntityGraph`] suitable for the in-process algorithm backends. Uses the
//! `GraphStore` trait, not raw Cypher, and performs at most two bulk
//! round-trips per extraction: one for nodes, one for edges.

use crate::store::GraphStore;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

use super::models::{EntityGraph, GraphEdge, GraphNode};

/// Extracts in-memory graphs from the store.
pub struct GraphExtractor {
    store: Arc<dyn GraphStore>,
}

impl GraphExtractor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Extract all current entities and the relationships between them.
    pub async fn extract_current_graph(&self) -> Result<EntityGraph> {
        let entities = self.store.list_current_entities(None).await?;
        let mut graph = EntityGraph::with_capacity(entities.len(), entities.len() * 2);

        for entity in &entities {
            graph.add_node(GraphNode {
                id: entity.id.clone(),
                entity_type: entity.entity_type.clone(),
                name: entity.display_name().to_string(),
            });
        }

        let relationships = self.store.list_current_relationships().await?;
        for rel in &relationships {
            // Only add edges where both nodes exist (robustness against
            // concurrent writes between the two bulk queries).
            if graph.get_index(&rel.source).is_some() && graph.get_index(&rel.target).is_some() {
                graph.add_edge(
                    &rel.source,
                    &rel.target,
                    GraphEdge {
                        rel_type: rel.rel_type.clone(),
                        weight: rel.effective_weight(),
                    },
                );
            }
        }

        Ok(graph)
    }

    /// Extract the subgraph induced by a seed entity and everything within
    /// `depth` hops of it.
    pub async fn extract_neighborhood(&self, entity_id: &str, depth: u32) -> Result<EntityGraph> {
        let mut keep: HashSet<String> = self
            .store
            .neighbor_ids(entity_id, depth)
            .await?
            .into_iter()
            .collect();
        keep.insert(entity_id.to_string());

        let full = self.extract_current_graph().await?;
        let mut graph = EntityGraph::with_capacity(keep.len(), keep.len() * 2);

        for idx in full.graph.node_indices() {
            let node = &full.graph[idx];
            if keep.contains(&node.id) {
                graph.add_node(node.clone());
            }
        }
        for edge in full.graph.edge_indices() {
            if let Some((a, b)) = full.graph.edge_endpoints(edge) {
                let (a_id, b_id) = (full.id_of(a), full.id_of(b));
                if keep.contains(a_id) && keep.contains(b_id) {
                    graph.add_edge(a_id, b_id, full.graph[edge].clone());
                }
            }
        }

        Ok(graph)
    }
}
