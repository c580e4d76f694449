//! Visualization export.
//!
//! Builds a bounded subgraph (seed + radius, or a global top-degree slice)
//! and renders it in one of three interchangeable node/edge formats. Node
//! color is a stable per-type palette assignment; node size scales with
//! degree, so hubs read as hubs in every renderer.

use super::models::{VizEdge, VizFormat, VizNode, VizOptions};
use crate::context::GraphContext;
use crate::graph::{EntityGraph, GraphExtractor};
use anyhow::Result;
use petgraph::Direction;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Categorical palette; types map onto it by stable hash.
const PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

const MIN_NODE_SIZE: f64 = 10.0;
const MAX_NODE_SIZE: f64 = 40.0;

pub struct VizExporter {
    ctx: Arc<GraphContext>,
}

impl VizExporter {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Export a bounded subgraph in the requested format.
    pub async fn export(&self, format: VizFormat, options: &VizOptions) -> Result<Value> {
        let extractor = GraphExtractor::new(self.ctx.store.clone());
        let graph = match &options.seed_entity {
            Some(seed) => extractor.extract_neighborhood(seed, options.depth).await?,
            None => extractor.extract_current_graph().await?,
        };

        let (nodes, edges) = shape_bounded(&graph, options.max_nodes);
        Ok(render(format, &nodes, &edges))
    }
}

/// Reduce a graph to its `max_nodes` highest-degree nodes (ties by id) and
/// the edges among them, shaped for export.
fn shape_bounded(graph: &EntityGraph, max_nodes: usize) -> (Vec<VizNode>, Vec<VizEdge>) {
    let g = &graph.graph;

    let mut by_degree: Vec<(petgraph::graph::NodeIndex, usize)> = g
        .node_indices()
        .map(|idx| {
            let degree = g.neighbors_directed(idx, Direction::Outgoing).count()
                + g.neighbors_directed(idx, Direction::Incoming).count();
            (idx, degree)
        })
        .collect();
    by_degree.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| g[a.0].id.cmp(&g[b.0].id)));
    by_degree.truncate(max_nodes);

    let kept: HashSet<_> = by_degree.iter().map(|(idx, _)| *idx).collect();
    let degrees: HashMap<_, usize> = by_degree.iter().copied().collect();
    let max_degree = degrees.values().copied().max().unwrap_or(0).max(1);

    let mut nodes: Vec<VizNode> = by_degree
        .iter()
        .map(|(idx, degree)| {
            let node = &g[*idx];
            VizNode {
                id: node.id.clone(),
                label: node.name.clone(),
                node_type: node.entity_type.clone(),
                color: color_for(&node.entity_type),
                size: MIN_NODE_SIZE
                    + (MAX_NODE_SIZE - MIN_NODE_SIZE) * (*degree as f64 / max_degree as f64),
            }
        })
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<VizEdge> = g
        .edge_indices()
        .filter_map(|edge| {
            let (s, t) = g.edge_endpoints(edge)?;
            if !kept.contains(&s) || !kept.contains(&t) {
                return None;
            }
            let weight = g[edge].weight;
            Some(VizEdge {
                source: g[s].id.clone(),
                target: g[t].id.clone(),
                edge_type: g[edge].rel_type.clone(),
                weight,
            })
        })
        .collect();
    edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

    (nodes, edges)
}

/// Stable per-type palette assignment.
fn color_for(entity_type: &str) -> String {
    let mut hash: u64 = 1469598103934665603; // FNV offset basis
    for byte in entity_type.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    PALETTE[(hash % PALETTE.len() as u64) as usize].to_string()
}

fn render(format: VizFormat, nodes: &[VizNode], edges: &[VizEdge]) -> Value {
    match format {
        VizFormat::D3Force => json!({
            "nodes": nodes,
            "links": edges
                .iter()
                .map(|e| json!({
                    "source": e.source,
                    "target": e.target,
                    "type": e.edge_type,
                    "value": e.weight,
                }))
                .collect::<Vec<_>>(),
        }),
        VizFormat::CytoscapeJs => json!({
            "elements": {
                "nodes": nodes
                    .iter()
                    .map(|n| json!({ "data": n }))
                    .collect::<Vec<_>>(),
                "edges": edges
                    .iter()
                    .map(|e| json!({
                        "data": {
                            "id": format!("{}-{}", e.source, e.target),
                            "source": e.source,
                            "target": e.target,
                            "type": e.edge_type,
                        }
                    }))
                    .collect::<Vec<_>>(),
            }
        }),
        VizFormat::VisNetwork => json!({
            "nodes": nodes
                .iter()
                .map(|n| json!({
                    "id": n.id,
                    "label": n.label,
                    "type": n.node_type,
                    "color": n.color,
                    "size": n.size,
                }))
                .collect::<Vec<_>>(),
            "edges": edges
                .iter()
                .map(|e| json!({
                    "from": e.source,
                    "to": e.target,
                    "type": e.edge_type,
                }))
                .collect::<Vec<_>>(),
        }),
    }
}
