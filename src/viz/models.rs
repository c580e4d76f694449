//! Visualization export data models.

use serde::{Deserialize, Serialize};

/// Target format for graph export. All three carry the same node payload
/// (`{id, label, type, color, size}`) and differ only in field naming and
/// nesting conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VizFormat {
    /// `{nodes, links}` with `source`/`target` (d3-force).
    D3Force,
    /// `{elements: {nodes, edges}}` with `data` wrappers (Cytoscape.js).
    CytoscapeJs,
    /// `{nodes, edges}` with `from`/`to` (vis-network).
    VisNetwork,
}

/// Bounds and focus for an export.
#[derive(Debug, Clone)]
pub struct VizOptions {
    /// Hard cap on exported nodes; highest-degree nodes win.
    pub max_nodes: usize,
    /// Traversal depth around the seed entity.
    pub depth: u32,
    /// Center the export on this entity; `None` exports a global slice.
    pub seed_entity: Option<String>,
}

impl Default for VizOptions {
    fn default() -> Self {
        Self {
            max_nodes: 100,
            depth: 2,
            seed_entity: None,
        }
    }
}

/// One exported node, before format-specific shaping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VizNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub color: String,
    pub size: f64,
}

/// One exported edge, before format-specific shaping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VizEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let options = VizOptions::default();
        assert_eq!(options.max_nodes, 100);
        assert_eq!(options.depth, 2);
        assert!(options.seed_entity.is_none());
    }

    #[test]
    fn test_node_serializes_type_field() {
        let node = VizNode {
            id: "e1".into(),
            label: "Ada".into(),
            node_type: "Person".into(),
            color: "#4e79a7".into(),
            size: 12.0,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "Person");
    }
}
