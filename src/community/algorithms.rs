//! In-process community detection algorithms.
//!
//! Operates on the undirected view of an [`EntityGraph`]:
//!
//! - **Louvain** — greedy modularity optimization with a resolution
//!   parameter (higher resolution favors more, smaller communities).
//! - **Label propagation** — each node adopts its neighborhood's dominant
//!   label until stable.
//!
//! Both iterate nodes in insertion order with no randomness, so repeated
//! runs on the same graph snapshot produce identical partitions.
//!
//! [`partition_quality`] computes Newman modularity (overall and
//! per-community contributions) from a plain edge list, so the same math
//! normalizes partitions regardless of which backend produced them.

use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::graph::models::EntityGraph;

const MAX_SWEEPS: usize = 100;

/// Node-id → community-id assignment.
pub type Membership = HashMap<String, u32>;

/// Detect communities with the Louvain method.
///
/// Works on the undirected weighted view of the graph and maximizes
/// modularity through greedy local moves. Returned community ids are
/// renumbered to be contiguous.
pub fn louvain(graph: &EntityGraph, resolution: f64) -> Membership {
    let g = &graph.graph;
    let n = g.node_count();
    if n == 0 {
        return Membership::new();
    }

    // Undirected adjacency lists plus weighted degrees.
    let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut strengths: Vec<f64> = vec![0.0; n];
    for edge in g.edge_references() {
        let s = edge.source().index();
        let t = edge.target().index();
        let w = edge.weight().weight;
        adj[s].push((t, w));
        adj[t].push((s, w));
        strengths[s] += w;
        strengths[t] += w;
    }

    let total_weight: f64 = strengths.iter().sum::<f64>() / 2.0;
    if total_weight == 0.0 {
        // No edges: every node is its own community.
        return g
            .node_indices()
            .enumerate()
            .map(|(i, idx)| (g[idx].id.clone(), i as u32))
            .collect();
    }

    let mut community: Vec<u32> = (0..n as u32).collect();
    let mut comm_strength: HashMap<u32, f64> = HashMap::with_capacity(n);
    for (i, &k) in strengths.iter().enumerate() {
        *comm_strength.entry(community[i]).or_default() += k;
    }

    let m2 = 2.0 * total_weight;
    let mut improved = true;
    let mut sweeps = 0;

    while improved && sweeps < MAX_SWEEPS {
        improved = false;
        sweeps += 1;

        for node in 0..n {
            let current = community[node];

            // Weight from this node to each neighboring community.
            let mut weights_to: HashMap<u32, f64> = HashMap::new();
            for &(neighbor, w) in &adj[node] {
                *weights_to.entry(community[neighbor]).or_default() += w;
            }

            let ki = strengths[node];
            let w_current = weights_to.get(&current).copied().unwrap_or(0.0);
            let sigma_current = comm_strength.get(&current).copied().unwrap_or(0.0);
            let remove_cost = w_current / m2 - resolution * ki * (sigma_current - ki) / (m2 * m2);

            let mut best = current;
            let mut best_gain = 0.0;
            for (&target, &w_target) in &weights_to {
                if target == current {
                    continue;
                }
                let sigma_target = comm_strength.get(&target).copied().unwrap_or(0.0);
                let insert_gain = w_target / m2 - resolution * ki * sigma_target / (m2 * m2);
                let gain = insert_gain - remove_cost;
                if gain > best_gain {
                    best_gain = gain;
                    best = target;
                }
            }

            if best != current {
                *comm_strength.entry(current).or_default() -= ki;
                *comm_strength.entry(best).or_default() += ki;
                community[node] = best;
                improved = true;
            }
        }
    }

    renumber(graph, &community)
}

/// Detect communities by synchronous label propagation.
///
/// Each sweep, every node (in insertion order) adopts the label carrying the
/// most neighbor weight; ties break toward the smaller label for
/// determinism. Stops when a full sweep changes nothing.
pub fn label_propagation(graph: &EntityGraph) -> Membership {
    let g = &graph.graph;
    let n = g.node_count();
    if n == 0 {
        return Membership::new();
    }

    let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for edge in g.edge_references() {
        let s = edge.source().index();
        let t = edge.target().index();
        let w = edge.weight().weight;
        adj[s].push((t, w));
        adj[t].push((s, w));
    }

    let mut labels: Vec<u32> = (0..n as u32).collect();
    for _ in 0..MAX_SWEEPS {
        let mut changed = false;
        for node in 0..n {
            if adj[node].is_empty() {
                continue;
            }
            let mut counts: HashMap<u32, f64> = HashMap::new();
            for &(neighbor, w) in &adj[node] {
                *counts.entry(labels[neighbor]).or_default() += w;
            }
            // Dominant label; ties toward the smaller id.
            let mut best = labels[node];
            let mut best_weight = f64::MIN;
            let mut candidates: Vec<(u32, f64)> = counts.into_iter().collect();
            candidates.sort_by_key(|(label, _)| *label);
            for (label, weight) in candidates {
                if weight > best_weight {
                    best_weight = weight;
                    best = label;
                }
            }
            if best != labels[node] {
                labels[node] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    renumber(graph, &labels)
}

/// Renumber raw community ids contiguously (0, 1, 2, …) in first-seen order
/// and key by entity id.
fn renumber(graph: &EntityGraph, assignment: &[u32]) -> Membership {
    let g = &graph.graph;
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut next = 0u32;
    let mut out = Membership::with_capacity(assignment.len());
    for idx in g.node_indices() {
        let raw = assignment[idx.index()];
        let id = *remap.entry(raw).or_insert_with(|| {
            let id = next;
            next += 1;
            id
        });
        out.insert(g[idx].id.clone(), id);
    }
    out
}

/// Newman modularity of a partition, computed from a plain edge list.
///
/// Returns `(overall Q, per-community contribution)`. Edges are treated as
/// undirected and counted once; endpoints missing from the membership are
/// skipped.
pub fn partition_quality(
    edges: &[(String, String, f64)],
    membership: &Membership,
) -> (f64, HashMap<u32, f64>) {
    let mut total_weight = 0.0;
    let mut strengths: HashMap<&str, f64> = HashMap::new();
    for (a, b, w) in edges {
        if !membership.contains_key(a) || !membership.contains_key(b) {
            continue;
        }
        total_weight += w;
        *strengths.entry(a.as_str()).or_default() += w;
        *strengths.entry(b.as_str()).or_default() += w;
    }
    if total_weight == 0.0 {
        return (0.0, HashMap::new());
    }

    let m = total_weight;
    let m2 = 2.0 * total_weight;

    let mut intra: HashMap<u32, f64> = HashMap::new();
    for (a, b, w) in edges {
        let (Some(&ca), Some(&cb)) = (membership.get(a), membership.get(b)) else {
            continue;
        };
        if ca == cb {
            *intra.entry(ca).or_default() += w;
        }
    }

    let mut community_strength: HashMap<u32, f64> = HashMap::new();
    for (node, strength) in &strengths {
        if let Some(&c) = membership.get(*node) {
            *community_strength.entry(c).or_default() += strength;
        }
    }

    let mut contributions: HashMap<u32, f64> = HashMap::new();
    let mut overall = 0.0;
    for (&c, &sigma) in &community_strength {
        let internal = intra.get(&c).copied().unwrap_or(0.0);
        let q = internal / m - (sigma / m2) * (sigma / m2);
        contributions.insert(c, q);
        overall += q;
    }

    (overall, contributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::{GraphEdge, GraphNode};

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            entity_type: "Entity".to_string(),
            name: id.to_string(),
        }
    }

    /// Two cliques of `size`, densely interconnected, one bridge edge.
    fn two_cliques(size: usize) -> EntityGraph {
        let mut g = EntityGraph::new();
        let a: Vec<String> = (0..size).map(|i| format!("a_{i}")).collect();
        let b: Vec<String> = (0..size).map(|i| format!("b_{i}")).collect();
        for id in a.iter().chain(b.iter()) {
            g.add_node(node(id));
        }
        for cluster in [&a, &b] {
            for i in 0..size {
                for j in (i + 1)..size {
                    g.add_edge(&cluster[i], &cluster[j], GraphEdge::default());
                }
            }
        }
        g.add_edge(&a[0], &b[0], GraphEdge::default());
        g
    }

    fn edge_list(g: &EntityGraph) -> Vec<(String, String, f64)> {
        g.graph
            .edge_indices()
            .filter_map(|e| {
                let (s, t) = g.graph.edge_endpoints(e)?;
                Some((
                    g.id_of(s).to_string(),
                    g.id_of(t).to_string(),
                    g.graph[e].weight,
                ))
            })
            .collect()
    }

    #[test]
    fn test_louvain_two_cliques() {
        let g = two_cliques(5);
        let membership = louvain(&g, 1.0);

        assert_eq!(membership.len(), 10);
        let a_comm = membership["a_0"];
        let b_comm = membership["b_0"];
        assert_ne!(a_comm, b_comm);
        for i in 1..5 {
            assert_eq!(membership[&format!("a_{i}")], a_comm);
            assert_eq!(membership[&format!("b_{i}")], b_comm);
        }

        let (q, contributions) = partition_quality(&edge_list(&g), &membership);
        assert!(q > 0.3, "two-clique modularity should exceed 0.3, got {q}");
        assert_eq!(contributions.len(), 2);
    }

    #[test]
    fn test_louvain_deterministic_across_runs() {
        let g = two_cliques(4);
        let first = louvain(&g, 1.0);
        let second = louvain(&g, 1.0);
        assert_eq!(first, second);

        let (q1, _) = partition_quality(&edge_list(&g), &first);
        let (q2, _) = partition_quality(&edge_list(&g), &second);
        assert!((q1 - q2).abs() < 1e-9);
    }

    #[test]
    fn test_louvain_no_edges_singleton_communities() {
        let mut g = EntityGraph::new();
        g.add_node(node("x"));
        g.add_node(node("y"));
        let membership = louvain(&g, 1.0);
        assert_eq!(membership.len(), 2);
        assert_ne!(membership["x"], membership["y"]);
    }

    #[test]
    fn test_louvain_higher_resolution_never_coarser() {
        let g = two_cliques(4);
        let coarse: std::collections::HashSet<u32> =
            louvain(&g, 0.5).into_values().collect();
        let fine: std::collections::HashSet<u32> = louvain(&g, 4.0).into_values().collect();
        assert!(fine.len() >= coarse.len());
    }

    #[test]
    fn test_label_propagation_two_cliques() {
        let g = two_cliques(5);
        let membership = label_propagation(&g);

        let a_comm = membership["a_1"];
        let b_comm = membership["b_1"];
        for i in 1..5 {
            assert_eq!(membership[&format!("a_{i}")], a_comm);
            assert_eq!(membership[&format!("b_{i}")], b_comm);
        }
    }

    #[test]
    fn test_label_propagation_deterministic() {
        let g = two_cliques(4);
        assert_eq!(label_propagation(&g), label_propagation(&g));
    }

    #[test]
    fn test_partition_quality_empty() {
        let (q, contributions) = partition_quality(&[], &Membership::new());
        assert!((q - 0.0).abs() < f64::EPSILON);
        assert!(contributions.is_empty());
    }

    #[test]
    fn test_partition_quality_single_community_is_zero() {
        // Everything in one community: Q = m/m - (2m/2m)^2 = 0.
        let edges = vec![
            ("a".to_string(), "b".to_string(), 1.0),
            ("b".to_string(), "c".to_string(), 1.0),
        ];
        let membership: Membership =
            [("a", 0u32), ("b", 0), ("c", 0)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let (q, _) = partition_quality(&edges, &membership);
        assert!(q.abs() < 1e-9);
    }

    #[test]
    fn test_empty_graph() {
        let g = EntityGraph::new();
        assert!(louvain(&g, 1.0).is_empty());
        assert!(label_propagation(&g).is_empty());
    }
}
