//! In-process analytics algorithms.
//!
//! Centrality and PageRank on an [`EntityGraph`]:
//!
//! - **Degree** — undirected edge count per node
//! - **Closeness** — BFS distances with Wasserman–Faust normalization for
//!   disconnected graphs
//! - **Eigenvector** — power iteration on the undirected adjacency
//! - **Betweenness** — `rustworkx_core::centrality::betweenness_centrality`
//! - **PageRank** — power iteration with damping, tolerance-based
//!   convergence, and dangling-node redistribution
//!
//! Results are keyed by entity id.

use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

use super::models::PageRankConfig;
use crate::graph::models::EntityGraph;

/// Undirected degree per node.
pub fn degree_centrality(graph: &EntityGraph) -> HashMap<String, f64> {
    let g = &graph.graph;
    g.node_indices()
        .map(|idx| {
            let degree = g.neighbors_directed(idx, Direction::Outgoing).count()
                + g.neighbors_directed(idx, Direction::Incoming).count();
            (g[idx].id.clone(), degree as f64)
        })
        .collect()
}

/// Closeness centrality on the undirected view.
///
/// For node `u` reaching `r` nodes with total distance `d`:
/// `closeness = ((r - 1) / d) * ((r - 1) / (n - 1))` — the second factor
/// scales scores down for nodes that only reach a small component.
pub fn closeness_centrality(graph: &EntityGraph) -> HashMap<String, f64> {
    let g = &graph.graph;
    let n = g.node_count();
    let mut result = HashMap::with_capacity(n);
    if n == 0 {
        return result;
    }

    for start in g.node_indices() {
        // BFS over the undirected view.
        let mut dist: HashMap<usize, usize> = HashMap::new();
        dist.insert(start.index(), 0);
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let d = dist[&current.index()];
            for neighbor in g
                .neighbors_directed(current, Direction::Outgoing)
                .chain(g.neighbors_directed(current, Direction::Incoming))
            {
                if !dist.contains_key(&neighbor.index()) {
                    dist.insert(neighbor.index(), d + 1);
                    queue.push_back(neighbor);
                }
            }
        }

        let reachable = dist.len();
        let total: usize = dist.values().sum();
        let score = if reachable > 1 && total > 0 {
            let r = (reachable - 1) as f64;
            (r / total as f64) * (r / (n - 1) as f64)
        } else {
            0.0
        };
        result.insert(g[start].id.clone(), score);
    }
    result
}

/// Eigenvector centrality via power iteration on the undirected adjacency.
/// Scores are L2-normalized.
pub fn eigenvector_centrality(graph: &EntityGraph) -> HashMap<String, f64> {
    let g = &graph.graph;
    let n = g.node_count();
    if n == 0 {
        return HashMap::new();
    }

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in g.edge_indices() {
        if let Some((s, t)) = g.edge_endpoints(edge) {
            adj[s.index()].push(t.index());
            adj[t.index()].push(s.index());
        }
    }

    let mut scores = vec![1.0 / (n as f64).sqrt(); n];
    for _ in 0..100 {
        let mut next = vec![0.0; n];
        for (i, neighbors) in adj.iter().enumerate() {
            for &j in neighbors {
                next[j] += scores[i];
            }
        }
        let norm: f64 = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm == 0.0 {
            // No edges anywhere: centrality is undefined, report zeros.
            return g.node_indices().map(|idx| (g[idx].id.clone(), 0.0)).collect();
        }
        for x in next.iter_mut() {
            *x /= norm;
        }
        let diff: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        scores = next;
        if diff < 1e-6 {
            break;
        }
    }

    g.node_indices()
        .map(|idx| (g[idx].id.clone(), scores[idx.index()]))
        .collect()
}

/// Betweenness centrality (normalized), via rustworkx-core.
pub fn betweenness_centrality(graph: &EntityGraph) -> HashMap<String, f64> {
    let g = &graph.graph;
    if g.node_count() == 0 {
        return HashMap::new();
    }

    let scores = rustworkx_core::centrality::betweenness_centrality(
        g, false, // include_endpoints
        true,  // normalized
        200,   // parallel_threshold
    );

    g.node_indices()
        .map(|idx| {
            (
                g[idx].id.clone(),
                scores[idx.index()].unwrap_or(0.0),
            )
        })
        .collect()
}

/// PageRank by power iteration. Scores normalized to sum ≈ 1.0.
pub fn pagerank(graph: &EntityGraph, config: &PageRankConfig) -> HashMap<String, f64> {
    let g = &graph.graph;
    let n = g.node_count();
    if n == 0 {
        return HashMap::new();
    }

    let damping = config.damping;
    let mut scores = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];

    let out_degrees: Vec<usize> = g
        .node_indices()
        .map(|idx| g.neighbors_directed(idx, Direction::Outgoing).count())
        .collect();

    for _ in 0..config.max_iterations {
        for s in next.iter_mut() {
            *s = (1.0 - damping) / n as f64;
        }

        for idx in g.node_indices() {
            let i = idx.index();
            if out_degrees[i] > 0 {
                let contribution = damping * scores[i] / out_degrees[i] as f64;
                for neighbor in g.neighbors_directed(idx, Direction::Outgoing) {
                    next[neighbor.index()] += contribution;
                }
            } else {
                // Dangling node: spread its mass evenly.
                let contribution = damping * scores[i] / n as f64;
                for s in next.iter_mut() {
                    *s += contribution;
                }
            }
        }

        let diff: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut scores, &mut next);
        if diff < config.tolerance {
            break;
        }
    }

    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        for s in scores.iter_mut() {
            *s /= total;
        }
    }

    g.node_indices()
        .map(|idx| (g[idx].id.clone(), scores[idx.index()]))
        .collect()
}

/// Local neighborhood density per node: the fraction of possible edges
/// among a node's (undirected) neighbors that actually exist. Nodes with
/// fewer than two neighbors have undefined density and are skipped.
pub fn neighborhood_density(graph: &EntityGraph) -> HashMap<String, (usize, f64)> {
    let g = &graph.graph;
    let mut result = HashMap::new();

    for idx in g.node_indices() {
        let mut neighbors: Vec<_> = Vec::new();
        let mut seen = HashSet::new();
        for n in g
            .neighbors_directed(idx, Direction::Outgoing)
            .chain(g.neighbors_directed(idx, Direction::Incoming))
        {
            if n != idx && seen.insert(n) {
                neighbors.push(n);
            }
        }

        let k = neighbors.len();
        if k < 2 {
            continue;
        }

        let mut connected = 0usize;
        for i in 0..k {
            for j in (i + 1)..k {
                if g.contains_edge(neighbors[i], neighbors[j])
                    || g.contains_edge(neighbors[j], neighbors[i])
                {
                    connected += 1;
                }
            }
        }
        let density = connected as f64 / (k * (k - 1) / 2) as f64;
        result.insert(g[idx].id.clone(), (k, density));
    }
    result
}
