//! Related-entity recommendations.
//!
//! Two ranking methods over the current graph:
//!
//! - **Neighborhood overlap** ("collaborative"): candidates two hops out,
//!   scored by Jaccard similarity of 1-hop neighborhoods. Entities already
//!   adjacent to the seed are not recommended — they are known relations.
//! - **Shared community**: members of the seed's community from a prior
//!   detection run, ranked by their connectivity.
//!
//! All rankings break score ties by entity id ascending, so results are
//! deterministic.

use super::models::{Recommendation, RecommendationMethod};
use crate::community::DetectionResult;
use crate::context::GraphContext;
use crate::graph::GraphExtractor;
use anyhow::{anyhow, Result};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct RecommendationEngine {
    ctx: Arc<GraphContext>,
}

impl RecommendationEngine {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Rank the `top_k` entities most related to `entity_id`.
    ///
    /// `communities` is required by the shared-community method (it is the
    /// output of a prior detection run) and ignored otherwise.
    pub async fn recommend_related_entities(
        &self,
        entity_id: &str,
        top_k: usize,
        method: RecommendationMethod,
        communities: Option<&DetectionResult>,
    ) -> Result<Vec<Recommendation>> {
        let mut recommendations = match method {
            RecommendationMethod::NeighborhoodOverlap => {
                self.by_neighborhood_overlap(entity_id).await?
            }
            RecommendationMethod::SharedCommunity => {
                let result = communities.ok_or_else(|| {
                    anyhow!("shared-community recommendations require a detection result")
                })?;
                self.by_shared_community(entity_id, result).await?
            }
        };

        recommendations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        recommendations.truncate(top_k);
        Ok(recommendations)
    }

    async fn by_neighborhood_overlap(&self, entity_id: &str) -> Result<Vec<Recommendation>> {
        let graph = GraphExtractor::new(self.ctx.store.clone())
            .extract_current_graph()
            .await?;

        let Some(seed) = graph.get_index(entity_id) else {
            return Err(anyhow!("unknown entity `{entity_id}`"));
        };

        // Undirected neighbor sets for every node.
        let mut neighbor_sets: HashMap<usize, HashSet<usize>> = HashMap::new();
        for idx in graph.graph.node_indices() {
            let set: HashSet<usize> = graph
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .chain(graph.graph.neighbors_directed(idx, Direction::Incoming))
                .filter(|n| *n != idx)
                .map(|n| n.index())
                .collect();
            neighbor_sets.insert(idx.index(), set);
        }

        let seed_neighbors = &neighbor_sets[&seed.index()];

        // Candidates: two hops out, excluding the seed and its direct
        // neighborhood.
        let mut candidates: HashSet<usize> = HashSet::new();
        for &n in seed_neighbors {
            if let Some(second_hop) = neighbor_sets.get(&n) {
                for &c in second_hop {
                    if c != seed.index() && !seed_neighbors.contains(&c) {
                        candidates.insert(c);
                    }
                }
            }
        }

        let recommendations = candidates
            .into_iter()
            .filter_map(|candidate| {
                let candidate_neighbors = neighbor_sets.get(&candidate)?;
                let intersection = seed_neighbors.intersection(candidate_neighbors).count();
                let union = seed_neighbors.union(candidate_neighbors).count();
                if intersection == 0 || union == 0 {
                    return None;
                }
                let idx = petgraph::graph::NodeIndex::new(candidate);
                Some(Recommendation {
                    entity_id: graph.graph[idx].id.clone(),
                    score: intersection as f64 / union as f64,
                    method: RecommendationMethod::NeighborhoodOverlap,
                })
            })
            .collect();
        Ok(recommendations)
    }

    async fn by_shared_community(
        &self,
        entity_id: &str,
        result: &DetectionResult,
    ) -> Result<Vec<Recommendation>> {
        let community = result
            .communities
            .iter()
            .find(|c| c.members.iter().any(|m| m == entity_id))
            .ok_or_else(|| anyhow!("entity `{entity_id}` is not in any detected community"))?;

        let degrees: HashMap<String, usize> =
            self.ctx.store.entity_degrees().await?.into_iter().collect();
        let max_degree = community
            .members
            .iter()
            .filter(|m| m.as_str() != entity_id)
            .filter_map(|m| degrees.get(m))
            .copied()
            .max()
            .unwrap_or(1)
            .max(1);

        Ok(community
            .members
            .iter()
            .filter(|member| member.as_str() != entity_id)
            .map(|member| Recommendation {
                entity_id: member.clone(),
                score: degrees.get(member).copied().unwrap_or(0) as f64 / max_degree as f64,
                method: RecommendationMethod::SharedCommunity,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::{CommunityDetector, DetectionParams};
    use crate::config::GraphConfig;
    use crate::store::mock::MockGraphStore;

    fn ctx_for(store: Arc<MockGraphStore>) -> Arc<GraphContext> {
        GraphContext::new(store, GraphConfig::default())
    }

    /// seed — n1 — c1, seed — n2 — c1 / c2: c1 shares two neighbors with
    /// the seed, c2 shares one.
    async fn overlap_store() -> Arc<MockGraphStore> {
        let store = Arc::new(MockGraphStore::new());
        for id in ["seed", "n1", "n2", "c1", "c2"] {
            store.seed_named_entity(id, "Concept", id).await;
        }
        store.link("seed", "n1", "R").await;
        store.link("seed", "n2", "R").await;
        store.link("n1", "c1", "R").await;
        store.link("n2", "c1", "R").await;
        store.link("n2", "c2", "R").await;
        store
    }

    #[tokio::test]
    async fn test_neighborhood_overlap_ranks_by_jaccard() {
        let store = overlap_store().await;
        let engine = RecommendationEngine::new(ctx_for(store));

        let recs = engine
            .recommend_related_entities(
                "seed",
                10,
                RecommendationMethod::NeighborhoodOverlap,
                None,
            )
            .await
            .unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].entity_id, "c1");
        assert_eq!(recs[1].entity_id, "c2");
        assert!(recs[0].score > recs[1].score);
        // Direct neighbors are never recommended.
        assert!(!recs.iter().any(|r| r.entity_id == "n1" || r.entity_id == "n2"));
    }

    #[tokio::test]
    async fn test_top_k_truncation_and_determinism() {
        let store = overlap_store().await;
        let engine = RecommendationEngine::new(ctx_for(store));

        let one = engine
            .recommend_related_entities(
                "seed",
                1,
                RecommendationMethod::NeighborhoodOverlap,
                None,
            )
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].entity_id, "c1");

        // Re-running yields the identical ranking.
        let again = engine
            .recommend_related_entities(
                "seed",
                1,
                RecommendationMethod::NeighborhoodOverlap,
                None,
            )
            .await
            .unwrap();
        assert_eq!(again[0].entity_id, one[0].entity_id);
    }

    #[tokio::test]
    async fn test_unknown_entity_fails() {
        let store = overlap_store().await;
        let engine = RecommendationEngine::new(ctx_for(store));
        assert!(engine
            .recommend_related_entities(
                "ghost",
                5,
                RecommendationMethod::NeighborhoodOverlap,
                None
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_shared_community_requires_detection_result() {
        let store = overlap_store().await;
        let engine = RecommendationEngine::new(ctx_for(store));
        assert!(engine
            .recommend_related_entities("seed", 5, RecommendationMethod::SharedCommunity, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_shared_community_ranks_members() {
        let store = Arc::new(MockGraphStore::new());
        // One dense cluster plus an outsider pair.
        for i in 0..4 {
            store
                .seed_named_entity(&format!("m{i}"), "Concept", &format!("m{i}"))
                .await;
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                store.link(&format!("m{i}"), &format!("m{j}"), "R").await;
            }
        }
        store.seed_named_entity("x1", "Concept", "x1").await;
        store.seed_named_entity("x2", "Concept", "x2").await;
        store.link("x1", "x2", "R").await;

        let ctx = ctx_for(store);
        let detector = CommunityDetector::new(ctx.clone());
        let result = detector
            .detect_communities(DetectionParams::default())
            .await
            .unwrap();

        let engine = RecommendationEngine::new(ctx);
        let recs = engine
            .recommend_related_entities(
                "m0",
                10,
                RecommendationMethod::SharedCommunity,
                Some(&result),
            )
            .await
            .unwrap();

        let ids: Vec<&str> = recs.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert!(recs.iter().all(|r| r.method == RecommendationMethod::SharedCommunity));
        // The cluster members tie on degree; ids break the tie.
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
