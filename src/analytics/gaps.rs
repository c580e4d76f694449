//! Knowledge-gap detection.
//!
//! Two scans over the current graph surface the places where the knowledge
//! graph is thin:
//!
//! - **Orphan entities** — degree at or below a threshold; these are
//!   candidates for re-ingestion or manual linking.
//! - **Sparse regions** — entities whose neighbors are barely connected to
//!   one another (low local density); dense sources usually produce
//!   interlinked neighborhoods, so sparseness signals missing relations.

use super::algorithms::neighborhood_density;
use super::models::{OrphanEntity, SparseRegion};
use crate::context::GraphContext;
use crate::graph::GraphExtractor;
use anyhow::Result;
use rand::seq::index::sample;
use std::sync::Arc;

/// Neighborhood-density scanning switches to sampling above this many
/// candidate nodes to keep the scan bounded on large graphs.
const DENSITY_SAMPLE_LIMIT: usize = 512;

pub struct KnowledgeGapDetector {
    ctx: Arc<GraphContext>,
}

impl KnowledgeGapDetector {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Entities with degree `<= max_degree`, least-connected first, ties by
    /// id.
    pub async fn find_orphan_entities(&self, max_degree: usize) -> Result<Vec<OrphanEntity>> {
        let degrees = self.ctx.store.entity_degrees().await?;
        let mut orphans: Vec<OrphanEntity> = degrees
            .into_iter()
            .filter(|(_, degree)| *degree <= max_degree)
            .map(|(entity_id, degree)| OrphanEntity { entity_id, degree })
            .collect();
        orphans.sort_by(|a, b| a.degree.cmp(&b.degree).then_with(|| a.entity_id.cmp(&b.entity_id)));
        Ok(orphans)
    }

    /// Entities whose local neighborhood density falls below the threshold,
    /// sparsest first, ties by id. Densities are computed on the extracted
    /// graph; large graphs are sampled.
    pub async fn find_sparse_regions(&self, density_threshold: f64) -> Result<Vec<SparseRegion>> {
        let graph = GraphExtractor::new(self.ctx.store.clone())
            .extract_current_graph()
            .await?;

        let densities = tokio::task::spawn_blocking(move || neighborhood_density(&graph)).await?;

        let mut entries: Vec<(String, (usize, f64))> = densities.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        // Bound the scan on big graphs; sampling after the sort keeps the
        // subset deterministic in size but not composition.
        if entries.len() > DENSITY_SAMPLE_LIMIT {
            let mut rng = rand::rng();
            let mut picked: Vec<usize> =
                sample(&mut rng, entries.len(), DENSITY_SAMPLE_LIMIT).into_vec();
            picked.sort_unstable();
            entries = picked.into_iter().map(|i| entries[i].clone()).collect();
        }

        let mut regions: Vec<SparseRegion> = entries
            .into_iter()
            .filter(|(_, (_, density))| *density < density_threshold)
            .map(|(center_id, (neighborhood_size, density))| SparseRegion {
                center_id,
                neighborhood_size,
                density,
            })
            .collect();

        regions.sort_by(|a, b| {
            a.density
                .partial_cmp(&b.density)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.center_id.cmp(&b.center_id))
        });
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::store::mock::MockGraphStore;

    fn ctx_for(store: Arc<MockGraphStore>) -> Arc<GraphContext> {
        GraphContext::new(store, GraphConfig::default())
    }

    #[tokio::test]
    async fn test_orphans_sorted_least_connected_first() {
        let store = Arc::new(MockGraphStore::new());
        for id in ["hub", "x", "y", "lonely"] {
            store.seed_named_entity(id, "Concept", id).await;
        }
        store.link("hub", "x", "R").await;
        store.link("hub", "y", "R").await;

        let detector = KnowledgeGapDetector::new(ctx_for(store));
        let orphans = detector.find_orphan_entities(1).await.unwrap();

        let ids: Vec<&str> = orphans.iter().map(|o| o.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["lonely", "x", "y"]);
        assert_eq!(orphans[0].degree, 0);
    }

    #[tokio::test]
    async fn test_orphans_empty_when_all_connected() {
        let store = Arc::new(MockGraphStore::new());
        store.seed_named_entity("a", "Concept", "a").await;
        store.seed_named_entity("b", "Concept", "b").await;
        store.link("a", "b", "R").await;

        let detector = KnowledgeGapDetector::new(ctx_for(store));
        assert!(detector.find_orphan_entities(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sparse_regions_star_hub_detected() {
        let store = Arc::new(MockGraphStore::new());
        // Star: the hub's neighbors are not connected to each other.
        store.seed_named_entity("hub", "Concept", "hub").await;
        for i in 0..4 {
            let id = format!("leaf{i}");
            store.seed_named_entity(&id, "Concept", &id).await;
            store.link("hub", &id, "R").await;
        }
        // Triangle: fully dense neighborhoods.
        for id in ["t1", "t2", "t3"] {
            store.seed_named_entity(id, "Concept", id).await;
        }
        store.link("t1", "t2", "R").await;
        store.link("t2", "t3", "R").await;
        store.link("t3", "t1", "R").await;

        let detector = KnowledgeGapDetector::new(ctx_for(store));
        let regions = detector.find_sparse_regions(0.5).await.unwrap();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].center_id, "hub");
        assert_eq!(regions[0].neighborhood_size, 4);
        assert!((regions[0].density - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_sparse_regions_empty_graph() {
        let detector = KnowledgeGapDetector::new(ctx_for(Arc::new(MockGraphStore::new())));
        assert!(detector.find_sparse_regions(0.9).await.unwrap().is_empty());
    }
}
