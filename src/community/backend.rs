//! Community detection backends.
//!
//! Two interchangeable implementations behind [`CommunityBackend`]:
//!
//! - [`GdsCommunityBackend`] drives the store's graph-algorithms extension
//!   (ephemeral Cypher projection → stream → drop);
//! - [`LocalCommunityBackend`] extracts the graph and partitions it
//!   in-process on a blocking worker thread, so the CPU-bound work never
//!   stalls the async runtime.
//!
//! Both return a raw node → community assignment; the detector owns
//! normalization, so callers never branch on backend identity.

use super::algorithms::{label_propagation, louvain, Membership};
use super::models::{CommunityAlgorithm, DetectionBackend, DetectionParams};
use crate::graph::GraphExtractor;
use crate::query::builder::CypherQuery;
use crate::store::models::RowExt;
use crate::store::GraphStore;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Prefix of the ephemeral in-store graph projection. Each run appends a
/// unique suffix so concurrent detections cannot clash on the projection.
const PROJECTION_PREFIX: &str = "gi_communities";

/// Strategy seam: produce a raw membership for the current graph.
#[async_trait]
pub trait CommunityBackend: Send + Sync {
    async fn detect_membership(&self, params: &DetectionParams) -> Result<Membership>;

    fn kind(&self) -> DetectionBackend;
}

// ============================================================================
// Native backend (graph-algorithms extension)
// ============================================================================

/// Runs detection inside the store via its graph-algorithms extension.
pub struct GdsCommunityBackend {
    store: Arc<dyn GraphStore>,
}

impl GdsCommunityBackend {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    async fn drop_projection(&self, name: &str) {
        // failIfMissing=false: dropping a projection that does not exist is
        // a no-op, and cleanup failures are not worth surfacing.
        let drop =
            CypherQuery::new("CALL gds.graph.drop($name, false)").with_param("name", name);
        if let Err(e) = self.store.run(&drop).await {
            tracing::debug!("projection drop skipped: {e}");
        }
    }

    async fn project(&self, name: &str) -> Result<()> {
        let project = CypherQuery::new(
            "CALL gds.graph.project.cypher($name, $node_query, $rel_query)",
        )
        .with_param("name", name)
        .with_param(
            "node_query",
            "MATCH (e:Entity) WHERE e.valid_to IS NULL RETURN id(e) AS id",
        )
        .with_param(
            "rel_query",
            "MATCH (a:Entity)-[r]->(b:Entity) \
             WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
             RETURN id(a) AS source, id(b) AS target",
        );
        self.store
            .run(&project)
            .await
            .context("failed to project graph for native detection")
    }
}

#[async_trait]
impl CommunityBackend for GdsCommunityBackend {
    async fn detect_membership(&self, params: &DetectionParams) -> Result<Membership> {
        let name = format!("{PROJECTION_PREFIX}_{}", Uuid::new_v4().simple());
        self.project(&name).await?;

        // The extension's Louvain exposes no resolution knob; granularity
        // tuning is exact only on the in-process path.
        let stream = match params.algorithm {
            CommunityAlgorithm::Louvain => CypherQuery::new(
                "CALL gds.louvain.stream($name, {maxLevels: 10, tolerance: 0.0001}) \
                 YIELD nodeId, communityId \
                 RETURN gds.util.asNode(nodeId).id AS entity_id, communityId AS community_id",
            ),
            CommunityAlgorithm::LabelPropagation => CypherQuery::new(
                "CALL gds.labelPropagation.stream($name, {}) \
                 YIELD nodeId, communityId \
                 RETURN gds.util.asNode(nodeId).id AS entity_id, communityId AS community_id",
            ),
        }
        .with_param("name", name.as_str());

        let rows = self.store.execute(&stream).await;
        self.drop_projection(&name).await;
        let rows = rows.context("native community detection stream failed")?;

        if rows.is_empty() {
            return Err(anyhow!("native community detection returned no rows"));
        }

        let mut membership = Membership::with_capacity(rows.len());
        for row in &rows {
            let entity_id = row
                .str_col("entity_id")
                .ok_or_else(|| anyhow!("native detection row missing `entity_id`"))?;
            let community_id = row
                .i64_col("community_id")
                .ok_or_else(|| anyhow!("native detection row missing `community_id`"))?;
            membership.insert(entity_id.to_string(), community_id as u32);
        }
        Ok(membership)
    }

    fn kind(&self) -> DetectionBackend {
        DetectionBackend::Native
    }
}

// ============================================================================
// In-process fallback backend
// ============================================================================

/// Extract-then-partition fallback for stores without the extension.
///
/// Best-effort latency: suitable for background/batch use, not the
/// interactive path the native backend serves.
pub struct LocalCommunityBackend {
    extractor: GraphExtractor,
}

impl LocalCommunityBackend {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            extractor: GraphExtractor::new(store),
        }
    }
}

#[async_trait]
impl CommunityBackend for LocalCommunityBackend {
    async fn detect_membership(&self, params: &DetectionParams) -> Result<Membership> {
        let graph = self.extractor.extract_current_graph().await?;
        let algorithm = params.algorithm;
        let resolution = params.resolution;

        // Partitioning is CPU-bound; keep it off the async worker threads.
        tokio::task::spawn_blocking(move || match algorithm {
            CommunityAlgorithm::Louvain => louvain(&graph, resolution),
            CommunityAlgorithm::LabelPropagation => label_propagation(&graph),
        })
        .await
        .context("in-process detection task panicked")
    }

    fn kind(&self) -> DetectionBackend {
        DetectionBackend::InProcess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockGraphStore;
    use crate::store::models::Row;

    async fn clustered_store() -> Arc<MockGraphStore> {
        let store = Arc::new(MockGraphStore::new());
        for i in 0..4 {
            store
                .seed_named_entity(&format!("a{i}"), "Concept", &format!("a{i}"))
                .await;
            store
                .seed_named_entity(&format!("b{i}"), "Concept", &format!("b{i}"))
                .await;
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                store.link(&format!("a{i}"), &format!("a{j}"), "RELATES").await;
                store.link(&format!("b{i}"), &format!("b{j}"), "RELATES").await;
            }
        }
        store.link("a0", "b0", "RELATES").await;
        store
    }

    #[tokio::test]
    async fn test_local_backend_partitions_clusters() {
        let store = clustered_store().await;
        let backend = LocalCommunityBackend::new(store);
        let membership = backend
            .detect_membership(&DetectionParams::default())
            .await
            .unwrap();

        assert_eq!(membership.len(), 8);
        assert_eq!(membership["a0"], membership["a3"]);
        assert_eq!(membership["b0"], membership["b3"]);
        assert_ne!(membership["a0"], membership["b0"]);
        assert_eq!(backend.kind(), DetectionBackend::InProcess);
    }

    #[tokio::test]
    async fn test_native_backend_parses_stream_rows() {
        let store = Arc::new(MockGraphStore::new());
        let mut rows = Vec::new();
        for (id, community) in [("a", 7_i64), ("b", 7), ("c", 12)] {
            let mut row = Row::new();
            row.insert("entity_id".into(), id.into());
            row.insert("community_id".into(), community.into());
            rows.push(row);
        }
        store.answer_with("gds.louvain.stream", rows).await;

        let backend = GdsCommunityBackend::new(store.clone());
        let membership = backend
            .detect_membership(&DetectionParams::default())
            .await
            .unwrap();

        assert_eq!(membership.len(), 3);
        assert_eq!(membership["a"], membership["b"]);
        assert_ne!(membership["a"], membership["c"]);
        assert_eq!(backend.kind(), DetectionBackend::Native);

        // project → stream → drop all went through the store; the initial
        // drop is best-effort.
        let executed = store.executed.read().await;
        assert!(executed.iter().any(|q| q.text.contains("gds.graph.project")));
        assert!(executed.iter().any(|q| q.text.contains("gds.graph.drop")));
    }

    #[tokio::test]
    async fn test_native_backend_empty_stream_is_an_error() {
        let store = Arc::new(MockGraphStore::new());
        let backend = GdsCommunityBackend::new(store);
        assert!(backend
            .detect_membership(&DetectionParams::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_native_backend_label_propagation_query_shape() {
        let store = Arc::new(MockGraphStore::new());
        let mut row = Row::new();
        row.insert("entity_id".into(), "a".into());
        row.insert("community_id".into(), 1_i64.into());
        store.answer_with("gds.labelPropagation.stream", vec![row]).await;

        let backend = GdsCommunityBackend::new(store);
        let params = DetectionParams {
            algorithm: CommunityAlgorithm::LabelPropagation,
            ..DetectionParams::default()
        };
        let membership = backend.detect_membership(&params).await.unwrap();
        assert_eq!(membership["a"], 1);
    }
}
