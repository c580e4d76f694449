//! Analytics backends.
//!
//! Same strategy split as community detection: [`GdsAnalyticsBackend`]
//! pushes centrality/PageRank into the store's graph-algorithms extension;
//! [`LocalAnalyticsBackend`] extracts the graph and computes in-process on
//! a blocking worker thread. Both produce plain `(entity_id, score)` rows;
//! callers never branch on backend identity.

use super::algorithms;
use super::models::{AnalyticsBackendKind, CentralityMetric, EntityScore, PageRankConfig};
use crate::graph::GraphExtractor;
use crate::query::builder::CypherQuery;
use crate::store::models::RowExt;
use crate::store::GraphStore;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Prefix of the ephemeral in-store projection; each run gets a unique
/// suffix so concurrent computations cannot clash.
const PROJECTION_PREFIX: &str = "gi_analytics";

#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    async fn centrality(&self, metric: CentralityMetric) -> Result<Vec<EntityScore>>;

    async fn pagerank(&self, config: &PageRankConfig) -> Result<Vec<EntityScore>>;

    fn kind(&self) -> AnalyticsBackendKind;
}

// ============================================================================
// Native backend
// ============================================================================

pub struct GdsAnalyticsBackend {
    store: Arc<dyn GraphStore>,
}

impl GdsAnalyticsBackend {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    async fn drop_projection(&self, name: &str) {
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
            .context("failed to project graph for native analytics")
    }

    async fn stream_scores(&self, stream: CypherQuery) -> Result<Vec<EntityScore>> {
        let name = format!("{PROJECTION_PREFIX}_{}", Uuid::new_v4().simple());
        self.project(&name).await?;

        let stream = stream.with_param("name", name.as_str());
        let rows = self.store.execute(&stream).await;
        self.drop_projection(&name).await;
        let rows = rows.context("native analytics stream failed")?;

        if rows.is_empty() {
            return Err(anyhow!("native analytics returned no rows"));
        }

        rows.iter()
            .map(|row| {
                let entity_id = row
                    .str_col("entity_id")
                    .ok_or_else(|| anyhow!("score row missing `entity_id`"))?;
                let score = row
                    .f64_col("score")
                    .ok_or_else(|| anyhow!("score row missing `score`"))?;
                Ok(EntityScore {
                    entity_id: entity_id.to_string(),
                    score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AnalyticsBackend for GdsAnalyticsBackend {
    async fn centrality(&self, metric: CentralityMetric) -> Result<Vec<EntityScore>> {
        let procedure = match metric {
            CentralityMetric::Degree => "gds.degree.stream",
            CentralityMetric::Betweenness => "gds.betweenness.stream",
            CentralityMetric::Closeness => "gds.closeness.stream",
            CentralityMetric::Eigenvector => "gds.eigenvector.stream",
        };
        let stream = CypherQuery::new(format!(
            "CALL {procedure}($name, {{}}) YIELD nodeId, score \
             RETURN gds.util.asNode(nodeId).id AS entity_id, score"
        ));
        self.stream_scores(stream).await
    }

    async fn pagerank(&self, config: &PageRankConfig) -> Result<Vec<EntityScore>> {
        let stream = CypherQuery::new(
            "CALL gds.pageRank.stream($name, {dampingFactor: $damping, \
             maxIterations: $max_iterations, tolerance: $tolerance}) \
             YIELD nodeId, score \
             RETURN gds.util.asNode(nodeId).id AS entity_id, score",
        )
        .with_param("damping", config.damping)
        .with_param("max_iterations", config.max_iterations as i64)
        .with_param("tolerance", config.tolerance);
        self.stream_scores(stream).await
    }

    fn kind(&self) -> AnalyticsBackendKind {
        AnalyticsBackendKind::Native
    }
}

// ============================================================================
// In-process fallback backend
// ============================================================================

/// Extract-then-compute fallback. Best-effort latency; intended for
/// background/batch use when the store lacks the extension.
pub struct LocalAnalyticsBackend {
    extractor: GraphExtractor,
}

impl LocalAnalyticsBackend {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            extractor: GraphExtractor::new(store),
        }
    }

    fn to_scores(map: HashMap<String, f64>) -> Vec<EntityScore> {
        map.into_iter()
            .map(|(entity_id, score)| EntityScore { entity_id, score })
            .collect()
    }
}

#[async_trait]
impl AnalyticsBackend for LocalAnalyticsBackend {
    async fn centrality(&self, metric: CentralityMetric) -> Result<Vec<EntityScore>> {
        let graph = self.extractor.extract_current_graph().await?;
        let scores = tokio::task::spawn_blocking(move || match metric {
            CentralityMetric::Degree => algorithms::degree_centrality(&graph),
            CentralityMetric::Betweenness => algorithms::betweenness_centrality(&graph),
            CentralityMetric::Closeness => algorithms::closeness_centrality(&graph),
            CentralityMetric::Eigenvector => algorithms::eigenvector_centrality(&graph),
        })
        .await
        .context("in-process centrality task panicked")?;
        Ok(Self::to_scores(scores))
    }

    async fn pagerank(&self, config: &PageRankConfig) -> Result<Vec<EntityScore>> {
        let graph = self.extractor.extract_current_graph().await?;
        let config = config.clone();
        let scores = tokio::task::spawn_blocking(move || algorithms::pagerank(&graph, &config))
            .await
            .context("in-process pagerank task panicked")?;
        Ok(Self::to_scores(scores))
    }

    fn kind(&self) -> AnalyticsBackendKind {
        AnalyticsBackendKind::InProcess
    }
}
