//! Graph Intelligence Layer
//!
//! A query-optimization, caching, community-detection, temporal-versioning,
//! and analytics subsystem over a Neo4j property graph:
//! - Injection-safe fluent query construction with a named template catalog
//! - LRU+TTL query caching and bounded-concurrency batch execution
//! - Dual-backend community detection (native graph-algorithms extension
//!   with in-process petgraph fallback) and LLM-assisted labeling
//! - Bi-temporal entity versioning with retention-driven pruning
//! - Centrality/PageRank analytics, knowledge-gap detection, and
//!   related-entity recommendations
//!
//! All durable state lives in the graph store; caches are in-memory and
//! rebuilt on restart. Construction goes through [`GraphContext`] — an
//! explicit dependency-injection context, no global state.

pub mod analytics;
pub mod community;
pub mod config;
pub mod context;
pub mod graph;
pub mod llm;
pub mod query;
pub mod store;
pub mod temporal;
pub mod viz;

pub use config::GraphConfig;
pub use context::GraphContext;

use anyhow::Result;
use std::sync::Arc;

/// Bundled construction of every component over one context.
///
/// Convenience for hosts that want the whole layer; components can also be
/// constructed individually around a shared [`GraphContext`].
pub struct GraphIntelligence {
    pub ctx: Arc<GraphContext>,
    pub batch: query::BatchExecutor,
    pub communities: community::CommunityDetector,
    pub versions: temporal::VersionManager,
    pub temporal: temporal::TemporalQueryBuilder,
    pub analytics: analytics::AnalyticsEngine,
    pub gaps: analytics::KnowledgeGapDetector,
    pub recommendations: analytics::RecommendationEngine,
    pub viz: viz::VizExporter,
}

impl GraphIntelligence {
    /// Assemble the layer over an existing store handle.
    pub fn new(store: Arc<dyn store::GraphStore>, config: GraphConfig) -> Self {
        let ctx = GraphContext::new(store, config);
        Self::from_context(ctx)
    }

    /// Assemble the layer over a shared context.
    pub fn from_context(ctx: Arc<GraphContext>) -> Self {
        let batch_config = query::BatchConfig {
            max_concurrency: ctx.config.batch_max_concurrency,
            query_timeout: ctx.config.query_timeout,
            max_retries: ctx.config.batch_max_retries,
            retry_backoff: ctx.config.batch_retry_backoff,
        };
        Self {
            batch: query::BatchExecutor::new(ctx.store.clone(), batch_config)
                .with_cache(ctx.query_cache.clone()),
            communities: community::CommunityDetector::new(ctx.clone()),
            versions: temporal::VersionManager::new(ctx.clone()),
            temporal: temporal::TemporalQueryBuilder::new(ctx.clone()),
            analytics: analytics::AnalyticsEngine::new(ctx.clone()),
            gaps: analytics::KnowledgeGapDetector::new(ctx.clone()),
            recommendations: analytics::RecommendationEngine::new(ctx.clone()),
            viz: viz::VizExporter::new(ctx.clone()),
            ctx,
        }
    }

    /// Connect to Neo4j using the given config and assemble the layer.
    pub async fn connect(config: GraphConfig) -> Result<Self> {
        let store = store::Neo4jStore::connect(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
            config.query_timeout,
        )
        .await?;
        Ok(Self::new(Arc::new(store), config))
    }
}
