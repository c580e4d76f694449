//! Analytics engine — backend selection, score caching, ranked surfaces.
//!
//! Scores are expensive to recompute, so results are cached with a TTL
//! (default 10 minutes) keyed by algorithm + parameters + the context's
//! graph-version marker: a graph mutation changes the marker and naturally
//! orphans every stale entry. Expired and orphaned entries are swept
//! opportunistically on insert.
//!
//! Backend selection mirrors community detection: native when the
//! capability probe allows, silent fallback to the in-process backend on
//! native failure, single aggregate error only when both fail.

use super::backend::{AnalyticsBackend, GdsAnalyticsBackend, LocalAnalyticsBackend};
use super::models::{CentralityMetric, EntityScore, PageRankConfig};
use crate::context::GraphContext;
use anyhow::{anyhow, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

struct CachedScores {
    scores: Vec<EntityScore>,
    computed_at: Instant,
}

pub struct AnalyticsEngine {
    ctx: Arc<GraphContext>,
    native: GdsAnalyticsBackend,
    local: LocalAnalyticsBackend,
    score_cache: DashMap<String, CachedScores>,
}

impl AnalyticsEngine {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self {
            native: GdsAnalyticsBackend::new(ctx.store.clone()),
            local: LocalAnalyticsBackend::new(ctx.store.clone()),
            ctx,
            score_cache: DashMap::new(),
        }
    }

    /// Centrality scores for every current entity, descending, ties broken
    /// by entity id.
    pub async fn centrality(&self, metric: CentralityMetric) -> Result<Vec<EntityScore>> {
        let key = format!("centrality:{metric}:g{}", self.ctx.graph_version());
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let scores = self
            .run_with_fallback(
                |backend| backend.centrality(metric),
                &format!("{metric} centrality"),
            )
            .await?;
        Ok(self.finish(key, scores))
    }

    /// PageRank scores, descending, ties broken by entity id.
    pub async fn pagerank(&self, config: &PageRankConfig) -> Result<Vec<EntityScore>> {
        let key = format!(
            "pagerank:d{}:i{}:t{}:g{}",
            config.damping,
            config.max_iterations,
            config.tolerance,
            self.ctx.graph_version()
        );
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let scores = self
            .run_with_fallback(|backend| backend.pagerank(config), "pagerank")
            .await?;
        Ok(self.finish(key, scores))
    }

    /// The `limit` most influential entities under a metric.
    pub async fn top_entities(
        &self,
        metric: CentralityMetric,
        limit: usize,
    ) -> Result<Vec<EntityScore>> {
        let mut scores = self.centrality(metric).await?;
        scores.truncate(limit);
        Ok(scores)
    }

    /// Number of live cache entries (observability).
    pub fn cached_score_sets(&self) -> usize {
        self.score_cache.len()
    }

    async fn run_with_fallback<'a, F>(&'a self, run: F, what: &str) -> Result<Vec<EntityScore>>
    where
        F: Fn(
            &'a dyn AnalyticsBackend,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<Vec<EntityScore>>> + Send + 'a>,
        >,
    {
        if self.ctx.gds_available().await {
            match run(&self.native).await {
                Ok(scores) => return Ok(scores),
                Err(native_err) => {
                    tracing::debug!("native {what} failed, using in-process fallback: {native_err}");
                    return run(&self.local).await.map_err(|local_err| {
                        anyhow!(
                            "{what} failed on both backends \
                             (native: {native_err}; fallback: {local_err})"
                        )
                    });
                }
            }
        }
        run(&self.local).await
    }

    fn cached(&self, key: &str) -> Option<Vec<EntityScore>> {
        let entry = self.score_cache.get(key)?;
        if entry.computed_at.elapsed() >= self.ctx.config.score_cache_ttl {
            drop(entry);
            self.score_cache.remove(key);
            return None;
        }
        Some(entry.scores.clone())
    }

    fn finish(&self, key: String, mut scores: Vec<EntityScore>) -> Vec<EntityScore> {
        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });

        // Sweep entries that expired or belong to an older graph version.
        let ttl = self.ctx.config.score_cache_ttl;
        let version_suffix = format!(":g{}", self.ctx.graph_version());
        self.score_cache
            .retain(|k, v| v.computed_at.elapsed() < ttl && k.ends_with(&version_suffix));

        self.score_cache.insert(
            key,
            CachedScores {
                scores: scores.clone(),
                computed_at: Instant::now(),
            },
        );
        scores
    }
}
