//! Version manager — the sole entity-mutation entry point.
//!
//! Updates never mutate in place: [`VersionManager::create_version`] closes
//! the current version (`valid_to = now`) and inserts a successor with
//! `valid_from = now`, `valid_to = NULL`, `version = previous + 1`. The
//! same instant is used for both edges so the validity windows tile with no
//! gap and no overlap.
//!
//! Retention: once an entity's record count exceeds the configured limit,
//! the oldest historical records are pruned. The current version is never
//! eligible, and pruning failures are logged — they never fail the
//! triggering create call.
//!
//! Every successful write bumps the context's graph-version marker and
//! clears the query cache.

use super::models::VersionDiff;
use crate::context::GraphContext;
use crate::store::Entity;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct VersionManager {
    ctx: Arc<GraphContext>,
}

impl VersionManager {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Create a brand-new entity (version 1, current).
    ///
    /// Fails if any version of the id already exists — updates must go
    /// through [`create_version`](Self::create_version).
    pub async fn create_entity(
        &self,
        entity_id: &str,
        entity_type: &str,
        properties: Map<String, Value>,
    ) -> Result<Entity> {
        let existing = self.ctx.store.entity_versions(entity_id).await?;
        if !existing.is_empty() {
            return Err(anyhow!("entity `{entity_id}` already exists"));
        }

        let entity = Entity::new(entity_id, entity_type, properties);
        self.ctx
            .store
            .insert_entity_version(&entity)
            .await
            .with_context(|| format!("failed to create entity `{entity_id}`"))?;

        self.ctx.note_graph_mutation();
        Ok(entity)
    }

    /// Supersede the current version with a new property snapshot.
    /// Returns the newly created (now current) version.
    pub async fn create_version(
        &self,
        entity_id: &str,
        new_properties: Map<String, Value>,
    ) -> Result<Entity> {
        let versions = self.ctx.store.entity_versions(entity_id).await?;
        let current = versions
            .iter()
            .find(|e| e.is_current())
            .ok_or_else(|| anyhow!("entity `{entity_id}` has no current version"))?;

        let now = Utc::now();
        let next = Entity {
            id: current.id.clone(),
            entity_type: current.entity_type.clone(),
            properties: new_properties,
            valid_from: now,
            valid_to: None,
            version: current.version + 1,
        };

        self.ctx
            .store
            .close_entity_version(entity_id, current.version, now)
            .await
            .with_context(|| format!("failed to close current version of `{entity_id}`"))?;
        self.ctx
            .store
            .insert_entity_version(&next)
            .await
            .with_context(|| format!("failed to insert version {} of `{entity_id}`", next.version))?;

        // Retention pruning is best-effort and never blocks the caller.
        if let Err(e) = self.prune(entity_id).await {
            tracing::warn!("retention pruning failed for `{entity_id}`: {e}");
        }

        self.ctx.note_graph_mutation();
        Ok(next)
    }

    /// Full version history, ascending by version.
    pub async fn get_history(&self, entity_id: &str) -> Result<Vec<Entity>> {
        self.ctx.store.entity_versions(entity_id).await
    }

    /// Structured property diff between two retained versions. Computed
    /// from the retrieved snapshots; no per-field store round-trips.
    pub async fn compare_versions(
        &self,
        entity_id: &str,
        v1: i64,
        v2: i64,
    ) -> Result<VersionDiff> {
        let versions = self.ctx.store.entity_versions(entity_id).await?;
        let find = |v: i64| {
            versions
                .iter()
                .find(|e| e.version == v)
                .ok_or_else(|| anyhow!("entity `{entity_id}` has no retained version {v}"))
        };
        let (older, newer) = if v1 <= v2 {
            (find(v1)?, find(v2)?)
        } else {
            (find(v2)?, find(v1)?)
        };
        Ok(VersionDiff::between(older, newer))
    }

    /// Delete the oldest historical versions beyond the retention limit.
    async fn prune(&self, entity_id: &str) -> Result<()> {
        let retention = self.ctx.config.version_retention.max(1);
        let versions = self.ctx.store.entity_versions(entity_id).await?;
        if versions.len() <= retention {
            return Ok(());
        }

        let excess = versions.len() - retention;
        let prunable: Vec<i64> = versions
            .iter()
            .filter(|e| !e.is_current())
            .map(|e| e.version)
            .take(excess)
            .collect();

        for version in prunable {
            self.ctx
                .store
                .delete_entity_version(entity_id, version)
                .await
                .with_context(|| format!("failed to prune version {version}"))?;
            tracing::debug!(entity_id, version, "pruned historical version");
        }
        Ok(())
    }
}
