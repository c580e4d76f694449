//! Temporal read path: point-in-time snapshots, range overlap queries, and
//! per-entity evolution histories.

use super::models::{Evolution, EvolutionSummary, TemporalFilters, VersionDiff};
use crate::context::GraphContext;
use crate::store::Entity;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct TemporalQueryBuilder {
    ctx: Arc<GraphContext>,
}

impl TemporalQueryBuilder {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self { ctx }
    }

    /// Point-in-time snapshot: every entity version valid at `ts`
    /// (`valid_from <= ts < valid_to`, open-ended for current versions).
    pub async fn at_time(
        &self,
        ts: DateTime<Utc>,
        filters: &TemporalFilters,
    ) -> Result<Vec<Entity>> {
        let entities = self
            .ctx
            .store
            .entities_at_time(ts, filters.entity_type.as_deref())
            .await?;
        Ok(entities
            .into_iter()
            .filter(|e| filters.matches_properties(e))
            .collect())
    }

    /// Entity versions whose validity window overlaps `[start, end]` in any
    /// way.
    pub async fn during_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &TemporalFilters,
    ) -> Result<Vec<Entity>> {
        let entities = self
            .ctx
            .store
            .entities_in_range(start, end, filters.entity_type.as_deref())
            .await?;
        Ok(entities
            .into_iter()
            .filter(|e| filters.matches_properties(e))
            .collect())
    }

    /// Ordered version records of one entity overlapping `[start, end]`,
    /// with change-frequency and drift metrics.
    pub async fn evolution(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Evolution> {
        let mut records: Vec<Entity> = self
            .ctx
            .store
            .entity_versions(entity_id)
            .await?
            .into_iter()
            .filter(|e| e.overlaps(start, end))
            .collect();
        records.sort_by_key(|e| e.version);

        let summary = summarize(&records);
        Ok(Evolution {
            entity_id: entity_id.to_string(),
            records,
            summary,
        })
    }
}

/// Compute change metrics over an ordered record sequence.
fn summarize(records: &[Entity]) -> EvolutionSummary {
    let first_seen = records.first().map(|e| e.valid_from);
    let last_change = records.last().map(|e| e.valid_from);

    let changes = records.len().saturating_sub(1);
    let changes_per_day = match (first_seen, last_change) {
        (Some(first), Some(last)) if changes > 0 => {
            let days = (last - first).num_seconds() as f64 / 86_400.0;
            // Everything inside one day reads as "changes per day" directly.
            changes as f64 / days.max(1.0)
        }
        _ => 0.0,
    };

    let mut churned: BTreeSet<String> = BTreeSet::new();
    for pair in records.windows(2) {
        let diff = VersionDiff::between(&pair[0], &pair[1]);
        churned.extend(diff.added);
        churned.extend(diff.removed);
        churned.extend(diff.changed);
    }

    EvolutionSummary {
        version_count: records.len(),
        first_seen,
        last_change,
        changes_per_day,
        churned_properties: churned.into_iter().collect(),
    }
}
