//! Temporal versioning data models.
//!
//! The version record itself is an [`Entity`](crate::store::Entity) — one
//! store node per version. These types are the shapes layered on top:
//! filters for temporal reads, diffs between versions, and the evolution
//! summary used for change-frequency and drift metrics.

use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filters applied to point-in-time and range queries.
#[derive(Debug, Clone, Default)]
pub struct TemporalFilters {
    /// Restrict to one entity type label.
    pub entity_type: Option<String>,
    /// Restrict to entities whose property equals the given value
    /// (applied to the matched version's snapshot).
    pub property_equals: Option<(String, Value)>,
}

impl TemporalFilters {
    pub fn by_type(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }

    /// Whether `entity` passes the property filter (type filtering happens
    /// in the store).
    pub(crate) fn matches_properties(&self, entity: &Entity) -> bool {
        match &self.property_equals {
            Some((key, expected)) => entity.property(key) == Some(expected),
            None => true,
        }
    }
}

/// Structured property diff between two version records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionDiff {
    /// Keys present only in the newer version.
    pub added: Vec<String>,
    /// Keys present only in the older version.
    pub removed: Vec<String>,
    /// Keys present in both with differing values.
    pub changed: Vec<String>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Diff two property snapshots. Purely computed; no store access.
    pub fn between(older: &Entity, newer: &Entity) -> Self {
        let mut diff = Self::default();
        for key in newer.properties.keys() {
            match older.properties.get(key) {
                None => diff.added.push(key.clone()),
                Some(old_value) if old_value != &newer.properties[key] => {
                    diff.changed.push(key.clone());
                }
                Some(_) => {}
            }
        }
        for key in older.properties.keys() {
            if !newer.properties.contains_key(key) {
                diff.removed.push(key.clone());
            }
        }
        diff.added.sort();
        diff.removed.sort();
        diff.changed.sort();
        diff
    }
}

/// Change-frequency and drift metrics over an entity's history window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSummary {
    pub version_count: usize,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_change: Option<DateTime<Utc>>,
    /// Version transitions per day across the covered window.
    pub changes_per_day: f64,
    /// Every property key that changed in any transition, deduplicated.
    pub churned_properties: Vec<String>,
}

/// Ordered version history of one entity within a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evolution {
    pub entity_id: String,
    /// Version records in chronological order.
    pub records: Vec<Entity>,
    pub summary: EvolutionSummary,
}
