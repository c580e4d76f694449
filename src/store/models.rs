//! Graph store data models.
//!
//! The store speaks in three shapes:
//!
//! - [`Entity`] — a versioned property-graph node. The bi-temporal pair
//!   `valid_from` / `valid_to` plus the monotonically increasing `version`
//!   form the versioning contract: at most one version of a given entity id
//!   has `valid_to == None` (the current version).
//! - [`Relationship`] — a directed, typed edge between entity ids.
//!   Relationships are not independently versioned; their validity derives
//!   from the validity of their endpoints.
//! - [`Row`] — one result row of a parameterized query, decoded to
//!   column-name → JSON value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded result row: column name → value.
pub type Row = Map<String, Value>;

/// A versioned graph entity (node).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Stable identifier, shared by all versions of the entity.
    pub id: String,
    /// Type label (e.g. "Person", "Concept", "Document").
    pub entity_type: String,
    /// Arbitrary scalar/collection properties.
    pub properties: Map<String, Value>,
    /// When this version became valid.
    pub valid_from: DateTime<Utc>,
    /// When this version was superseded; `None` means current.
    pub valid_to: Option<DateTime<Utc>>,
    /// Monotonically increasing per entity id, starting at 1.
    pub version: i64,
}

impl Entity {
    /// Create the first (current) version of an entity.
    pub fn new(
        id: impl Into<String>,
        entity_type: impl Into<String>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            properties,
            valid_from: Utc::now(),
            valid_to: None,
            version: 1,
        }
    }

    /// Whether this is the current (open-ended) version.
    pub fn is_current(&self) -> bool {
        self.valid_to.is_none()
    }

    /// Whether this version was valid at `ts`
    /// (`valid_from <= ts < valid_to`, open-ended when current).
    pub fn valid_at(&self, ts: DateTime<Utc>) -> bool {
        self.valid_from <= ts && self.valid_to.map_or(true, |end| ts < end)
    }

    /// Whether this version's validity window overlaps `[start, end]`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.valid_from <= end && self.valid_to.map_or(true, |vt| vt > start)
    }

    /// Convenience property accessor.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Human-facing name: the `name` property, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub rel_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Optional weight used by weighted graph algorithms; `None` reads as 1.0.
    pub weight: Option<f64>,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
            properties: Map::new(),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Effective weight for algorithms (1.0 when unset).
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// Typed accessors for [`Row`] columns.
pub trait RowExt {
    fn str_col(&self, key: &str) -> Option<&str>;
    fn i64_col(&self, key: &str) -> Option<i64>;
    fn f64_col(&self, key: &str) -> Option<f64>;
}

impl RowExt for Row {
    fn str_col(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn i64_col(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    fn f64_col(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn props(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_new_entity_is_current_version_one() {
        let e = Entity::new("e1", "Person", props(&[("name", "Ada".into())]));
        assert!(e.is_current());
        assert_eq!(e.version, 1);
        assert_eq!(e.display_name(), "Ada");
    }

    #[test]
    fn test_valid_at_window_semantics() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(10);
        let mut e = Entity::new("e1", "Person", Map::new());
        e.valid_from = t0;
        e.valid_to = Some(t1);

        assert!(e.valid_at(t0));
        assert!(e.valid_at(t0 + Duration::seconds(5)));
        // Exclusive upper bound: a closed version is not valid at its end.
        assert!(!e.valid_at(t1));
        assert!(!e.valid_at(t0 - Duration::seconds(1)));
    }

    #[test]
    fn test_overlaps_range() {
        let t0 = Utc::now();
        let mut e = Entity::new("e1", "Person", Map::new());
        e.valid_from = t0;
        e.valid_to = Some(t0 + Duration::seconds(10));

        assert!(e.overlaps(t0 + Duration::seconds(5), t0 + Duration::seconds(15)));
        assert!(e.overlaps(t0 - Duration::seconds(5), t0));
        assert!(!e.overlaps(t0 + Duration::seconds(11), t0 + Duration::seconds(20)));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let e = Entity::new("e1", "Person", Map::new());
        assert_eq!(e.display_name(), "e1");
    }

    #[test]
    fn test_relationship_effective_weight() {
        let r = Relationship::new("a", "b", "LINKS_TO");
        assert!((r.effective_weight() - 1.0).abs() < f64::EPSILON);
        let weighted = r.with_weight(2.5);
        assert!((weighted.effective_weight() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_row_ext_accessors() {
        let mut row = Row::new();
        row.insert("name".into(), "Ada".into());
        row.insert("count".into(), 42.into());
        row.insert("score".into(), serde_json::json!(0.5));

        assert_eq!(row.str_col("name"), Some("Ada"));
        assert_eq!(row.i64_col("count"), Some(42));
        assert_eq!(row.f64_col("score"), Some(0.5));
        assert_eq!(row.str_col("missing"), None);
    }

    #[test]
    fn test_entity_serde_roundtrip() {
        let e = Entity::new("e1", "Concept", props(&[("name", "graph theory".into())]));
        let json = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
