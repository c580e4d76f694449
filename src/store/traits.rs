//! GraphStore trait definition.
//!
//! Abstract interface for the property-graph store collaborator. Every
//! component in this crate talks to the store through `Arc<dyn GraphStore>`,
//! enabling testing with the in-memory mock and future backend swaps.
//!
//! The trait has two layers:
//!
//! - a **generic query surface** (`execute` / `run`) taking parameterized
//!   queries produced by the query builder and templates — this is the path
//!   the cache, the batch executor, and the native graph-algorithms backends
//!   use;
//! - **typed operations** for the shapes the versioning, analytics, and
//!   community components need, so call sites stay free of row decoding.

use crate::query::builder::CypherQuery;
use crate::store::models::{Entity, Relationship, Row};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Abstract interface for all graph store operations.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ========================================================================
    // Generic query surface
    // ========================================================================

    /// Execute a parameterized query and return its decoded rows.
    async fn execute(&self, query: &CypherQuery) -> Result<Vec<Row>>;

    /// Execute a parameterized query, discarding any results.
    async fn run(&self, query: &CypherQuery) -> Result<()>;

    /// Whether the store exposes a native graph-algorithms extension.
    ///
    /// A probe failure reads as "unsupported": capability absence is not an
    /// error, it selects the in-process fallback backend.
    async fn supports_graph_algorithms(&self) -> bool;

    // ========================================================================
    // Current-graph reads
    // ========================================================================

    /// Get the current version of an entity, if any.
    async fn get_current_entity(&self, entity_id: &str) -> Result<Option<Entity>>;

    /// List current entities, optionally filtered by type label.
    async fn list_current_entities(&self, entity_type: Option<&str>) -> Result<Vec<Entity>>;

    /// List relationships whose endpoints are both current.
    async fn list_current_relationships(&self) -> Result<Vec<Relationship>>;

    /// Distinct ids of entities within `depth` hops of `entity_id`
    /// (undirected), excluding the entity itself.
    async fn neighbor_ids(&self, entity_id: &str, depth: u32) -> Result<Vec<String>>;

    /// (entity id, degree) for every current entity, counting edges to
    /// current endpoints in either direction.
    async fn entity_degrees(&self) -> Result<Vec<(String, usize)>>;

    // ========================================================================
    // Version history
    // ========================================================================

    /// All version records for an entity, ascending by version number.
    async fn entity_versions(&self, entity_id: &str) -> Result<Vec<Entity>>;

    /// Insert a new version record.
    async fn insert_entity_version(&self, entity: &Entity) -> Result<()>;

    /// Close a version by setting its `valid_to`.
    async fn close_entity_version(
        &self,
        entity_id: &str,
        version: i64,
        valid_to: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a single version record (used by retention pruning).
    async fn delete_entity_version(&self, entity_id: &str, version: i64) -> Result<()>;

    // ========================================================================
    // Temporal reads
    // ========================================================================

    /// Entities valid at `ts` (`valid_from <= ts < valid_to`, open-ended
    /// when current), optionally filtered by type.
    async fn entities_at_time(
        &self,
        ts: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<Entity>>;

    /// Entity versions whose validity window overlaps `[start, end]`,
    /// optionally filtered by type.
    async fn entities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<Entity>>;
}
