//! Graph store client and models.
//!
//! The store is an external collaborator: a property-graph database that
//! accepts parameterized declarative queries and returns typed rows. This
//! module defines the [`GraphStore`] seam, the Neo4j-backed production
//! client, and the in-memory mock used throughout the test suite.

pub mod client;
pub mod models;
pub mod traits;

pub use client::Neo4jStore;
pub use models::{Entity, Relationship, Row, RowExt};
pub use traits::GraphStore;

#[cfg(test)]
pub(crate) mod mock;
