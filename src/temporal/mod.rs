//! Bi-temporal entity versioning.
//!
//! Entities are never mutated in place: every update closes the current
//! version and opens a successor, giving each entity a tiled sequence of
//! validity windows. The write path is [`VersionManager`] (the sole
//! mutation entry point, with retention-driven pruning); the read path is
//! [`TemporalQueryBuilder`] (point-in-time, range overlap, evolution).
//!
//! Relationships are not independently versioned — their validity derives
//! from their endpoints' windows.

pub mod manager;
pub mod models;
pub mod query;

pub use manager::VersionManager;
pub use models::{Evolution, EvolutionSummary, TemporalFilters, VersionDiff};
pub use query::TemporalQueryBuilder;
