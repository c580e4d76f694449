//! In-memory graph extraction.
//!
//! The in-process fallback backends (community detection, analytics) cannot
//! push computation into the store, so they pull the graph out instead:
//!
//! ```text
//! store (GraphStore) ──► extraction ──► EntityGraph (petgraph)
//!                                            │
//!                              community / analytics algorithms
//! ```
//!
//! - [`models`] — `EntityGraph` wrapper with id ↔ NodeIndex mapping
//! - [`extraction`] — `GraphExtractor` (full graph or bounded neighborhood)

pub mod extraction;
pub mod models;

pub use extraction::GraphExtractor;
pub use models::{EntityGraph, GraphEdge, GraphNode};
