//! Community detection and labeling.
//!
//! Detection partitions the current graph into topic clusters; labeling
//! turns clusters into human-readable labels via the text-generation
//! collaborator. The two stages are connected by the plain [`Community`]
//! value so detection stays deterministic and labeling stays mockable.
//!
//! ```text
//!            ┌── native (graph-algorithms extension)
//! detector ──┤                                        ──► normalize ──► Vec<Community> ──► labeler
//!            └── in-process (petgraph, spawn_blocking)
//! ```
//!
//! - [`models`] — `Community`, `DetectionParams`, phases, results
//! - [`algorithms`] — in-process Louvain / label propagation + modularity
//! - [`backend`] — the dual-backend strategy seam
//! - [`detector`] — lifecycle, capability-checked selection, fallback
//! - [`labeler`] — best-effort LLM labeling with per-community degradation

pub mod algorithms;
pub mod backend;
pub mod detector;
pub mod labeler;
pub mod models;

pub use backend::{CommunityBackend, GdsCommunityBackend, LocalCommunityBackend};
pub use detector::CommunityDetector;
pub use labeler::CommunityLabeler;
pub use models::{
    Community, CommunityAlgorithm, DetectionBackend, DetectionParams, DetectionPhase,
    DetectionResult,
};
