//! Graph analytics and recommendations.
//!
//! Centrality and PageRank run on the same dual-backend strategy as
//! community detection (native graph-algorithms extension preferred,
//! in-process petgraph fallback otherwise), with results cached for ten
//! minutes keyed by algorithm + parameters + graph-version marker.
//!
//! - [`models`] — metrics, scores, gaps, recommendations
//! - [`algorithms`] — in-process centrality/PageRank implementations
//! - [`backend`] — the dual-backend strategy seam
//! - [`engine`] — selection, caching, ranked surfaces
//! - [`gaps`] — orphan-entity and sparse-region knowledge-gap detection
//! - [`recommend`] — related-entity recommendations

pub mod algorithms;
pub mod backend;
pub mod engine;
pub mod gaps;
pub mod models;
pub mod recommend;

pub use backend::{AnalyticsBackend, GdsAnalyticsBackend, LocalAnalyticsBackend};
pub use engine::AnalyticsEngine;
pub use gaps::KnowledgeGapDetector;
pub use models::{
    AnalyticsBackendKind, CentralityMetric, EntityScore, OrphanEntity, PageRankConfig,
    Recommendation, RecommendationMethod, SparseRegion,
};
pub use recommend::RecommendationEngine;
