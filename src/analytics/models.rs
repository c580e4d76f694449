//! Analytics data models.

use serde::{Deserialize, Serialize};

/// Centrality measures exposed by both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CentralityMetric {
    Degree,
    Betweenness,
    Closeness,
    Eigenvector,
}

impl std::fmt::Display for CentralityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degree => write!(f, "degree"),
            Self::Betweenness => write!(f, "betweenness"),
            Self::Closeness => write!(f, "closeness"),
            Self::Eigenvector => write!(f, "eigenvector"),
        }
    }
}

/// Which backend computed a score set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyticsBackendKind {
    Native,
    InProcess,
}

/// PageRank tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 20,
            tolerance: 1e-4,
        }
    }
}

/// A per-entity numeric score, the unit of every analytics result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityScore {
    pub entity_id: String,
    pub score: f64,
}

/// An entity with no (or almost no) connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrphanEntity {
    pub entity_id: String,
    pub degree: usize,
}

/// A weakly-knit neighborhood: the entity's neighbors are barely connected
/// to one another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseRegion {
    pub center_id: String,
    pub neighborhood_size: usize,
    /// Fraction of possible edges among the neighbors that exist, in [0, 1].
    pub density: f64,
}

/// Ranking method for related-entity recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationMethod {
    /// Jaccard overlap of 1-hop neighborhoods ("collaborative").
    NeighborhoodOverlap,
    /// Shared community membership, ranked by connectivity.
    SharedCommunity,
}

impl std::fmt::Display for RecommendationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeighborhoodOverlap => write!(f, "neighborhood_overlap"),
            Self::SharedCommunity => write!(f, "shared_community"),
        }
    }
}

/// One ranked recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub entity_id: String,
    pub score: f64,
    pub method: RecommendationMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_display_names() {
        assert_eq!(CentralityMetric::Degree.to_string(), "degree");
        assert_eq!(CentralityMetric::Betweenness.to_string(), "betweenness");
        assert_eq!(CentralityMetric::Closeness.to_string(), "closeness");
        assert_eq!(CentralityMetric::Eigenvector.to_string(), "eigenvector");
    }

    #[test]
    fn test_pagerank_defaults() {
        let config = PageRankConfig::default();
        assert!((config.damping - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 20);
        assert!((config.tolerance - 1e-4).abs() < f64::EPSILON);
    }
}
