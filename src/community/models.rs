//! Community detection data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partitioning algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommunityAlgorithm {
    #[default]
    Louvain,
    LabelPropagation,
}

impl std::fmt::Display for CommunityAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Louvain => write!(f, "louvain"),
            Self::LabelPropagation => write!(f, "labelPropagation"),
        }
    }
}

/// Which backend produced a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionBackend {
    /// The store's graph-algorithms extension.
    Native,
    /// The in-process petgraph fallback.
    InProcess,
}

/// Tuning for a detection run.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    pub algorithm: CommunityAlgorithm,
    /// Partition granularity; higher produces more, smaller communities.
    pub resolution: f64,
    /// Partitions smaller than this are dropped from the result set.
    pub min_community_size: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            algorithm: CommunityAlgorithm::Louvain,
            resolution: 1.0,
            min_community_size: 2,
        }
    }
}

/// One detected community. Labels arrive in a separate stage; a freshly
/// detected community has `label == None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: u32,
    pub members: Vec<String>,
    pub size: usize,
    /// This community's contribution to the partition's modularity.
    pub modularity: f64,
    pub label: Option<String>,
    pub description: Option<String>,
    pub algorithm: CommunityAlgorithm,
    pub backend: DetectionBackend,
}

impl Community {
    /// Display label, falling back to the generic form.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("Community {}", self.id))
    }
}

/// Detector lifecycle: `Uninitialized → Detecting → Detected → Labeling →
/// Labeled`. A failed run returns the phase to its previous resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DetectionPhase {
    #[default]
    Uninitialized,
    Detecting,
    Detected,
    Labeling,
    Labeled,
}

/// Complete result of one detection run. A new run wholesale-replaces the
/// previous one; there is no incremental update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub communities: Vec<Community>,
    /// Overall partition modularity (all communities, pre-filter).
    pub modularity: f64,
    pub backend: DetectionBackend,
    pub algorithm: CommunityAlgorithm,
    pub detected_at: DateTime<Utc>,
}

impl DetectionResult {
    /// Every member across all (post-filter) communities.
    pub fn covered_entities(&self) -> usize {
        self.communities.iter().map(|c| c.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_fallback() {
        let community = Community {
            id: 3,
            members: vec!["a".into()],
            size: 1,
            modularity: 0.0,
            label: None,
            description: None,
            algorithm: CommunityAlgorithm::Louvain,
            backend: DetectionBackend::InProcess,
        };
        assert_eq!(community.display_label(), "Community 3");
    }

    #[test]
    fn test_algorithm_display_matches_gds_names() {
        assert_eq!(CommunityAlgorithm::Louvain.to_string(), "louvain");
        assert_eq!(
            CommunityAlgorithm::LabelPropagation.to_string(),
            "labelPropagation"
        );
    }

    #[test]
    fn test_default_params() {
        let params = DetectionParams::default();
        assert_eq!(params.algorithm, CommunityAlgorithm::Louvain);
        assert!((params.resolution - 1.0).abs() < f64::EPSILON);
        assert_eq!(params.min_community_size, 2);
    }
}
