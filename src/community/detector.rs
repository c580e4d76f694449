//! Community detector — orchestrates backend selection, normalization, and
//! the detection lifecycle.
//!
//! Backend selection is automatic and transparent: the native backend is
//! used when the capability probe says the store supports it, and a native
//! failure silently falls back to the in-process backend. Only when the
//! fallback also fails does the caller see a single aggregate error.
//!
//! Detection can take a while on the fallback path, so the detector keeps
//! its last full result: interactive callers read [`CommunityDetector::
//! cached_result`] while a background re-run (optionally cancellable)
//! replaces it wholesale.

use super::algorithms::{partition_quality, Membership};
use super::backend::{CommunityBackend, GdsCommunityBackend, LocalCommunityBackend};
use super::labeler::CommunityLabeler;
use super::models::{
    Community, DetectionBackend, DetectionParams, DetectionPhase, DetectionResult,
};
use crate::context::GraphContext;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

pub struct CommunityDetector {
    ctx: Arc<GraphContext>,
    native: GdsCommunityBackend,
    local: LocalCommunityBackend,
    phase: RwLock<DetectionPhase>,
    last: RwLock<Option<DetectionResult>>,
}

impl CommunityDetector {
    pub fn new(ctx: Arc<GraphContext>) -> Self {
        Self {
            native: GdsCommunityBackend::new(ctx.store.clone()),
            local: LocalCommunityBackend::new(ctx.store.clone()),
            ctx,
            phase: RwLock::new(DetectionPhase::Uninitialized),
            last: RwLock::new(None),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> DetectionPhase {
        *self.phase.read().expect("detector phase poisoned")
    }

    /// Last completed detection result, if any. Interactive callers should
    /// read this rather than awaiting a fresh run.
    pub fn cached_result(&self) -> Option<DetectionResult> {
        self.last.read().expect("detector cache poisoned").clone()
    }

    /// Run detection to completion, replacing any cached result.
    pub async fn detect_communities(&self, params: DetectionParams) -> Result<DetectionResult> {
        self.detect_communities_with_cancel(params, CancellationToken::new())
            .await
    }

    /// Run detection, aborting early (with no state change beyond the phase
    /// reset) when `cancel` fires.
    pub async fn detect_communities_with_cancel(
        &self,
        params: DetectionParams,
        cancel: CancellationToken,
    ) -> Result<DetectionResult> {
        let previous_phase = self.phase();
        self.set_phase(DetectionPhase::Detecting);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(anyhow!("community detection cancelled")),
            result = self.detect_inner(&params) => result,
        };

        match outcome {
            Ok(result) => {
                self.set_phase(DetectionPhase::Detected);
                *self.last.write().expect("detector cache poisoned") = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                self.set_phase(previous_phase);
                Err(e)
            }
        }
    }

    /// Label the cached result's communities through the given labeler.
    ///
    /// Labeling failures degrade per community and never fail the call;
    /// the only error here is labeling before any detection has completed.
    pub async fn label_with(&self, labeler: &CommunityLabeler) -> Result<DetectionResult> {
        let mut result = self
            .cached_result()
            .ok_or_else(|| anyhow!("no detection result to label"))?;

        self.set_phase(DetectionPhase::Labeling);
        let names = self.member_names(&result).await;
        labeler.label_communities(&mut result.communities, &names).await;
        self.set_phase(DetectionPhase::Labeled);

        *self.last.write().expect("detector cache poisoned") = Some(result.clone());
        Ok(result)
    }

    fn set_phase(&self, phase: DetectionPhase) {
        *self.phase.write().expect("detector phase poisoned") = phase;
    }

    async fn detect_inner(&self, params: &DetectionParams) -> Result<DetectionResult> {
        let (membership, backend) = if self.ctx.gds_available().await {
            match self.native.detect_membership(params).await {
                Ok(membership) => (membership, DetectionBackend::Native),
                Err(native_err) => {
                    // Capability errors are not errors: fall back silently.
                    tracing::debug!("native detection failed, using in-process fallback: {native_err}");
                    match self.local.detect_membership(params).await {
                        Ok(membership) => (membership, DetectionBackend::InProcess),
                        Err(local_err) => {
                            return Err(anyhow!(
                                "community detection failed on both backends \
                                 (native: {native_err}; fallback: {local_err})"
                            ));
                        }
                    }
                }
            }
        } else {
            (
                self.local.detect_membership(params).await?,
                DetectionBackend::InProcess,
            )
        };

        self.normalize(membership, params, backend).await
    }

    /// Normalize a raw membership into the common result shape: modularity
    /// from the edge list, contiguous ids, size-ordered communities,
    /// singletons filtered by `min_community_size`.
    async fn normalize(
        &self,
        membership: Membership,
        params: &DetectionParams,
        backend: DetectionBackend,
    ) -> Result<DetectionResult> {
        let relationships = self.ctx.store.list_current_relationships().await?;
        let edges: Vec<(String, String, f64)> = relationships
            .iter()
            .map(|r| (r.source.clone(), r.target.clone(), r.effective_weight()))
            .collect();

        let (modularity, contributions) = partition_quality(&edges, &membership);

        let mut grouped: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (entity, community) in &membership {
            grouped.entry(*community).or_default().push(entity.clone());
        }

        let mut communities: Vec<Community> = grouped
            .into_iter()
            .filter(|(_, members)| members.len() >= params.min_community_size)
            .map(|(raw_id, mut members)| {
                members.sort();
                Community {
                    id: raw_id,
                    size: members.len(),
                    modularity: contributions.get(&raw_id).copied().unwrap_or(0.0),
                    members,
                    label: None,
                    description: None,
                    algorithm: params.algorithm,
                    backend,
                }
            })
            .collect();

        // Largest first; ties by first member for a stable order.
        communities.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.members.first().cmp(&b.members.first()))
        });
        for (i, community) in communities.iter_mut().enumerate() {
            community.id = i as u32;
        }

        Ok(DetectionResult {
            communities,
            modularity,
            backend,
            algorithm: params.algorithm,
            detected_at: Utc::now(),
        })
    }

    /// Resolve member ids to display names for the labeler, one bulk read.
    async fn member_names(
        &self,
        result: &DetectionResult,
    ) -> std::collections::HashMap<String, String> {
        match self.ctx.store.list_current_entities(None).await {
            Ok(entities) => entities
                .iter()
                .map(|e| (e.id.clone(), e.display_name().to_string()))
                .collect(),
            Err(e) => {
                tracing::warn!("could not resolve member names for labeling: {e}");
                result
                    .communities
                    .iter()
                    .flat_map(|c| c.members.iter())
                    .map(|id| (id.clone(), id.clone()))
                    .collect()
            }
        }
    }
}
