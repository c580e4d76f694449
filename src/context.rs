//! Shared context for the graph intelligence layer.
//!
//! [`GraphContext`] is the explicit dependency-injection point: the store
//! handle, the process-wide query cache, the graph-version marker, and the
//! one-shot capability determination all live here and are passed to
//! component constructors. There are no module-level singletons, so tests
//! instantiate isolated contexts without cross-test leakage.

use crate::config::GraphConfig;
use crate::query::cache::QueryCache;
use crate::store::GraphStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Process-wide shared state, read by many, written rarely.
pub struct GraphContext {
    pub store: Arc<dyn GraphStore>,
    pub query_cache: Arc<QueryCache>,
    pub config: GraphConfig,
    /// Bumped on every graph mutation; analytics cache keys include it so
    /// stale scores die with the graph state that produced them.
    graph_version: AtomicU64,
    /// Whether the store exposes the native graph-algorithms extension.
    /// Probed at most once per context.
    gds_available: OnceCell<bool>,
}

impl GraphContext {
    pub fn new(store: Arc<dyn GraphStore>, config: GraphConfig) -> Arc<Self> {
        let query_cache = Arc::new(QueryCache::new(config.cache_max_entries, config.cache_ttl));
        Arc::new(Self {
            store,
            query_cache,
            config,
            graph_version: AtomicU64::new(0),
            gds_available: OnceCell::new(),
        })
    }

    /// One-shot capability determination, cached for the context lifetime.
    pub async fn gds_available(&self) -> bool {
        *self
            .gds_available
            .get_or_init(|| async {
                let available = self.store.supports_graph_algorithms().await;
                tracing::info!(
                    backend = if available { "native" } else { "in-process" },
                    "graph-algorithms backend selected"
                );
                available
            })
            .await
    }

    /// Current graph-version marker.
    pub fn graph_version(&self) -> u64 {
        self.graph_version.load(Ordering::Acquire)
    }

    /// Record a graph mutation: bumps the version marker and clears the
    /// query cache (staleness is not otherwise bounded).
    pub fn note_graph_mutation(&self) {
        self.graph_version.fetch_add(1, Ordering::AcqRel);
        self.query_cache.clear();
    }
}
