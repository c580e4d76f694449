//! Bounded-concurrency batch query execution.
//!
//! Runs N queries concurrently against the store, bounded by a counting
//! semaphore. The contract callers rely on: the output vector preserves
//! input order regardless of completion order, and each query fails
//! independently — slot `i` holds an error marker while every other slot
//! holds its result, so callers can correlate failures to input position.
//!
//! Store errors are retried per-slot with bounded doubling backoff;
//! timeouts surface immediately (a query that exceeded its deadline once is
//! not made cheaper by asking again).

use crate::query::builder::CypherQuery;
use crate::query::cache::QueryCache;
use crate::store::models::Row;
use crate::store::traits::GraphStore;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Per-slot failure marker.
#[derive(Debug, Error)]
pub enum BatchQueryError {
    /// The query exceeded the per-query deadline. Not retried.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The store failed the query on every attempt.
    #[error("store error after {attempts} attempt(s): {cause}")]
    Store { attempts: u32, cause: anyhow::Error },
}

/// Tuning for [`BatchExecutor`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    pub query_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Executes batches of queries with bounded parallelism.
pub struct BatchExecutor {
    store: Arc<dyn GraphStore>,
    cache: Option<Arc<QueryCache>>,
    semaphore: Arc<Semaphore>,
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn GraphStore>, config: BatchConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            store,
            cache: None,
            semaphore,
            config,
        }
    }

    /// Consult and populate the shared query cache around each slot.
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Execute all queries concurrently. The output preserves input order;
    /// slot `i` is `Err` iff query `i` failed.
    pub async fn execute_batch(
        &self,
        queries: &[CypherQuery],
    ) -> Vec<Result<Vec<Row>, BatchQueryError>> {
        let futures = queries.iter().map(|query| self.execute_one(query));
        join_all(futures).await
    }

    async fn execute_one(&self, query: &CypherQuery) -> Result<Vec<Row>, BatchQueryError> {
        // Cache hits bypass the store and do not consume a permit.
        if let Some(cache) = &self.cache {
            if let Some(rows) = cache.get(query) {
                return Ok(rows);
            }
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("batch semaphore closed");

        let mut attempts = 0u32;
        let mut backoff = self.config.retry_backoff;
        loop {
            attempts += 1;
            let outcome =
                tokio::time::timeout(self.config.query_timeout, self.store.execute(query)).await;

            match outcome {
                Err(_elapsed) => {
                    return Err(BatchQueryError::Timeout(self.config.query_timeout));
                }
                Ok(Ok(rows)) => {
                    if let Some(cache) = &self.cache {
                        cache.set(query, rows.clone());
                    }
                    return Ok(rows);
                }
                Ok(Err(cause)) => {
                    if attempts > self.config.max_retries {
                        return Err(BatchQueryError::Store { attempts, cause });
                    }
                    tracing::debug!(
                        attempt = attempts,
                        "batch query failed, retrying in {backoff:?}: {cause}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
}
