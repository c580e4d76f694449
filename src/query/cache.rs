//! LRU + TTL query result cache.
//!
//! Keyed by the (query text, parameters) fingerprint. An entry is evictable
//! either by capacity pressure (least-recently-used) or by age exceeding the
//! TTL, whichever triggers first: `get` treats an expired entry as a miss
//! and evicts it in place.
//!
//! Staleness is not otherwise bounded, so callers must invalidate on graph
//! mutation — either the targeted [`QueryCache::invalidate`] (substring
//! match on query text, conservative) or the blanket [`QueryCache::clear`]
//! used after any write.
//!
//! Side effects are confined to the in-memory structure: no I/O, no async.
//! Interior locking makes the cache shareable behind a plain `Arc`.

use crate::query::builder::CypherQuery;
use crate::store::models::Row;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    query_text: String,
    rows: Vec<Row>,
    inserted_at: Instant,
}

/// Hit/miss counters and current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in [0, 1]; 0 when the cache has never been read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe LRU+TTL cache for query results.
pub struct QueryCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    /// Look up cached rows. Expired entries are evicted and count as misses.
    pub fn get(&self, query: &CypherQuery) -> Option<Vec<Row>> {
        let key = query.fingerprint();
        let mut cache = self.inner.lock().expect("query cache poisoned");

        let expired = match cache.get(&key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            cache.pop(&key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        cache.get(&key).map(|entry| entry.rows.clone())
    }

    /// Insert rows for a query. At capacity, the least-recently-used entry
    /// is evicted first.
    pub fn set(&self, query: &CypherQuery, rows: Vec<Row>) {
        let entry = CacheEntry {
            query_text: query.text.clone(),
            rows,
            inserted_at: Instant::now(),
        };
        let mut cache = self.inner.lock().expect("query cache poisoned");
        cache.put(query.fingerprint(), entry);
    }

    /// Remove every entry whose query text contains `pattern`.
    /// Conservative: may over-invalidate. Returns the number removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut cache = self.inner.lock().expect("query cache poisoned");
        let keys: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.query_text.contains(pattern))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            cache.pop(key);
        }
        keys.len()
    }

    /// Drop everything. Used after any graph write.
    pub fn clear(&self) {
        self.inner.lock().expect("query cache poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("query cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
