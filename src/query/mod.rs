//! Query construction, caching, and batched execution.
//!
//! - [`builder`] — fluent, injection-safe Cypher construction
//! - [`templates`] — named catalog of common query shapes with normalized
//!   `{nodes, edges}` / scalar results
//! - [`cache`] — LRU+TTL result cache with hit/miss counters
//! - [`batch`] — bounded-concurrency, order-preserving batch execution

pub mod batch;
pub mod builder;
pub mod cache;
pub mod templates;

pub use batch::{BatchConfig, BatchExecutor, BatchQueryError};
pub use builder::{CypherQuery, QueryBuildError, QueryBuilder, SortOrder};
pub use cache::{CacheStats, QueryCache};
pub use templates::{GraphPayload, PayloadEdge, PayloadNode};
