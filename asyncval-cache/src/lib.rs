//! # asyncval Cache
//!
//! An in-process memoizing cache for values produced by asynchronous computations.
//!
//! ## Features
//!
//! - **Request Coalescing**: Concurrent callers for the same key share one computation
//! - **TTL**: Each entry expires a fixed time after creation
//! - **Capacity Bound**: Least-recently-used entries are evicted past `max_items`
//! - **Batched Maintenance**: Expiry and eviction run on demand or on a timer
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use asyncval_cache::AsyncValueCache;
//!
//! let cache: AsyncValueCache<String, u64, String> = AsyncValueCache::new();
//!
//! // The producer runs once; later calls are served from the cache
//! let value = cache
//!     .get_or_add_with_ttl("answer".to_string(), |_| async { Ok(42) }, Duration::from_secs(60))
//!     .await?;
//!
//! // Sweep expired and surplus entries
//! cache.handle_expiration();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod entry;
mod timer;

pub use cache::AsyncValueCache;
pub use entry::Entry;
pub use timer::ExpirationTimer;

pub use asyncval_core::{CacheConfig, CacheError, CacheStats, ExpirationHandler};

// Unit tests drive the clock with `tokio::time::pause`.
#[cfg(test)]
pub(crate) use tokio::time;

#[cfg(not(test))]
pub(crate) use std::time;
