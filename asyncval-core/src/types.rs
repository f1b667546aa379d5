//! Statistics reported by the cache engine.

use serde::{Deserialize, Serialize};

/// Point-in-time cache statistics.
///
/// Entry counts describe the map when the snapshot was taken; the request and
/// removal counters are cumulative since the engine was created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently installed
    pub total_entries: usize,
    /// Installed entries whose TTL has passed but that no pass has swept yet
    pub expired_entries: usize,
    /// Installed entries still within their TTL
    pub valid_entries: usize,
    /// Configured capacity bound
    pub capacity: usize,
    /// Calls served by an already-installed entry
    pub hits: u64,
    /// Calls that installed a new entry
    pub misses: u64,
    /// Entries removed by the expiry phase
    pub expirations: u64,
    /// Entries removed by the capacity phase
    pub evictions: u64,
}

impl CacheStats {
    /// Calculates hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Returns total requests (hits + misses).
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}
