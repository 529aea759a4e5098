//! Cache Statistics Module
//!
//! Tracks cache activity counters and the storage usage snapshot.

use serde::Serialize;

// == Cache Stats ==
/// Running counters of cache activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of retrievals that returned nothing
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Number of entries dropped because their payload was unreadable
    pub corrupt_removals: u64,
    /// Number of forced cleanups after a failed write
    pub forced_cleanups: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_corrupt_removal(&mut self) {
        self.corrupt_removals += 1;
    }

    pub fn record_forced_cleanup(&mut self) {
        self.forced_cleanups += 1;
    }
}

// == Storage Info ==
/// Read-only snapshot of the byte budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    /// Bytes currently tracked
    pub current_size: u64,
    /// Byte budget
    pub max_size: u64,
    /// current_size / max_size * 100
    pub usage_percentage: f64,
    /// Number of tracked entries
    pub item_count: usize,
}

impl StorageInfo {
    pub fn new(current_size: u64, max_size: u64, item_count: usize) -> Self {
        let usage_percentage = if max_size == 0 {
            0.0
        } else {
            current_size as f64 / max_size as f64 * 100.0
        };
        Self {
            current_size,
            max_size,
            usage_percentage,
            item_count,
        }
    }
}
