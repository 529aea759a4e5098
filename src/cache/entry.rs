//! Cache Entry Module
//!
//! Per-entry metadata tracked by the index and the access clock that stamps it.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// Index metadata for one cached value.
///
/// The serialized payload itself lives in the backing store under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Size of the serialized payload in bytes
    pub size: u64,
    /// Last read or write (Unix milliseconds, strictly increasing per cache)
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(size: u64, timestamp: i64) -> Self {
        Self { size, timestamp }
    }

    // == Touch ==
    /// Records an access at `timestamp`.
    pub fn touch(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }
}

// == Access Clock ==
/// Wall-clock milliseconds forced to be strictly increasing.
///
/// Two operations in the same millisecond still get distinct timestamps, so
/// LRU order is total.
#[derive(Debug, Default, Clone)]
pub struct AccessClock {
    last: i64,
}

impl AccessClock {
    /// Starts the clock after `last`, typically the newest persisted timestamp.
    pub fn starting_after(last: i64) -> Self {
        Self { last }
    }

    // == Tick ==
    /// Returns the next timestamp.
    pub fn tick(&mut self) -> i64 {
        let now = current_timestamp_ms();
        self.last = if now > self.last {
            now
        } else {
            self.last.saturating_add(1)
        };
        self.last
    }

    pub fn last(&self) -> i64 {
        self.last
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
