//! Cache Module
//!
//! Size-bounded persistent key/value cache with LRU eviction.

mod backing;
mod entry;
mod lru;
mod shared;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backing::{BackingStore, FileStore, MemoryStore};
pub use entry::{current_timestamp_ms, AccessClock, CacheEntry};
pub use lru::CacheIndex;
pub use shared::SharedCache;
pub use stats::{CacheStats, StorageInfo};
pub use store::{BoundedCache, CacheConfig};

// == Public Constants ==
/// Default byte budget for cached payloads
pub const DEFAULT_MAX_STORAGE_SIZE: u64 = 5 * 1024 * 1024; // 5 MiB

/// Default backing store key of the persisted index
pub const DEFAULT_METADATA_KEY: &str = "__resilient_cache_lru_metadata";
