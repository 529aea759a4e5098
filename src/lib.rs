//! Resilient Cache - client-side resilience layer
//!
//! Provides a size-bounded persistent LRU cache and an HTTP fetcher with
//! jittered exponential backoff.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;

pub use cache::{BoundedCache, CacheConfig, FileStore, MemoryStore, SharedCache};
pub use config::Config;
pub use error::{AttemptFailure, FetchError};
pub use fetch::{FetchRequest, ResilientFetcher, RetryConfig};
