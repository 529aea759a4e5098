//! Shared Cache Handle
//!
//! Async, clonable handle that serializes access to one [`BoundedCache`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::cache::{BackingStore, BoundedCache, CacheConfig, CacheStats, StorageInfo};

/// Thread-safe cache handle.
///
/// Every operation holds the lock for its whole read-compute-evict-write
/// sequence, so concurrent callers never evict against a stale size.
#[derive(Debug)]
pub struct SharedCache<S> {
    inner: Arc<Mutex<BoundedCache<S>>>,
}

impl<S> Clone for SharedCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: BackingStore> SharedCache<S> {
    pub fn new(cache: BoundedCache<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Opens a cache over `store` and wraps it.
    pub fn open(store: S, config: CacheConfig) -> Self {
        Self::new(BoundedCache::open(store, config))
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.inner.lock().await.set(key, value);
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.lock().await.get(key)
    }

    pub async fn remove(&self, key: &str) {
        self.inner.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    pub async fn storage_info(&self) -> StorageInfo {
        self.inner.lock().await.storage_info()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats()
    }

    /// Locks the cache for a sequence of operations.
    pub async fn lock(&self) -> MutexGuard<'_, BoundedCache<S>> {
        self.inner.lock().await
    }
}
