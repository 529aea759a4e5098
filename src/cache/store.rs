//! Cache Store Module
//!
//! Main cache engine: serialized payloads in a backing store, size and
//! recency metadata in a persisted index, LRU eviction under a byte budget.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{
    AccessClock, BackingStore, CacheEntry, CacheIndex, CacheStats, StorageInfo,
    DEFAULT_MAX_STORAGE_SIZE, DEFAULT_METADATA_KEY,
};
use crate::error::{CacheError, Result};

// == Cache Config ==
/// Options for a [`BoundedCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Byte budget for all payloads together
    pub max_storage_size: u64,
    /// Backing store key holding the persisted index
    pub metadata_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_storage_size: DEFAULT_MAX_STORAGE_SIZE,
            metadata_key: DEFAULT_METADATA_KEY.to_string(),
        }
    }
}

// == Bounded Cache ==
/// Persistent key/value cache with a hard byte budget and LRU eviction.
///
/// Failures inside the cache never reach the caller: a failed read is a miss,
/// a failed write leaves nothing cached for that key.
#[derive(Debug)]
pub struct BoundedCache<S> {
    /// Where serialized payloads and the index record live
    store: S,
    /// Size and recency metadata, mirrored to `config.metadata_key`
    index: CacheIndex,
    clock: AccessClock,
    stats: CacheStats,
    config: CacheConfig,
}

impl<S: BackingStore> BoundedCache<S> {
    // == Constructor ==
    /// Opens a cache over `store` with default options.
    pub fn new(store: S) -> Self {
        Self::open(store, CacheConfig::default())
    }

    /// Opens a cache over `store`, restoring the persisted index.
    ///
    /// A missing index starts empty. An unreadable one is discarded and the
    /// cache starts empty as well. Entries beyond the configured budget (it
    /// may have shrunk since the index was written) are evicted oldest first.
    pub fn open(mut store: S, config: CacheConfig) -> Self {
        let index = match store.read(&config.metadata_key) {
            Ok(Some(bytes)) => match CacheIndex::from_bytes(&bytes) {
                Some(index) => index,
                None => {
                    warn!(key = %config.metadata_key, "Cache index is corrupt, starting empty");
                    if let Err(e) = store.delete(&config.metadata_key) {
                        warn!(error = %e, "Failed to remove corrupt cache index");
                    }
                    CacheIndex::new()
                }
            },
            Ok(None) => CacheIndex::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read cache index, starting empty");
                CacheIndex::new()
            }
        };

        debug!(
            entries = index.len(),
            bytes = index.current_size(),
            "Cache index loaded"
        );

        let mut cache = Self {
            clock: AccessClock::starting_after(index.max_timestamp()),
            store,
            index,
            stats: CacheStats::new(),
            config,
        };
        cache.trim_to_budget();
        cache
    }

    // == Set ==
    /// Stores `value` under `key`, evicting least recently used entries if
    /// the budget requires it.
    ///
    /// If the value cannot be stored (it alone exceeds the budget, or the
    /// backing store rejects the write) the oldest half of the entries is
    /// cleared and nothing is cached for `key`.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match self.try_set(key, value) {
            Ok(()) => {}
            Err(e @ (CacheError::InvalidKey(_) | CacheError::Serialization(_))) => {
                warn!(key, error = %e, "Value not cached");
            }
            Err(e) => {
                warn!(key, error = %e, "Cache write failed, forcing cleanup");
                self.discard(key);
                self.force_cleanup();
            }
        }
    }

    fn try_set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        self.check_key(key)?;

        let payload = serde_json::to_vec(value)?;
        let size = payload.len() as u64;

        self.evict_for(key, size);

        let reclaimable = self.index.get(key).map(|e| e.size).unwrap_or(0);
        if self.index.current_size() - reclaimable + size > self.config.max_storage_size {
            return Err(CacheError::QuotaExceeded(format!(
                "{} bytes do not fit in a budget of {} bytes",
                size, self.config.max_storage_size
            )));
        }

        self.store.write(key, &payload)?;

        let timestamp = self.clock.tick();
        self.index
            .insert(key.to_string(), CacheEntry::new(size, timestamp));
        self.persist_index();

        debug!(key, size, total = self.index.current_size(), "Cache set");
        Ok(())
    }

    // == Get ==
    /// Returns the value stored under `key`.
    ///
    /// An entry whose payload is missing or does not deserialize into `T` is
    /// removed and reported as a miss.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        if self.check_key(key).is_err() || !self.index.contains(key) {
            self.stats.record_miss();
            debug!(key, "Cache miss");
            return None;
        }

        match self.load(key) {
            Ok(value) => {
                let timestamp = self.clock.tick();
                self.index.touch(key, timestamp);
                self.persist_index();
                self.stats.record_hit();
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Dropping unreadable cache entry");
                self.discard(key);
                self.persist_index();
                self.stats.record_corrupt_removal();
                self.stats.record_miss();
                None
            }
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .store
            .read(key)?
            .ok_or_else(|| CacheError::CorruptEntry(format!("payload for '{}' is missing", key)))?;
        serde_json::from_slice(&bytes).map_err(|e| CacheError::CorruptEntry(e.to_string()))
    }

    // == Remove ==
    /// Removes `key`. Absent keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if self.check_key(key).is_err() {
            return;
        }
        if self.index.remove(key).is_some() {
            self.persist_index();
        }
        if let Err(e) = self.store.delete(key) {
            warn!(key, error = %e, "Failed to delete cache payload");
        }
    }

    // == Clear ==
    /// Removes every tracked entry and the persisted index.
    pub fn clear(&mut self) {
        for key in self.index.keys() {
            if let Err(e) = self.store.delete(&key) {
                warn!(key = %key, error = %e, "Failed to delete cache payload");
            }
        }
        self.index.clear();
        if let Err(e) = self.store.delete(&self.config.metadata_key) {
            warn!(error = %e, "Failed to delete cache index");
        }
        info!("Cache cleared");
    }

    // == Storage Info ==
    /// Snapshot of budget usage.
    pub fn storage_info(&self) -> StorageInfo {
        StorageInfo::new(
            self.index.current_size(),
            self.config.max_storage_size,
            self.index.len(),
        )
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The backing store.
    pub fn backing(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store, bypassing the index.
    pub fn backing_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // == Eviction ==
    /// Evicts least recently used entries until `required` more bytes fit.
    ///
    /// `protected` is the key being written: its current size counts as free
    /// and it is never chosen as a victim. Stops quietly when nothing is
    /// left to evict.
    fn evict_for(&mut self, protected: &str, required: u64) -> usize {
        let max = self.config.max_storage_size;
        let reclaimable = self.index.get(protected).map(|e| e.size).unwrap_or(0);
        let fits = |index: &CacheIndex| index.current_size() - reclaimable + required <= max;

        if fits(&self.index) {
            return 0;
        }

        let mut evicted = 0;
        for (key, entry) in self.index.oldest_first() {
            if key == protected {
                continue;
            }
            self.discard(&key);
            self.stats.record_eviction();
            evicted += 1;
            debug!(key = %key, size = entry.size, "Evicted least recently used entry");

            if fits(&self.index) {
                break;
            }
        }
        evicted
    }

    /// Evicts least recently used entries until the index fits the budget.
    fn trim_to_budget(&mut self) {
        let max = self.config.max_storage_size;
        if self.index.current_size() <= max {
            return;
        }

        let mut evicted = 0;
        for (key, _) in self.index.oldest_first() {
            if self.index.current_size() <= max {
                break;
            }
            self.discard(&key);
            self.stats.record_eviction();
            evicted += 1;
        }
        self.persist_index();
        info!(
            evicted,
            bytes = self.index.current_size(),
            max,
            "Trimmed cache index to budget"
        );
    }

    // == Forced Cleanup ==
    /// Deletes the oldest half of the tracked entries.
    fn force_cleanup(&mut self) {
        let items = self.index.oldest_first();
        let victims = items.len() / 2;
        for (key, _) in items.into_iter().take(victims) {
            self.discard(&key);
        }
        self.stats.record_forced_cleanup();
        self.persist_index();
        info!(removed = victims, remaining = self.index.len(), "Forced cache cleanup");
    }

    /// Drops `key` from the index and the backing store without persisting.
    fn discard(&mut self, key: &str) {
        self.index.remove(key);
        if let Err(e) = self.store.delete(key) {
            warn!(key, error = %e, "Failed to delete cache payload");
        }
    }

    fn persist_index(&mut self) {
        let bytes = match self.index.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode cache index");
                return;
            }
        };
        if let Err(e) = self.store.write(&self.config.metadata_key, &bytes) {
            warn!(error = %e, "Failed to persist cache index");
        }
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if key == self.config.metadata_key {
            return Err(CacheError::InvalidKey(format!(
                "'{}' is reserved for the cache index",
                key
            )));
        }
        Ok(())
    }
}
