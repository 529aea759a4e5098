//! LRU Index Module
//!
//! Tracks size and last-access metadata for every cached key and yields the
//! least-recently-used eviction order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

/// Latest access time a persisted entry may carry (9999-12-31T23:59:59.999Z)
const MAX_PERSISTED_TIMESTAMP_MS: i64 = 253_402_300_799_999;

// == Persisted Form ==
/// On-disk layout of the index side record.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexRecord {
    #[serde(default)]
    current_size: u64,
    #[serde(default)]
    cache_items: HashMap<String, CacheEntry>,
}

// == Cache Index ==
/// Key to metadata map plus the running byte total.
///
/// `current_size` always equals the sum of `size` over all tracked entries.
#[derive(Debug, Default, Clone)]
pub struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
    current_size: u64,
}

impl CacheIndex {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Decode ==
    /// Rebuilds an index from its persisted bytes.
    ///
    /// Returns None when the record cannot be parsed, when its sizes do not
    /// sum within `u64`, or when a timestamp lies past year 9999. The stored
    /// total is ignored and recomputed from the entries.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let record: IndexRecord = serde_json::from_slice(bytes).ok()?;
        if record
            .cache_items
            .values()
            .any(|e| e.timestamp > MAX_PERSISTED_TIMESTAMP_MS)
        {
            return None;
        }
        let current_size = record
            .cache_items
            .values()
            .try_fold(0u64, |total, e| total.checked_add(e.size))?;
        Some(Self {
            entries: record.cache_items,
            current_size,
        })
    }

    // == Encode ==
    /// Serializes the index for persistence.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct IndexRecordRef<'a> {
            current_size: u64,
            cache_items: &'a HashMap<String, CacheEntry>,
        }

        serde_json::to_vec(&IndexRecordRef {
            current_size: self.current_size,
            cache_items: &self.entries,
        })
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Insert ==
    /// Tracks `key`, replacing and returning any previous metadata.
    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        self.current_size += entry.size;
        let previous = self.entries.insert(key, entry);
        if let Some(old) = previous {
            self.current_size -= old.size;
        }
        previous
    }

    // == Remove ==
    /// Stops tracking `key`.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        if let Some(entry) = removed {
            self.current_size -= entry.size;
        }
        removed
    }

    // == Touch ==
    /// Refreshes the access timestamp. Returns false if `key` is not tracked.
    pub fn touch(&mut self, key: &str, timestamp: i64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(timestamp);
                true
            }
            None => false,
        }
    }

    // == LRU Order ==
    /// Returns tracked keys with their metadata, least recently used first.
    ///
    /// Ties on timestamp are broken by key so the order is deterministic.
    pub fn oldest_first(&self) -> Vec<(String, CacheEntry)> {
        let mut items: Vec<(String, CacheEntry)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), *e))
            .collect();
        items.sort_by(|(ka, a), (kb, b)| a.timestamp.cmp(&b.timestamp).then_with(|| ka.cmp(kb)));
        items
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Newest timestamp in the index, or 0 when empty.
    pub fn max_timestamp(&self) -> i64 {
        self.entries.values().map(|e| e.timestamp).max().unwrap_or(0)
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(items: &[(&str, u64, i64)]) -> CacheIndex {
        let mut index = CacheIndex::new();
        for (key, size, ts) in items {
            index.insert(key.to_string(), CacheEntry::new(*size, *ts));
        }
        index
    }

    #[test]
    fn test_index_new() {
        let index = CacheIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.current_size(), 0);
    }

    #[test]
    fn test_index_insert_tracks_size() {
        let index = index_with(&[("a", 10, 1), ("b", 20, 2)]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.current_size(), 30);
    }

    #[test]
    fn test_index_replace_adjusts_size() {
        let mut index = index_with(&[("a", 10, 1)]);

        let previous = index.insert("a".to_string(), CacheEntry::new(4, 2));

        assert_eq!(previous, Some(CacheEntry::new(10, 1)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.current_size(), 4);
    }

    #[test]
    fn test_index_remove() {
        let mut index = index_with(&[("a", 10, 1), ("b", 20, 2)]);

        assert!(index.remove("a").is_some());
        assert!(index.remove("a").is_none());
        assert_eq!(index.current_size(), 20);
        assert!(!index.contains("a"));
    }

    #[test]
    fn test_oldest_first_orders_by_timestamp() {
        let index = index_with(&[("c", 1, 30), ("a", 1, 10), ("b", 1, 20)]);

        let order: Vec<String> = index.oldest_first().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_touch_moves_key_to_back() {
        let mut index = index_with(&[("a", 1, 10), ("b", 1, 20), ("c", 1, 30)]);

        assert!(index.touch("a", 40));
        assert!(!index.touch("missing", 50));

        let order: Vec<String> = index.oldest_first().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_timestamp_ties_broken_by_key() {
        let index = index_with(&[("z", 1, 5), ("m", 1, 5), ("a", 1, 5)]);

        let order: Vec<String> = index.oldest_first().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_bytes_recompute_size() {
        let index = index_with(&[("a", 3, 1), ("b", 5, 2)]);
        let bytes = index.to_bytes().unwrap();

        let restored = CacheIndex::from_bytes(&bytes).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.current_size(), 8);
        assert_eq!(restored.get("b"), Some(&CacheEntry::new(5, 2)));
        assert_eq!(restored.max_timestamp(), 2);
    }

    #[test]
    fn test_from_bytes_ignores_stale_total() {
        let raw = br#"{"currentSize":999,"cacheItems":{"k":{"size":7,"timestamp":3}}}"#;
        let index = CacheIndex::from_bytes(raw).unwrap();
        assert_eq!(index.current_size(), 7);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(CacheIndex::from_bytes(b"not json").is_none());
        assert!(CacheIndex::from_bytes(br#"{"cacheItems":{"k":"oops"}}"#).is_none());
    }

    #[test]
    fn test_from_bytes_rejects_size_overflow() {
        let raw = serde_json::json!({
            "cacheItems": {
                "a": { "size": u64::MAX, "timestamp": 1 },
                "b": { "size": 1, "timestamp": 2 }
            }
        })
        .to_string();
        assert!(CacheIndex::from_bytes(raw.as_bytes()).is_none());
    }

    #[test]
    fn test_from_bytes_rejects_far_future_timestamp() {
        let raw = serde_json::json!({
            "cacheItems": { "a": { "size": 1, "timestamp": i64::MAX } }
        })
        .to_string();
        assert!(CacheIndex::from_bytes(raw.as_bytes()).is_none());

        let edge = serde_json::json!({
            "cacheItems": { "a": { "size": 1, "timestamp": MAX_PERSISTED_TIMESTAMP_MS } }
        })
        .to_string();
        assert!(CacheIndex::from_bytes(edge.as_bytes()).is_some());
    }

    #[test]
    fn test_clear() {
        let mut index = index_with(&[("a", 3, 1)]);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.current_size(), 0);
        assert_eq!(index.max_timestamp(), 0);
    }
}
