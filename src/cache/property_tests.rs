//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check budget, recency and round-trip behavior over
//! arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{BackingStore, BoundedCache, CacheConfig, MemoryStore, DEFAULT_METADATA_KEY};

// == Test Configuration ==
const TEST_BUDGET: u64 = 512;

fn cache_with_budget(max: u64) -> BoundedCache<MemoryStore> {
    BoundedCache::open(
        MemoryStore::new(),
        CacheConfig {
            max_storage_size: max,
            ..CacheConfig::default()
        },
    )
}

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

/// Generates values including multi-byte characters, sometimes over budget
fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,64}",
        "[é日本語ü]{0,40}",
        "[x]{500,600}",
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Sum of tracked sizes never exceeds the budget after any operation, and
    // every tracked key has a payload in the backing store.
    #[test]
    fn prop_capacity_invariant(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut cache = cache_with_budget(TEST_BUDGET);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(&key, &value),
                CacheOp::Get { key } => { let _ = cache.get::<String>(&key); }
                CacheOp::Remove { key } => cache.remove(&key),
            }

            let info = cache.storage_info();
            prop_assert!(
                info.current_size <= TEST_BUDGET,
                "Tracked size {} exceeds budget {}",
                info.current_size,
                TEST_BUDGET
            );
            let payloads = cache.backing().len()
                - usize::from(cache.backing().contains(DEFAULT_METADATA_KEY));
            prop_assert_eq!(payloads, info.item_count, "Index and store disagree");
        }
    }

    // A value read back without intervening eviction equals what was stored.
    #[test]
    fn prop_roundtrip(key in key_strategy(), value in "[a-zA-Z0-9 é日本]{0,100}") {
        let mut cache = cache_with_budget(TEST_BUDGET);

        cache.set(&key, &value);

        prop_assert_eq!(cache.get::<String>(&key), Some(value));
    }

    // Every value still cached reads back as the latest value written for it.
    #[test]
    fn prop_latest_write_wins(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut cache = cache_with_budget(TEST_BUDGET);
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(&key, &value);
                    model.insert(key, value);
                }
                CacheOp::Get { .. } => {}
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    model.remove(&key);
                }
            }
        }

        for (key, value) in model {
            if cache.contains(&key) {
                prop_assert_eq!(cache.get::<String>(&key), Some(value));
            }
        }
    }

    // When one eviction is enough, the least recently accessed entry goes.
    #[test]
    fn prop_lru_evicts_least_recent(
        count in 3usize..8,
        touched in prop::collection::vec(0usize..8, 0..6)
    ) {
        // Each value serializes to exactly 10 bytes
        let budget = 10 * count as u64;
        let mut cache = cache_with_budget(budget);
        let keys: Vec<String> = (0..count).map(|i| format!("k{}", i)).collect();
        let mut recency: Vec<String> = Vec::new();

        for key in &keys {
            cache.set(key, "xxxxxxxx");
            recency.push(key.clone());
        }
        for i in touched.into_iter().filter(|i| *i < count) {
            let key = keys[i].clone();
            prop_assert!(cache.get::<String>(&key).is_some());
            recency.retain(|k| k != &key);
            recency.push(key);
        }

        cache.set("new", "yyyyyyyy");

        prop_assert_eq!(cache.len(), count);
        prop_assert!(!cache.contains(&recency[0]), "{} should be evicted", recency[0]);
        for key in &recency[1..] {
            prop_assert!(cache.contains(key), "{} should survive", key);
        }
    }
}

// Corruption handling with fewer cases
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_corrupt_payload_is_a_miss(
        key in key_strategy(),
        garbage in prop::collection::vec(any::<u8>(), 0..32)
    ) {
        // Anything that is not a JSON string must read as corrupt
        prop_assume!(serde_json::from_slice::<String>(&garbage).is_err());

        let mut cache = cache_with_budget(TEST_BUDGET);
        cache.set(&key, "original");
        cache.backing_mut().write(&key, &garbage).unwrap();

        prop_assert_eq!(cache.get::<String>(&key), None);
        prop_assert!(!cache.contains(&key));
        prop_assert_eq!(cache.get::<String>(&key), None);
        prop_assert_eq!(cache.storage_info().current_size, 0);
    }
}
