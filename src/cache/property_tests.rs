//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check byte accounting and eviction order against a
//! straightforward vector model of the cache.

use proptest::prelude::*;

use crate::cache::CacheStore;

// == Test Configuration ==
const TEST_MAX_BYTES: usize = 32;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..16)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: Vec<u8> },
    PutIfAbsent { key: String, value: Vec<u8> },
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        1 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::PutIfAbsent { key, value }),
        1 => (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Model ==
/// Records ordered oldest first; eviction always takes index 0.
#[derive(Debug, Default)]
struct Model {
    entries: Vec<(String, Vec<u8>)>,
}

impl Model {
    fn used(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn touch(&mut self, pos: usize) -> usize {
        let entry = self.entries.remove(pos);
        self.entries.push(entry);
        self.entries.len() - 1
    }

    fn write(&mut self, key: &str, value: &[u8]) {
        let size = key.len() + value.len();
        match self.position(key) {
            Some(pos) => {
                self.touch(pos);
                let old = self.entries.last().map_or(0, |(_, v)| v.len());
                while self.used() - old + value.len() > TEST_MAX_BYTES && self.entries.len() > 1 {
                    self.entries.remove(0);
                }
                if let Some(last) = self.entries.last_mut() {
                    last.1 = value.to_vec();
                }
            }
            None => {
                while self.used() + size > TEST_MAX_BYTES && !self.entries.is_empty() {
                    self.entries.remove(0);
                }
                self.entries.push((key.to_string(), value.to_vec()));
            }
        }
    }

    fn apply(&mut self, op: &CacheOp) -> bool {
        match op {
            CacheOp::Put { key, value } => {
                if key.len() + value.len() > TEST_MAX_BYTES {
                    return false;
                }
                self.write(key, value);
                true
            }
            CacheOp::PutIfAbsent { key, value } => {
                if self.position(key).is_some() || key.len() + value.len() > TEST_MAX_BYTES {
                    return false;
                }
                self.write(key, value);
                true
            }
            CacheOp::Set { key, value } => {
                if self.position(key).is_none() || key.len() + value.len() > TEST_MAX_BYTES {
                    return false;
                }
                self.write(key, value);
                true
            }
            CacheOp::Get { key } => match self.position(key) {
                Some(pos) => {
                    self.touch(pos);
                    true
                }
                None => false,
            },
            CacheOp::Delete { key } => match self.position(key) {
                Some(pos) => {
                    self.entries.remove(pos);
                    true
                }
                None => false,
            },
        }
    }
}

fn apply(store: &mut CacheStore, op: &CacheOp) -> bool {
    match op {
        CacheOp::Put { key, value } => store.put(key, value),
        CacheOp::PutIfAbsent { key, value } => store.put_if_absent(key, value),
        CacheOp::Set { key, value } => store.set(key, value),
        CacheOp::Get { key } => store.get(key).is_some(),
        CacheOp::Delete { key } => store.delete(key),
    }
}

fn snapshot(store: &CacheStore) -> Vec<(String, Vec<u8>)> {
    store
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_vec()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // Byte accounting matches the live records after every operation and
    // never exceeds the budget.
    #[test]
    fn prop_used_bytes_matches_live_entries(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut store = CacheStore::new(TEST_MAX_BYTES);

        for op in &ops {
            apply(&mut store, op);
            let live: usize = store.iter().map(|(k, v)| k.len() + v.len()).sum();
            prop_assert_eq!(store.used_bytes(), live);
            prop_assert!(store.used_bytes() <= TEST_MAX_BYTES);
            store.assert_consistent();
        }
    }

    // Results, contents and recency order agree with the model.
    #[test]
    fn prop_matches_lru_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let mut store = CacheStore::new(TEST_MAX_BYTES);
        let mut model = Model::default();

        for op in &ops {
            let expected = model.apply(op);
            let actual = apply(&mut store, op);
            prop_assert_eq!(actual, expected, "result mismatch for {:?}", op);
            prop_assert_eq!(snapshot(&store), model.entries.clone());
        }
    }

    // A record larger than the whole budget leaves the cache untouched.
    #[test]
    fn prop_oversized_record_is_noop(
        ops in prop::collection::vec(cache_op_strategy(), 0..30),
        key in key_strategy(),
    ) {
        let mut store = CacheStore::new(TEST_MAX_BYTES);
        for op in &ops {
            apply(&mut store, op);
        }
        let before = snapshot(&store);
        let used = store.used_bytes();
        let oversized = vec![b'x'; TEST_MAX_BYTES];

        prop_assert!(!store.put(&key, &oversized));
        prop_assert!(!store.put_if_absent(&key, &oversized));
        prop_assert!(!store.set(&key, &oversized));
        prop_assert_eq!(snapshot(&store), before);
        prop_assert_eq!(store.used_bytes(), used);
    }

    // A key read last survives the next eviction while older keys remain.
    #[test]
    fn prop_get_protects_from_next_eviction(
        values in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..6), 3..5),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut store = CacheStore::new(TEST_MAX_BYTES);
        let keys: Vec<String> = (0..values.len()).map(|i| format!("k{i}")).collect();
        for (key, value) in keys.iter().zip(&values) {
            prop_assert!(store.put(key, value));
        }

        let touched = &keys[pick.index(keys.len())];
        prop_assert!(store.get(touched).is_some());

        // Fill until exactly one eviction happened
        let before = store.stats().evictions;
        let mut i = 0;
        while store.stats().evictions == before {
            store.put(&format!("f{i}"), b"x");
            i += 1;
        }
        prop_assert!(store.contains(touched));
    }
}
