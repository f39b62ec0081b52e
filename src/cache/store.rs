//! Cache Store Module
//!
//! Main cache engine combining a key index with the recency-ordered arena list
//! under a strict byte budget.

use std::collections::HashMap;

use tracing::trace;

use crate::cache::{CacheStats, LruList, SlotId};

// == Cache Store ==
/// Byte-bounded LRU cache.
///
/// Every live record charges `key.len() + value.len()` bytes. After each
/// successful mutation `used_bytes <= max_bytes`, and the index holds exactly
/// one slot per live record.
///
/// The store is not synchronized; share it through [`crate::cache::SharedCache`].
#[derive(Debug)]
pub struct CacheStore {
    /// Key to arena slot
    index: HashMap<String, SlotId>,
    /// Records in recency order
    list: LruList,
    /// Performance statistics
    stats: CacheStats,
    used_bytes: usize,
    max_bytes: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore that may hold at most `max_bytes` of keys and values.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            index: HashMap::new(),
            list: LruList::new(),
            stats: CacheStats::new(),
            used_bytes: 0,
            max_bytes,
        }
    }

    // == Put ==
    /// Inserts or overwrites a record.
    ///
    /// Fails without touching the cache when the record alone is larger than
    /// the whole budget. Otherwise least recently used records are evicted
    /// until the new record fits. An overwritten key is promoted first, so it
    /// is never chosen as its own victim.
    pub fn put(&mut self, key: &str, value: &[u8]) -> bool {
        if !self.fits(key, value) {
            return false;
        }
        match self.index.get(key).copied() {
            Some(id) => self.replace_value(id, value),
            None => self.insert_new(key, value),
        }
        true
    }

    // == Put If Absent ==
    /// Inserts a record only when the key is not present.
    pub fn put_if_absent(&mut self, key: &str, value: &[u8]) -> bool {
        if self.index.contains_key(key) || !self.fits(key, value) {
            return false;
        }
        self.insert_new(key, value);
        true
    }

    // == Set ==
    /// Replaces the value of an existing key; fails if the key is absent.
    pub fn set(&mut self, key: &str, value: &[u8]) -> bool {
        let Some(id) = self.index.get(key).copied() else {
            return false;
        };
        if !self.fits(key, value) {
            return false;
        }
        self.replace_value(id, value);
        true
    }

    // == Delete ==
    /// Removes a record. Returns false if the key was absent.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(id) = self.index.remove(key) else {
            return false;
        };
        if let Some(node) = self.list.remove(id) {
            self.used_bytes -= node.size();
        }
        true
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&[u8]> {
        let Some(id) = self.index.get(key).copied() else {
            self.stats.record_miss();
            return None;
        };
        self.stats.record_hit();
        self.list.move_to_back(id);
        self.list.get(id).map(|node| node.value.as_slice())
    }

    /// Checks for a key without promoting it.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.list.len(),
            used_bytes: self.used_bytes,
            max_bytes: self.max_bytes,
            ..self.stats.clone()
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn free_bytes(&self) -> usize {
        self.max_bytes - self.used_bytes
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Iterates records from least to most recently used without promoting them.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.list
            .iter()
            .map(|node| (node.key.as_str(), node.value.as_slice()))
    }

    fn fits(&self, key: &str, value: &[u8]) -> bool {
        key.len() + value.len() <= self.max_bytes
    }

    fn insert_new(&mut self, key: &str, value: &[u8]) {
        let size = key.len() + value.len();
        while self.used_bytes + size > self.max_bytes {
            if !self.evict_oldest() {
                break;
            }
        }
        let id = self.list.push_back(key.to_string(), value.to_vec());
        self.index.insert(key.to_string(), id);
        self.used_bytes += size;
    }

    fn replace_value(&mut self, id: SlotId, value: &[u8]) {
        // Promoted to the back, so it only reaches the front once it is alone.
        self.list.move_to_back(id);
        let old_len = self.list.get(id).map_or(0, |node| node.value.len());

        while self.used_bytes - old_len + value.len() > self.max_bytes {
            if self.list.front() == Some(id) || !self.evict_oldest() {
                break;
            }
        }

        if let Some(node) = self.list.get_mut(id) {
            node.value.clear();
            node.value.extend_from_slice(value);
        }
        self.used_bytes = self.used_bytes - old_len + value.len();
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, node)) = self.list.pop_front() else {
            return false;
        };
        self.index.remove(&node.key);
        self.used_bytes -= node.size();
        self.stats.record_eviction();
        trace!(key = %node.key, bytes = node.size(), "evicted");
        true
    }

    /// Panics if the index, the list and the byte counter disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.index.len(), self.list.len(), "index/list length mismatch");
        let mut total = 0;
        for node in self.list.iter() {
            let id = self.index[&node.key];
            assert_eq!(self.list.get(id).map(|n| n.key.as_str()), Some(node.key.as_str()));
            total += node.size();
        }
        assert_eq!(total, self.used_bytes, "used_bytes drifted");
        assert!(self.used_bytes <= self.max_bytes, "budget exceeded");
    }
}
