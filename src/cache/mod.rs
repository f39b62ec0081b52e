//! Cache Module
//!
//! Provides a byte-bounded in-memory cache with LRU eviction.

mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;

use parking_lot::Mutex;

// Re-export public types
pub use lru::{LruList, Node, SlotId};
pub use stats::CacheStats;
pub use store::CacheStore;

/// Cache handle shared by every connection and worker.
///
/// The store is not synchronized on its own: each operation must run entirely
/// under this one mutex.
pub type SharedCache = Arc<Mutex<CacheStore>>;

/// Wraps a store into a [`SharedCache`].
pub fn shared(store: CacheStore) -> SharedCache {
    Arc::new(Mutex::new(store))
}
