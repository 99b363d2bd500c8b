//! # Cache - bounded LRU map
//!
//! A fixed-capacity map that evicts its least-recently-used entry when a new
//! key arrives at capacity. The table reader keeps one of these per open
//! database, keyed by block handle, so decoded blocks are shared by every
//! table file and survive a file being closed and reopened.
//!
//! Every operation takes a single mutex guarding both the map and the
//! recency order, so a cache may be shared across threads behind an `Arc`.
//!
//! ## Example
//!
//! ```rust
//! use cache::BoundedLruCache;
//!
//! let cache = BoundedLruCache::new(2);
//! cache.put("a", 1);
//! cache.put("b", 2);
//! assert_eq!(cache.get(&"a"), Some(1)); // "a" is now most recent
//! cache.put("c", 3); // evicts "b"
//! assert!(!cache.contains(&"b"));
//! ```

use hashlink::LruCache;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe LRU cache holding at most `capacity` entries.
///
/// Values are handed out by clone, so large payloads should be stored behind
/// an `Arc`.
pub struct BoundedLruCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
    capacity: usize,
}

impl<K: Hash + Eq, V: Clone> BoundedLruCache<K, V> {
    /// Creates an empty cache. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Inserts `value` under `key` as the most-recently-used entry.
    ///
    /// Does nothing if `key` is already cached (the existing entry keeps its
    /// value and its position). Otherwise, at capacity, the least-recently-used
    /// entry is evicted first.
    pub fn put(&self, key: K, value: V) {
        let mut map = self.lock();
        if map.peek(&key).is_some() {
            return;
        }
        if map.len() >= self.capacity {
            map.remove_lru();
        }
        map.insert(key, value);
    }

    /// Returns `true` if `key` is cached, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().peek(key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while the lock is held cannot leave the map and the recency
    // list out of step (hashlink updates both in one structure), so a
    // poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedLruCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
