//! Unbounded synchronised map engine.
//!
//! The simplest [`Cache`] implementation: a hash map behind one
//! reader-writer lock, with no TTL, no capacity bound, and no eviction. It
//! grows until told otherwise, which makes it the default underlying store
//! for the wrappers and the baseline in benchmarks.
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::map::MapCache;
//! use cachemux::traits::Cache;
//!
//! let cache = MapCache::new();
//! cache.set("answer", 42);
//! assert_eq!(cache.get(&"answer").unwrap(), 42);
//!
//! cache.del(&"answer");
//! assert!(cache.get(&"answer").unwrap_err().is_not_found());
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::CacheError;
use crate::metrics::{CacheCounters, CacheMetrics};
use crate::traits::Cache;

/// Thread-safe unbounded map cache.
#[derive(Debug)]
pub struct MapCache<K, V> {
    inner: RwLock<FxHashMap<K, V>>,
    counters: CacheCounters,
}

impl<K, V> MapCache<K, V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(FxHashMap::default()),
            counters: CacheCounters::default(),
        }
    }

    /// Returns a snapshot of the engine's operation counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }
}

impl<K, V> Default for MapCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> for MapCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn set(&self, key: K, value: V) {
        let previous = self.inner.write().insert(key, value);
        if previous.is_some() {
            self.counters.inc_update();
        } else {
            self.counters.inc_insert();
        }
    }

    fn set_if_present(&self, key: K, value: V) -> (Option<V>, bool) {
        let mut map = self.inner.write();
        match map.get_mut(&key) {
            Some(slot) => {
                let old = std::mem::replace(slot, value);
                self.counters.inc_update();
                (Some(old), true)
            }
            None => (None, false),
        }
    }

    fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool) {
        let mut map = self.inner.write();
        match map.get(&key) {
            Some(existing) => (Some(existing.clone()), false),
            None => {
                map.insert(key, value);
                self.counters.inc_insert();
                (None, true)
            }
        }
    }

    fn get(&self, key: &K) -> Result<V, CacheError> {
        match self.inner.read().get(key) {
            Some(value) => {
                self.counters.inc_hit();
                Ok(value.clone())
            }
            None => {
                self.counters.inc_miss();
                Err(CacheError::NotFound)
            }
        }
    }

    fn del(&self, key: &K) {
        if self.inner.write().remove(key).is_some() {
            self.counters.inc_remove();
        }
    }

    fn snapshot(&self) -> HashMap<K, V> {
        self.inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_del_roundtrip() {
        let cache = MapCache::new();
        cache.set("k", 1);
        assert_eq!(cache.get(&"k").unwrap(), 1);

        cache.del(&"k");
        assert!(cache.get(&"k").unwrap_err().is_not_found());
    }

    #[test]
    fn del_absent_is_noop() {
        let cache: MapCache<&str, i32> = MapCache::new();
        cache.del(&"missing");
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_if_present_only_replaces() {
        let cache = MapCache::new();
        assert_eq!(cache.set_if_present("k", 1), (None, false));
        assert!(cache.is_empty());

        cache.set("k", 1);
        assert_eq!(cache.set_if_present("k", 2), (Some(1), true));
        assert_eq!(cache.get(&"k").unwrap(), 2);
    }

    #[test]
    fn set_if_absent_only_inserts() {
        let cache = MapCache::new();
        assert_eq!(cache.set_if_absent("k", 1), (None, true));
        assert_eq!(cache.set_if_absent("k", 2), (Some(1), false));
        assert_eq!(cache.get(&"k").unwrap(), 1);
    }

    #[test]
    fn snapshot_is_detached() {
        let cache = MapCache::new();
        cache.set(1, "one");
        cache.set(2, "two");

        let snap = cache.snapshot();
        cache.set(3, "three");
        cache.del(&1);

        assert_eq!(snap.len(), 2);
        assert_eq!(snap[&1], "one");
        assert_eq!(snap[&2], "two");
    }

    #[test]
    fn counters_track_operations() {
        let cache = MapCache::new();
        cache.set("k", 1);
        cache.set("k", 2);
        cache.get(&"k").unwrap();
        cache.get(&"missing").unwrap_err();
        cache.del(&"k");

        let m = cache.metrics();
        assert_eq!(m.inserts, 1);
        assert_eq!(m.updates, 1);
        assert_eq!(m.hits, 1);
        assert_eq!(m.misses, 1);
        assert_eq!(m.removes, 1);
    }

    #[test]
    fn shared_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(MapCache::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    cache.set(t * 100 + i, i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
