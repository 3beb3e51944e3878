//! Prefix index over an external cache.
//!
//! `Prefixed` pairs any `Cache<String, V>` with a radix-tree key index, so a
//! store that has no ordering of its own (a map, a sharded map, a TTL map)
//! gains lexicographic prefix listing. The store keeps owning the values;
//! the trie tracks keys only.
//!
//! The wrapper's write lock spans the compound store-plus-trie updates,
//! maintaining the invariant that every key present in the store is indexed
//! in the trie. Plain `get` bypasses the wrapper's lock entirely and goes
//! straight to the store.
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::map::MapCache;
//! use cachemux::traits::{Cache, PrefixSearch};
//! use cachemux::wrap::prefixed::Prefixed;
//!
//! let cache = Prefixed::new(MapCache::new());
//! cache.set("user:1".to_string(), "alice");
//! cache.set("user:2".to_string(), "bob");
//! cache.set("admin:1".to_string(), "root");
//!
//! assert_eq!(cache.list_by_prefix("user:").unwrap(), vec!["alice", "bob"]);
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;

use parking_lot::RwLock;

use crate::ds::radix::RadixTree;
use crate::error::CacheError;
use crate::traits::{Cache, PrefixSearch};

/// Adds ordered prefix queries to any string-keyed cache.
pub struct Prefixed<C, V> {
    store: C,
    index: RwLock<RadixTree<()>>,
    _values: PhantomData<fn() -> V>,
}

impl<C, V> Prefixed<C, V>
where
    C: Cache<String, V>,
    V: Clone,
{
    /// Wraps `store` with an initially empty key index.
    ///
    /// The index only learns about keys written through this wrapper;
    /// writing to `store` directly afterwards leaves those keys invisible
    /// to prefix queries.
    pub fn new(store: C) -> Self {
        Self {
            store,
            index: RwLock::new(RadixTree::new()),
            _values: PhantomData,
        }
    }
}

impl<C, V> Cache<String, V> for Prefixed<C, V>
where
    C: Cache<String, V>,
    V: Clone + Send + Sync,
{
    fn set(&self, key: String, value: V) {
        let mut index = self.index.write();
        self.store.set(key.clone(), value);
        index.insert(key.as_bytes(), ());
    }

    fn set_if_present(&self, key: String, value: V) -> (Option<V>, bool) {
        let _index = self.index.write();
        match self.store.get(&key) {
            Ok(previous) => {
                // A key present in the store is already indexed, so only
                // the store needs the write.
                self.store.set(key, value);
                (Some(previous), true)
            }
            Err(_) => (None, false),
        }
    }

    fn set_if_absent(&self, key: String, value: V) -> (Option<V>, bool) {
        let mut index = self.index.write();
        match self.store.get(&key) {
            Ok(existing) => (Some(existing), false),
            Err(_) => {
                self.store.set(key.clone(), value);
                index.insert(key.as_bytes(), ());
                (None, true)
            }
        }
    }

    fn get(&self, key: &String) -> Result<V, CacheError> {
        self.store.get(key)
    }

    fn del(&self, key: &String) {
        let mut index = self.index.write();
        index.remove(key.as_bytes());
        // The store's delete runs regardless of what the index said, so a
        // store written to out-of-band still converges.
        self.store.del(key);
    }

    fn snapshot(&self) -> HashMap<String, V> {
        self.store.snapshot()
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

impl<C, V> PrefixSearch<V> for Prefixed<C, V>
where
    C: Cache<String, V>,
    V: Clone + Send + Sync,
{
    fn list_by_prefix(&self, prefix: &str) -> Result<Vec<V>, CacheError> {
        let index = self.index.read();
        let mut keys = Vec::new();
        index.for_each_prefix(prefix.as_bytes(), |path, _| {
            debug_assert!(std::str::from_utf8(path).is_ok());
            // SAFETY: indexed paths are byte-for-byte the String keys that
            // were inserted through this wrapper, so they are valid UTF-8.
            keys.push(unsafe { String::from_utf8_unchecked(path.to_vec()) });
        });

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            // First store error aborts the listing; partial results are
            // discarded by construction.
            values.push(self.store.get(&key)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::map::MapCache;
    use crate::engine::ttl::TtlCache;
    use crate::clock::ManualClock;
    use std::sync::Arc;
    use std::time::Duration;

    fn wrapped() -> Prefixed<MapCache<String, String>, String> {
        Prefixed::new(MapCache::new())
    }

    #[test]
    fn listing_follows_key_order() {
        let cache = wrapped();
        cache.set("abra".to_string(), "X".to_string());
        cache.set("cadabra".to_string(), "Y".to_string());
        cache.set("abracadabra".to_string(), "Z".to_string());

        assert_eq!(cache.list_by_prefix("abr").unwrap(), vec!["X", "Z"]);
        assert_eq!(cache.list_by_prefix("cad").unwrap(), vec!["Y"]);
        assert_eq!(cache.list_by_prefix("").unwrap(), vec!["X", "Z", "Y"]);
    }

    #[test]
    fn del_removes_from_index_and_store() {
        let cache = wrapped();
        cache.set("a1".to_string(), "1".to_string());
        cache.set("a2".to_string(), "2".to_string());
        cache.del(&"a1".to_string());

        assert_eq!(cache.list_by_prefix("a").unwrap(), vec!["2"]);
        assert!(cache.get(&"a1".to_string()).unwrap_err().is_not_found());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn del_of_unindexed_key_still_reaches_store() {
        let cache = wrapped();
        // Nothing indexed; delete must still be forwarded.
        cache.del(&"ghost".to_string());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_if_present_updates_store_only_on_hit() {
        let cache = wrapped();
        assert_eq!(
            cache.set_if_present("k".to_string(), "v".to_string()),
            (None, false)
        );

        cache.set("k".to_string(), "v1".to_string());
        let (old, written) = cache.set_if_present("k".to_string(), "v2".to_string());
        assert_eq!(old.as_deref(), Some("v1"));
        assert!(written);
        assert_eq!(cache.list_by_prefix("k").unwrap(), vec!["v2"]);
    }

    #[test]
    fn set_if_absent_indexes_new_keys() {
        let cache = wrapped();
        assert_eq!(
            cache.set_if_absent("k".to_string(), "v1".to_string()),
            (None, true)
        );
        assert_eq!(
            cache.set_if_absent("k".to_string(), "v2".to_string()),
            (Some("v1".to_string()), false)
        );
        assert_eq!(cache.list_by_prefix("").unwrap(), vec!["v1"]);
    }

    #[test]
    fn expired_underlying_entry_aborts_listing() {
        let clock = Arc::new(ManualClock::new());
        let store: TtlCache<String, String> =
            TtlCache::with_clock(Duration::from_secs(1), Duration::from_secs(3600), clock.clone());
        let cache = Prefixed::new(store);

        cache.set("k1".to_string(), "v1".to_string());
        clock.advance(Duration::from_secs(1));

        // The key is still indexed but the store reports it missing; the
        // error surfaces instead of a silent partial result.
        let err = cache.list_by_prefix("k").unwrap_err();
        assert!(err.is_not_found());
    }
}
