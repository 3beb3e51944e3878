//! # Cache Capability Traits
//!
//! This module defines the capability sets shared by every cache engine and
//! wrapper in the crate.
//!
//! ## Architecture
//!
//! ```text
//!                ┌───────────────────────────────────────────┐
//!                │              Cache<K, V>                  │
//!                │                                           │
//!                │  set(K, V)                                │
//!                │  set_if_present(K, V) → (Option<V>, bool) │
//!                │  set_if_absent(K, V)  → (Option<V>, bool) │
//!                │  get(&K)  → Result<V, CacheError>         │
//!                │  del(&K)                                  │
//!                │  snapshot() → HashMap<K, V>               │
//!                │  len(), is_empty()                        │
//!                └──────────────────┬────────────────────────┘
//!                                   │ implemented by
//!          ┌──────────┬─────────────┼─────────────┬───────────────┐
//!          ▼          ▼             ▼             ▼               ▼
//!      MapCache   TtlCache      RingCache      KvCache    Sharded / Updater
//!                                                          / Prefixed
//!
//!      PrefixSearch<V>: list_by_prefix(&str) → Result<Vec<V>, CacheError>
//!          implemented by KvCache, Prefixed, Updater-over-prefix,
//!          locker transactions over prefix caches. NOT by Sharded.
//!
//!      Mapper<K>: map(&K, shards) → usize  (key → shard routing)
//! ```
//!
//! ## Design Notes
//!
//! - All operations take `&self`; engines synchronise internally with a
//!   single reader-writer lock, so a cache can be shared by reference (or
//!   `Arc`) across threads without external locking.
//! - Values are returned by value (`V: Clone` at the implementations), never
//!   as references tied to an internal lock guard.
//! - `set_if_present` / `set_if_absent` return `(Option<V>, bool)`: the
//!   previous/existing value when there was one, and whether the write was
//!   performed. The two are intentionally not collapsed into the `Option`
//!   alone so call sites read the same as the atomic they model.
//! - `Sharded` deliberately does not implement [`PrefixSearch`]: a prefix
//!   index partitioned by an arbitrary key mapper cannot answer ordered
//!   prefix queries, so the composition is rejected at compile time.

use std::collections::HashMap;

use crate::error::CacheError;

/// Core capability set shared by all cache engines and wrappers.
///
/// # Example
///
/// ```
/// use cachemux::engine::map::MapCache;
/// use cachemux::traits::Cache;
///
/// fn warm<C: Cache<u64, String>>(cache: &C, data: &[(u64, &str)]) {
///     for (key, value) in data {
///         cache.set(*key, value.to_string());
///     }
/// }
///
/// let cache = MapCache::new();
/// warm(&cache, &[(1, "one"), (2, "two")]);
/// assert_eq!(cache.len(), 2);
/// assert_eq!(cache.get(&1).unwrap(), "one");
/// ```
pub trait Cache<K, V>: Send + Sync {
    /// Inserts or updates the value for `key`.
    fn set(&self, key: K, value: V);

    /// Replaces the value only if `key` is already present.
    ///
    /// Returns the previous value and whether the replacement was performed.
    /// Engines with expiry treat an expired entry as absent.
    ///
    /// # Example
    ///
    /// ```
    /// use cachemux::engine::map::MapCache;
    /// use cachemux::traits::Cache;
    ///
    /// let cache = MapCache::new();
    /// assert_eq!(cache.set_if_present(1, "a"), (None, false));
    ///
    /// cache.set(1, "a");
    /// assert_eq!(cache.set_if_present(1, "b"), (Some("a"), true));
    /// ```
    fn set_if_present(&self, key: K, value: V) -> (Option<V>, bool);

    /// Inserts the value only if `key` is not yet present.
    ///
    /// Returns the existing value and whether the insertion was performed.
    ///
    /// # Example
    ///
    /// ```
    /// use cachemux::engine::map::MapCache;
    /// use cachemux::traits::Cache;
    ///
    /// let cache = MapCache::new();
    /// assert_eq!(cache.set_if_absent(1, "a"), (None, true));
    /// assert_eq!(cache.set_if_absent(1, "b"), (Some("a"), false));
    /// assert_eq!(cache.get(&1).unwrap(), "a");
    /// ```
    fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool);

    /// Returns the value for `key`, or [`CacheError::NotFound`].
    ///
    /// Lookups never reorder entries: none of the engines has read-driven
    /// (LRU-style) eviction.
    fn get(&self, key: &K) -> Result<V, CacheError>;

    /// Removes `key` from the cache. Removing an absent key is a no-op.
    fn del(&self, key: &K);

    /// Returns a shallow copy of the current contents.
    ///
    /// The copy is taken under a read lock; later mutations of the cache do
    /// not affect it. Iteration order of the returned map is arbitrary.
    fn snapshot(&self) -> HashMap<K, V>;

    /// Returns the number of stored entries.
    fn len(&self) -> usize;

    /// Returns `true` if the cache contains no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered prefix queries over string-keyed caches.
///
/// Keys are compared as raw bytes; enumeration order is ascending
/// lexicographic byte order, with no Unicode collation.
///
/// # Example
///
/// ```
/// use cachemux::engine::kv::KvCache;
/// use cachemux::traits::{Cache, PrefixSearch};
///
/// let cache: KvCache<&str> = KvCache::new();
/// cache.set("user:1".to_string(), "alice");
/// cache.set("user:2".to_string(), "bob");
/// cache.set("group:1".to_string(), "admins");
///
/// assert_eq!(cache.list_by_prefix("user:").unwrap(), vec!["alice", "bob"]);
/// ```
pub trait PrefixSearch<V> {
    /// Returns all values whose keys start with `prefix`, in ascending key
    /// order.
    ///
    /// # Errors
    ///
    /// When the prefix index sits in front of a fallible store, the first
    /// error from the store's `get` aborts the listing and is returned
    /// verbatim; partial results are discarded.
    fn list_by_prefix(&self, prefix: &str) -> Result<Vec<V>, CacheError>;
}

/// Routes keys to shards for [`Sharded`](crate::wrap::sharded::Sharded).
///
/// Implementations must return a value in `0..shards` and must be
/// deterministic: the same key always maps to the same shard. A good mapper
/// also distributes keys uniformly, since shard imbalance serialises what
/// the sharding exists to parallelise.
pub trait Mapper<K>: Send + Sync {
    /// Maps `key` to a shard index in `0..shards`.
    fn map(&self, key: &K, shards: usize) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal impl exercising default methods and object safety of the
    // trait surface.
    struct NullCache;

    impl Cache<u32, u32> for NullCache {
        fn set(&self, _key: u32, _value: u32) {}
        fn set_if_present(&self, _key: u32, _value: u32) -> (Option<u32>, bool) {
            (None, false)
        }
        fn set_if_absent(&self, _key: u32, _value: u32) -> (Option<u32>, bool) {
            (None, true)
        }
        fn get(&self, _key: &u32) -> Result<u32, CacheError> {
            Err(CacheError::NotFound)
        }
        fn del(&self, _key: &u32) {}
        fn snapshot(&self) -> HashMap<u32, u32> {
            HashMap::new()
        }
        fn len(&self) -> usize {
            0
        }
    }

    #[test]
    fn is_empty_default_follows_len() {
        assert!(NullCache.is_empty());
    }

    #[test]
    fn cache_trait_is_object_safe() {
        let boxed: Box<dyn Cache<u32, u32>> = Box::new(NullCache);
        assert!(boxed.get(&1).unwrap_err().is_not_found());
    }
}
