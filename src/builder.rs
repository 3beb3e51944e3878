//! Unified builder over the homogeneous-key engines.
//!
//! Lets callers pick an engine at runtime without naming concrete types:
//! the produced [`AnyCache`] implements [`Cache`] by delegating to whichever
//! engine was selected. The KV engine is not buildable here, since its key
//! type is fixed to `String` and its prefix surface exceeds the `Cache`
//! trait; construct [`KvCache`](crate::engine::kv::KvCache) directly.
//!
//! ## Example
//!
//! ```
//! use cachemux::builder::{CacheBuilder, EngineKind};
//! use cachemux::traits::Cache;
//!
//! let cache = CacheBuilder::new(EngineKind::Ring { capacity: 128 }).build::<u64, String>();
//! cache.set(1, "hello".to_string());
//! assert_eq!(cache.get(&1).unwrap(), "hello");
//! ```

use std::hash::Hash;
use std::time::Duration;

use crate::engine::map::MapCache;
use crate::engine::ring::RingCache;
use crate::engine::ttl::TtlCache;
use crate::error::CacheError;
use crate::traits::Cache;

/// Engine selection for [`CacheBuilder`].
#[derive(Debug, Clone)]
pub enum EngineKind {
    /// Unbounded synchronised map.
    Map,
    /// TTL map; zero `cleanup_interval` selects the engine default.
    Ttl {
        ttl: Duration,
        cleanup_interval: Duration,
    },
    /// Fixed-capacity overwrite-oldest ring.
    Ring { capacity: usize },
}

/// Builds an [`AnyCache`] from an [`EngineKind`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    kind: EngineKind,
}

impl CacheBuilder {
    /// Starts a builder for the given engine kind.
    pub fn new(kind: EngineKind) -> Self {
        Self { kind }
    }

    /// Constructs the selected engine.
    pub fn build<K, V>(self) -> AnyCache<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match self.kind {
            EngineKind::Map => AnyCache::Map(MapCache::new()),
            EngineKind::Ttl {
                ttl,
                cleanup_interval,
            } => AnyCache::Ttl(TtlCache::new(ttl, cleanup_interval)),
            EngineKind::Ring { capacity } => AnyCache::Ring(RingCache::new(capacity)),
        }
    }
}

/// Engine chosen at runtime, presenting the uniform [`Cache`] surface.
pub enum AnyCache<K, V> {
    Map(MapCache<K, V>),
    Ttl(TtlCache<K, V>),
    Ring(RingCache<K, V>),
}

impl<K, V> Cache<K, V> for AnyCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, key: K, value: V) {
        match self {
            AnyCache::Map(cache) => cache.set(key, value),
            AnyCache::Ttl(cache) => cache.set(key, value),
            AnyCache::Ring(cache) => cache.set(key, value),
        }
    }

    fn set_if_present(&self, key: K, value: V) -> (Option<V>, bool) {
        match self {
            AnyCache::Map(cache) => cache.set_if_present(key, value),
            AnyCache::Ttl(cache) => cache.set_if_present(key, value),
            AnyCache::Ring(cache) => cache.set_if_present(key, value),
        }
    }

    fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool) {
        match self {
            AnyCache::Map(cache) => cache.set_if_absent(key, value),
            AnyCache::Ttl(cache) => cache.set_if_absent(key, value),
            AnyCache::Ring(cache) => cache.set_if_absent(key, value),
        }
    }

    fn get(&self, key: &K) -> Result<V, CacheError> {
        match self {
            AnyCache::Map(cache) => cache.get(key),
            AnyCache::Ttl(cache) => cache.get(key),
            AnyCache::Ring(cache) => cache.get(key),
        }
    }

    fn del(&self, key: &K) {
        match self {
            AnyCache::Map(cache) => cache.del(key),
            AnyCache::Ttl(cache) => cache.del(key),
            AnyCache::Ring(cache) => cache.del(key),
        }
    }

    fn snapshot(&self) -> std::collections::HashMap<K, V> {
        match self {
            AnyCache::Map(cache) => cache.snapshot(),
            AnyCache::Ttl(cache) => cache.snapshot(),
            AnyCache::Ring(cache) => cache.snapshot(),
        }
    }

    fn len(&self) -> usize {
        match self {
            AnyCache::Map(cache) => cache.len(),
            AnyCache::Ttl(cache) => cache.len(),
            AnyCache::Ring(cache) => cache.len(),
        }
    }
}
