//! Per-engine operation counters.
//!
//! Every engine embeds a [`CacheCounters`] and bumps it on the corresponding
//! operation; [`CacheCounters::snapshot`] produces a point-in-time
//! [`CacheMetrics`] copy. Counters are cumulative since engine creation and
//! use relaxed atomics: they are cheap enough for hot paths and only ever
//! read as a whole snapshot, never as a synchronisation primitive.
//!
//! ## Example
//!
//! ```
//! use cachemux::engine::map::MapCache;
//! use cachemux::traits::Cache;
//!
//! let cache = MapCache::new();
//! cache.set(1, "one");
//! cache.get(&1).unwrap();
//! cache.get(&2).unwrap_err();
//!
//! let m = cache.metrics();
//! assert_eq!((m.hits, m.misses, m.inserts), (1, 1, 1));
//! assert!((m.hit_rate() - 0.5).abs() < f64::EPSILON);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of an engine's operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that missed (absent or expired).
    pub misses: u64,
    /// Writes that created a new entry.
    pub inserts: u64,
    /// Writes that replaced an existing entry.
    pub updates: u64,
    /// Entries removed by explicit `del`.
    pub removes: u64,
    /// Entries removed by the engine itself (TTL sweep, ring overwrite).
    pub evictions: u64,
}

impl CacheMetrics {
    /// Fraction of lookups that hit, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Atomic counters embedded in each engine.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    /// Returns a consistent-enough copy of all counters.
    ///
    /// Individual loads are relaxed, so a snapshot taken concurrently with
    /// traffic may tear across counters; each counter on its own is exact.
    pub fn snapshot(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_evictions(&self, n: u64) {
        self.evictions.fetch_add(n, Ordering::Relaxed);
    }
}
