//! Single-flight cache updater with a bounded loader pool.
//!
//! Wraps any [`Cache`] with a `load(&K) -> Result<V, _>` function invoked on
//! miss. Concurrent demand for the same absent key triggers at most one load
//! ("single flight"); loads for distinct keys are bounded by a permit pool.
//!
//! ## Co-ordination
//!
//! ```text
//!   get(k) ── hit ──────────────────────────────────► value
//!      │ miss
//!      ▼
//!   k in flight? ── yes ─► wait completion ─► re-read cache ─► result
//!      │ no
//!      ▼
//!   acquire permit (blocks while pool exhausted)
//!      ▼
//!   RE-CHECK k in flight?  ── yes ─► return permit, wait, re-read
//!      │ no                          (the re-check closes the window in
//!      ▼                             which another caller claimed k while
//!   register flight,                 we were blocked on the pool)
//!   run loader OUTSIDE all locks,
//!   on success write through to the cache,
//!   deregister + return permit + signal completion
//! ```
//!
//! One mutex guards both the permit count and the in-flight table; splitting
//! them would re-open the double-claim race the re-check exists to close. A
//! successful load writes the cache *before* the completion signal fires, so
//! every waiter's re-read observes the loaded value.
//!
//! Loader errors surface verbatim as [`CacheError::Loader`] and are never
//! cached; the next miss retries.
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::map::MapCache;
//! use cachemux::traits::Cache;
//! use cachemux::wrap::updater::Updater;
//!
//! let cache = Updater::new(MapCache::new(), 4, |key: &String| {
//!     Ok(format!("loaded:{key}"))
//! });
//!
//! assert_eq!(cache.get(&"a".to_string()).unwrap(), "loaded:a");
//! // Second read is served from the cache, not the loader.
//! assert_eq!(cache.get(&"a".to_string()).unwrap(), "loaded:a");
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::error::{BoxError, CacheError};
use crate::traits::{Cache, PrefixSearch};

type LoadFn<K, V> = Box<dyn Fn(&K) -> Result<V, BoxError> + Send + Sync>;

/// Completion signal for one in-flight load.
struct Flight {
    done: Mutex<bool>,
    signal: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.signal.wait(&mut done);
        }
    }

    fn complete(&self) {
        *self.done.lock() = true;
        self.signal.notify_all();
    }
}

struct FlightState<K> {
    /// Loader slots still available; 0 blocks new loads.
    permits: usize,
    in_flight: FxHashMap<K, Arc<Flight>>,
}

/// Cache wrapper that loads missing values, once per key, under a bounded
/// concurrency pool.
pub struct Updater<C, K, V> {
    cache: C,
    load: LoadFn<K, V>,
    state: Mutex<FlightState<K>>,
    pool_available: Condvar,
}

impl<C, K, V> Updater<C, K, V>
where
    C: Cache<K, V>,
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Wraps `cache`, loading misses with `load`; at most `pool_size` loads
    /// run concurrently.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is zero: no load could ever acquire a permit,
    /// so the first miss would block forever.
    pub fn new<F>(cache: C, pool_size: usize, load: F) -> Self
    where
        F: Fn(&K) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        assert!(pool_size > 0, "updater pool size must be non-zero");
        Self {
            cache,
            load: Box::new(load),
            state: Mutex::new(FlightState {
                permits: pool_size,
                in_flight: FxHashMap::default(),
            }),
            pool_available: Condvar::new(),
        }
    }

    /// Returns a reference to the wrapped cache.
    pub fn inner(&self) -> &C {
        &self.cache
    }

    /// Miss path: wait out a duplicate flight or run the loader ourselves.
    fn load_missing(&self, key: &K) -> Result<V, CacheError> {
        if let Some(flight) = self.state.lock().in_flight.get(key).cloned() {
            // Another caller is already loading this key; its completion
            // happens after it wrote the cache, so the re-read sees the
            // freshest state (value, miss, or a failed load's absence).
            flight.wait();
            return self.cache.get(key);
        }

        let flight = {
            let mut state = self.state.lock();
            while state.permits == 0 {
                self.pool_available.wait(&mut state);
            }
            // Re-check under the same lock that guards the permits: the key
            // may have been claimed while we blocked on the pool.
            if let Some(flight) = state.in_flight.get(key).cloned() {
                drop(state);
                flight.wait();
                return self.cache.get(key);
            }
            state.permits -= 1;
            let flight = Arc::new(Flight::new());
            state.in_flight.insert(key.clone(), flight.clone());
            flight
        };

        // The loader runs outside the co-ordination lock and outside the
        // inner cache's locks.
        let loaded = (self.load)(key);
        if let Ok(value) = &loaded {
            self.cache.set(key.clone(), value.clone());
        }

        {
            let mut state = self.state.lock();
            state.in_flight.remove(key);
            state.permits += 1;
        }
        flight.complete();
        self.pool_available.notify_one();

        loaded.map_err(CacheError::Loader)
    }
}

impl<C, K, V> Cache<K, V> for Updater<C, K, V>
where
    C: Cache<K, V>,
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn set(&self, key: K, value: V) {
        self.cache.set(key, value);
    }

    fn set_if_present(&self, key: K, value: V) -> (Option<V>, bool) {
        self.cache.set_if_present(key, value)
    }

    fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool) {
        self.cache.set_if_absent(key, value)
    }

    /// Returns the cached value, loading it on miss.
    ///
    /// May block on another caller's in-flight load of the same key, or on
    /// the loader pool when `pool_size` loads are already running.
    fn get(&self, key: &K) -> Result<V, CacheError> {
        match self.cache.get(key) {
            Err(CacheError::NotFound) => self.load_missing(key),
            other => other,
        }
    }

    fn del(&self, key: &K) {
        self.cache.del(key);
    }

    fn snapshot(&self) -> HashMap<K, V> {
        self.cache.snapshot()
    }

    fn len(&self) -> usize {
        self.cache.len()
    }
}

impl<C, K, V> PrefixSearch<V> for Updater<C, K, V>
where
    C: PrefixSearch<V>,
{
    fn list_by_prefix(&self, prefix: &str) -> Result<Vec<V>, CacheError> {
        self.cache.list_by_prefix(prefix)
    }
}
