//! TTL map engine: timestamped store with background sweep.
//!
//! Every entry records its last-set instant and sits in a global FIFO list
//! ordered by set time. Reads treat entries older than the configured TTL as
//! absent; a background sweeper periodically removes the expired prefix of
//! the list and reports each removal to an optional eviction callback.
//!
//! ## Architecture
//!
//! ```text
//!   map: FxHashMap<K, TtlEntry { value, stamp, prev, next }>
//!
//!   head ─► k₁ ◄──► k₂ ◄──► k₃ ◄── tail        (links are keys, not pointers)
//!           oldest set            newest set
//!
//!   Re-setting a key unlinks it and appends at the tail, so stamps are
//!   non-decreasing from head to tail and the expired entries form a
//!   contiguous prefix. The sweeper pops from head until the first live
//!   entry, then fires the callback for each removal OUTSIDE the lock.
//! ```
//!
//! ## Key Concepts
//!
//! - `get` never reorders: there is no LRU effect, expiry is purely by set
//!   time.
//! - An expired entry stays in the store until the sweeper passes; `get`
//!   reports it as missing, `len`/`snapshot` still see it.
//! - Explicit [`del`](crate::traits::Cache::del) never fires the eviction
//!   callback; only sweep removals do.
//! - The sweeper is a named background thread whose lifetime is tied to the
//!   cache: dropping the cache signals it to exit.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cachemux::clock::ManualClock;
//! use cachemux::engine::ttl::TtlCache;
//! use cachemux::traits::Cache;
//!
//! let clock = Arc::new(ManualClock::new());
//! let cache = TtlCache::with_clock(Duration::from_secs(1), Duration::ZERO, clock.clone());
//!
//! cache.set("k", "v");
//! assert_eq!(cache.get(&"k").unwrap(), "v");
//!
//! clock.advance(Duration::from_secs(1));
//! assert!(cache.get(&"k").unwrap_err().is_not_found());
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;
use crate::metrics::{CacheCounters, CacheMetrics};
use crate::traits::Cache;

/// Sweep period used when the caller passes a zero cleanup interval.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

type EvictionCallback<K, V> = Arc<dyn Fn(K, V) + Send + Sync + 'static>;

#[derive(Debug)]
struct TtlEntry<K, V> {
    value: V,
    stamp: Instant,
    prev: Option<K>,
    next: Option<K>,
}

#[derive(Debug)]
struct TtlInner<K, V> {
    map: FxHashMap<K, TtlEntry<K, V>>,
    head: Option<K>,
    tail: Option<K>,
}

impl<K, V> TtlInner<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Removes `key` from the map and the list, fixing neighbour links and
    /// the head/tail anchors.
    fn unlink(&mut self, key: &K) -> Option<TtlEntry<K, V>> {
        let entry = self.map.remove(key)?;

        match &entry.prev {
            Some(prev_key) => {
                if let Some(prev) = self.map.get_mut(prev_key) {
                    prev.next = entry.next.clone();
                }
            }
            None => self.head = entry.next.clone(),
        }

        match &entry.next {
            Some(next_key) => {
                if let Some(next) = self.map.get_mut(next_key) {
                    next.prev = entry.prev.clone();
                }
            }
            None => self.tail = entry.prev.clone(),
        }

        Some(entry)
    }

    /// Appends `key` at the tail with a fresh stamp.
    fn push_tail(&mut self, key: K, value: V, stamp: Instant) {
        let prev = self.tail.take();
        match &prev {
            Some(prev_key) => {
                if let Some(prev_entry) = self.map.get_mut(prev_key) {
                    prev_entry.next = Some(key.clone());
                }
            }
            None => self.head = Some(key.clone()),
        }
        self.tail = Some(key.clone());
        self.map.insert(
            key,
            TtlEntry {
                value,
                stamp,
                prev,
                next: None,
            },
        );
    }

    /// Upserts `key`, moving it to the tail. Returns `true` if the key was
    /// already present.
    fn set(&mut self, key: K, value: V, now: Instant) -> bool {
        if self.tail.as_ref() == Some(&key) {
            // Already the most recent entry: pure value/stamp update.
            if let Some(entry) = self.map.get_mut(&key) {
                entry.value = value;
                entry.stamp = now;
                return true;
            }
        }
        let was_present = self.unlink(&key).is_some();
        self.push_tail(key, value, now);
        was_present
    }
}

struct TtlShared<K, V> {
    inner: RwLock<TtlInner<K, V>>,
    on_evict: Mutex<Option<EvictionCallback<K, V>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    counters: CacheCounters,
}

impl<K, V> TtlShared<K, V>
where
    K: Eq + Hash + Clone,
{
    fn is_expired(&self, stamp: Instant, now: Instant) -> bool {
        now.duration_since(stamp) >= self.ttl
    }

    /// One sweep pass: pops the expired prefix of the list under the write
    /// lock, then fires the eviction callback for each removal with no lock
    /// held, so callbacks may re-enter the cache freely.
    fn sweep(&self) {
        let now = self.clock.now();
        let mut evicted = Vec::new();
        {
            let mut inner = self.inner.write();
            while let Some(head_key) = inner.head.clone() {
                let expired = inner
                    .map
                    .get(&head_key)
                    .is_some_and(|entry| self.is_expired(entry.stamp, now));
                if !expired {
                    break;
                }
                if let Some(entry) = inner.unlink(&head_key) {
                    evicted.push((head_key, entry.value));
                }
            }
        }

        if evicted.is_empty() {
            return;
        }
        self.counters.inc_evictions(evicted.len() as u64);

        let callback = self.on_evict.lock().clone();
        if let Some(callback) = callback {
            for (key, value) in evicted {
                callback(key, value);
            }
        }
    }
}

struct SweeperSignal {
    stop: Mutex<bool>,
    tick: Condvar,
}

/// Thread-safe map cache with per-entry TTL and a background sweeper.
///
/// See the [module docs](self) for the list discipline and sweep contract.
pub struct TtlCache<K, V> {
    shared: Arc<TtlShared<K, V>>,
    signal: Arc<SweeperSignal>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a cache expiring entries `ttl` after their last set, swept
    /// every `cleanup_interval` (zero selects
    /// [`DEFAULT_CLEANUP_INTERVAL`]).
    pub fn new(ttl: Duration, cleanup_interval: Duration) -> Self {
        Self::with_clock(ttl, cleanup_interval, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`; tests pair this with
    /// [`ManualClock`](crate::clock::ManualClock) and drive expiry via
    /// [`sweep`](Self::sweep).
    pub fn with_clock(ttl: Duration, cleanup_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let interval = if cleanup_interval.is_zero() {
            DEFAULT_CLEANUP_INTERVAL
        } else {
            cleanup_interval
        };

        let shared = Arc::new(TtlShared {
            inner: RwLock::new(TtlInner {
                map: FxHashMap::default(),
                head: None,
                tail: None,
            }),
            on_evict: Mutex::new(None),
            clock,
            ttl,
            counters: CacheCounters::default(),
        });
        let signal = Arc::new(SweeperSignal {
            stop: Mutex::new(false),
            tick: Condvar::new(),
        });

        let weak: Weak<TtlShared<K, V>> = Arc::downgrade(&shared);
        let thread_signal = signal.clone();
        thread::Builder::new()
            .name("cachemux-ttl-sweeper".into())
            .spawn(move || loop {
                {
                    let mut stop = thread_signal.stop.lock();
                    if *stop {
                        return;
                    }
                    thread_signal.tick.wait_for(&mut stop, interval);
                    if *stop {
                        return;
                    }
                }
                match weak.upgrade() {
                    Some(shared) => shared.sweep(),
                    None => return,
                }
            })
            .expect("failed to spawn TTL sweeper thread");

        Self { shared, signal }
    }

    /// Installs or replaces the eviction callback.
    ///
    /// The callback runs once per entry removed by a sweep, outside the
    /// cache's lock, with the key and the value that was stored when the
    /// entry expired. It is never invoked for explicit
    /// [`del`](crate::traits::Cache::del).
    pub fn on_evict<F>(&self, callback: F)
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        *self.shared.on_evict.lock() = Some(Arc::new(callback));
    }

    /// Runs one synchronous sweep pass, as the background sweeper would.
    pub fn sweep(&self) {
        self.shared.sweep();
    }

    /// Returns a snapshot of the engine's operation counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.shared.counters.snapshot()
    }

    /// Returns the values in FIFO list order, oldest set first.
    ///
    /// Expired-but-unswept entries are included; this reflects the raw list
    /// the sweeper walks.
    #[cfg(any(test, debug_assertions))]
    pub fn fifo_values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let inner = self.shared.inner.read();
        let mut out = Vec::with_capacity(inner.map.len());
        let mut cursor = inner.head.clone();
        while let Some(key) = cursor {
            let entry = match inner.map.get(&key) {
                Some(entry) => entry,
                None => break,
            };
            out.push(entry.value.clone());
            cursor = entry.next.clone();
        }
        out
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self)
    where
        K: std::fmt::Debug,
    {
        let inner = self.shared.inner.read();
        if inner.map.is_empty() {
            assert!(inner.head.is_none() && inner.tail.is_none());
            return;
        }

        let head = inner.head.clone().expect("non-empty list must have head");
        assert!(inner.map[&head].prev.is_none(), "head.prev must be None");

        let mut visited = 0;
        let mut prev_key: Option<K> = None;
        let mut prev_stamp: Option<Instant> = None;
        let mut cursor = Some(head);
        while let Some(key) = cursor {
            let entry = inner.map.get(&key).expect("list key must be in map");
            assert_eq!(entry.prev, prev_key, "back-link must match walk order");
            if let Some(stamp) = prev_stamp {
                assert!(entry.stamp >= stamp, "stamps must be non-decreasing");
            }
            visited += 1;
            assert!(visited <= inner.map.len(), "list must be acyclic");
            prev_stamp = Some(entry.stamp);
            prev_key = Some(key);
            cursor = entry.next.clone();
        }
        assert_eq!(visited, inner.map.len(), "list must cover the whole map");
        assert_eq!(inner.tail, prev_key, "tail must be the last walked key");
    }
}

impl<K, V> Drop for TtlCache<K, V> {
    fn drop(&mut self) {
        *self.signal.stop.lock() = true;
        self.signal.tick.notify_all();
    }
}

impl<K, V> Cache<K, V> for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, key: K, value: V) {
        let now = self.shared.clock.now();
        let updated = self.shared.inner.write().set(key, value, now);
        if updated {
            self.shared.counters.inc_update();
        } else {
            self.shared.counters.inc_insert();
        }
    }

    fn set_if_present(&self, key: K, value: V) -> (Option<V>, bool) {
        let now = self.shared.clock.now();
        let mut inner = self.shared.inner.write();
        let live = inner
            .map
            .get(&key)
            .filter(|entry| !self.shared.is_expired(entry.stamp, now))
            .map(|entry| entry.value.clone());
        match live {
            Some(old) => {
                // Behaves like a fresh set: restamps and moves to the tail.
                inner.set(key, value, now);
                self.shared.counters.inc_update();
                (Some(old), true)
            }
            None => (None, false),
        }
    }

    fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool) {
        let now = self.shared.clock.now();
        let mut inner = self.shared.inner.write();
        let live = inner
            .map
            .get(&key)
            .filter(|entry| !self.shared.is_expired(entry.stamp, now))
            .map(|entry| entry.value.clone());
        match live {
            Some(existing) => (Some(existing), false),
            None => {
                inner.set(key, value, now);
                self.shared.counters.inc_insert();
                (None, true)
            }
        }
    }

    fn get(&self, key: &K) -> Result<V, CacheError> {
        let now = self.shared.clock.now();
        let inner = self.shared.inner.read();
        match inner.map.get(key) {
            Some(entry) if !self.shared.is_expired(entry.stamp, now) => {
                self.shared.counters.inc_hit();
                Ok(entry.value.clone())
            }
            // Expired entries read as absent; the sweeper will reap them.
            _ => {
                self.shared.counters.inc_miss();
                Err(CacheError::NotFound)
            }
        }
    }

    fn del(&self, key: &K) {
        if self.shared.inner.write().unlink(key).is_some() {
            self.shared.counters.inc_remove();
        }
    }

    fn snapshot(&self) -> HashMap<K, V> {
        self.shared
            .inner
            .read()
            .map
            .iter()
            .map(|(k, entry)| (k.clone(), entry.value.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.shared.inner.read().map.len()
    }
}
