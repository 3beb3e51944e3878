//! Fixed-capacity ring engine that overwrites the oldest slot.
//!
//! The ring preallocates `capacity` slots and never grows: once full, each
//! write claims the slot under the cursor, evicting whatever occupied it. A
//! side index gives O(1) lookup by key, and enumeration walks the slots in
//! insertion order starting just past the cursor.
//!
//! ## Architecture
//!
//! ```text
//!   slots: [ Some(k4,v4) | Some(k5,v5) | None | Some(k2,v2) | Some(k3,v3) ]
//!                                        ^
//!                                       head (next write position)
//!   index: { k2→3, k3→4, k4→0, k5→1 }
//!
//!   list_all() walks (head+1, head+2, …) mod capacity skipping Nones,
//!   yielding oldest-first: k2, k3, k4, k5.
//! ```
//!
//! ## Key Concepts
//!
//! - `del` empties the slot but does not compact: the hole is reclaimed only
//!   when the cursor passes it again.
//! - `set_if_present` updates a value in place; the cursor and the eviction
//!   order do not move.
//! - [`iter_all`](RingCache::iter_all) holds the engine's read lock for the
//!   iterator's whole lifetime; mutating the ring while iterating deadlocks.
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::ring::RingCache;
//! use cachemux::traits::Cache;
//!
//! let ring = RingCache::new(3);
//! for i in 0..5 {
//!     ring.set(i, i * 10);
//! }
//!
//! // Only the newest three survive.
//! assert!(ring.get(&0).unwrap_err().is_not_found());
//! assert_eq!(ring.list_all_keys(), vec![2, 3, 4]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::error::CacheError;
use crate::metrics::{CacheCounters, CacheMetrics};
use crate::traits::Cache;

#[derive(Debug)]
struct RingInner<K, V> {
    slots: Vec<Option<(K, V)>>,
    index: FxHashMap<K, usize>,
    head: usize,
}

impl<K, V> RingInner<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Writes into the cursor slot, evicting its occupant from the index.
    /// Returns `true` if another live entry was overwritten.
    fn write_at_cursor(&mut self, key: K, value: V) -> bool {
        // Re-inserting an existing key vacates its old slot first, so the
        // index always covers exactly the non-empty slots.
        if let Some(&old_pos) = self.index.get(&key) {
            self.slots[old_pos] = None;
        }
        let capacity = self.slots.len();
        let evicted = match self.slots[self.head].take() {
            Some((old_key, _)) => {
                self.index.remove(&old_key);
                true
            }
            None => false,
        };
        self.index.insert(key.clone(), self.head);
        self.slots[self.head] = Some((key, value));
        self.head = (self.head + 1) % capacity;
        evicted
    }
}

/// Fixed-capacity FIFO cache with O(1) keyed access.
#[derive(Debug)]
pub struct RingCache<K, V> {
    inner: RwLock<RingInner<K, V>>,
    counters: CacheCounters,
}

impl<K, V> RingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a ring holding at most `capacity` entries, all preallocated.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: a ring with no slots cannot accept a
    /// write, so the zero value is a construction bug, not a runtime state.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            inner: RwLock::new(RingInner {
                slots,
                index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
                head: 0,
            }),
            counters: CacheCounters::default(),
        }
    }

    /// Returns the fixed slot count.
    pub fn capacity(&self) -> usize {
        self.inner.read().slots.len()
    }

    /// Returns a snapshot of the engine's operation counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }

    /// Returns all `(key, value)` pairs in insertion order, oldest first.
    pub fn list_all(&self) -> Vec<(K, V)> {
        let inner = self.inner.read();
        let capacity = inner.slots.len();
        let mut out = Vec::with_capacity(inner.index.len());
        for i in 0..capacity {
            if let Some((key, value)) = &inner.slots[(inner.head + i) % capacity] {
                out.push((key.clone(), value.clone()));
            }
        }
        out
    }

    /// Returns all keys in insertion order, oldest first.
    pub fn list_all_keys(&self) -> Vec<K> {
        self.list_all().into_iter().map(|(key, _)| key).collect()
    }

    /// Returns all values in insertion order, oldest first.
    pub fn list_all_values(&self) -> Vec<V> {
        self.list_all().into_iter().map(|(_, value)| value).collect()
    }

    /// Lazily iterates `(key, value)` pairs in insertion order.
    ///
    /// The iterator holds the ring's read lock for its entire lifetime:
    /// calling any mutating operation on this ring before dropping the
    /// iterator deadlocks.
    pub fn iter_all(&self) -> RingIter<'_, K, V> {
        RingIter {
            guard: self.inner.read(),
            offset: 0,
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let inner = self.inner.read();
        let live = inner.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(inner.index.len(), live, "index must cover exactly the live slots");
        assert!(inner.head < inner.slots.len());
        for (key, &pos) in &inner.index {
            match &inner.slots[pos] {
                Some((slot_key, _)) => assert!(slot_key == key, "index entry must point at its key"),
                None => panic!("index points at an empty slot"),
            }
        }
    }
}

/// Read-locked iterator over a [`RingCache`], oldest entry first.
pub struct RingIter<'a, K, V> {
    guard: RwLockReadGuard<'a, RingInner<K, V>>,
    offset: usize,
}

impl<K, V> Iterator for RingIter<'_, K, V>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let capacity = self.guard.slots.len();
        while self.offset < capacity {
            let pos = (self.guard.head + self.offset) % capacity;
            self.offset += 1;
            if let Some((key, value)) = &self.guard.slots[pos] {
                return Some((key.clone(), value.clone()));
            }
        }
        None
    }
}

impl<K, V> Cache<K, V> for RingCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn set(&self, key: K, value: V) {
        let mut inner = self.inner.write();
        let was_present = inner.index.contains_key(&key);
        if inner.write_at_cursor(key, value) {
            self.counters.inc_evictions(1);
        }
        if was_present {
            self.counters.inc_update();
        } else {
            self.counters.inc_insert();
        }
    }

    fn set_if_present(&self, key: K, value: V) -> (Option<V>, bool) {
        let mut inner = self.inner.write();
        let Some(&pos) = inner.index.get(&key) else {
            return (None, false);
        };
        // In-place update: the cursor does not move, eviction order is kept.
        match &mut inner.slots[pos] {
            Some((_, slot_value)) => {
                let old = std::mem::replace(slot_value, value);
                self.counters.inc_update();
                (Some(old), true)
            }
            None => (None, false),
        }
    }

    fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool) {
        let mut inner = self.inner.write();
        if let Some(&pos) = inner.index.get(&key) {
            if let Some((_, existing)) = &inner.slots[pos] {
                return (Some(existing.clone()), false);
            }
        }
        if inner.write_at_cursor(key, value) {
            self.counters.inc_evictions(1);
        }
        self.counters.inc_insert();
        (None, true)
    }

    fn get(&self, key: &K) -> Result<V, CacheError> {
        let inner = self.inner.read();
        let value = inner
            .index
            .get(key)
            .and_then(|&pos| inner.slots[pos].as_ref())
            .map(|(_, value)| value.clone());
        match value {
            Some(value) => {
                self.counters.inc_hit();
                Ok(value)
            }
            None => {
                self.counters.inc_miss();
                Err(CacheError::NotFound)
            }
        }
    }

    fn del(&self, key: &K) {
        let mut inner = self.inner.write();
        if let Some(pos) = inner.index.remove(key) {
            // The slot stays a hole until the cursor wraps back around.
            inner.slots[pos] = None;
            self.counters.inc_remove();
        }
    }

    fn snapshot(&self) -> HashMap<K, V> {
        let inner = self.inner.read();
        inner
            .index
            .iter()
            .filter_map(|(key, &pos)| {
                inner.slots[pos]
                    .as_ref()
                    .map(|(_, value)| (key.clone(), value.clone()))
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.read().index.len()
    }
}
