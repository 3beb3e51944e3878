//! Prefix-ordered KV engine: a radix-tree index over an owned value arena.
//!
//! Keys are strings compared as raw bytes; the engine answers ordinary
//! [`Cache`] operations in O(|key|) and lexicographic prefix queries in
//! output-proportional time. Values live in a [`ValueArena`], so trie nodes
//! stay small and deleting a key recycles its value slot.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────┐      ┌──────────────────────────┐
//!   │  RadixTree<SlotId>        │      │  ValueArena<V>           │
//!   │  key bytes → terminal ────┼─────►│  slot → value            │
//!   │  nodes carrying slot ids  │      │  free list reuses slots  │
//!   └───────────────────────────┘      └──────────────────────────┘
//!   both behind one RwLock
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::kv::KvCache;
//! use cachemux::traits::{Cache, PrefixSearch};
//!
//! let cache: KvCache<&str> = KvCache::new();
//! cache.set("abra".to_string(), "X");
//! cache.set("cadabra".to_string(), "Y");
//! cache.set("abracadabra".to_string(), "Z");
//!
//! assert_eq!(cache.list_by_prefix("abr").unwrap(), vec!["X", "Z"]);
//! assert_eq!(cache.list_by_prefix("").unwrap(), vec!["X", "Z", "Y"]);
//! ```

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::ds::arena::{SlotId, ValueArena};
use crate::ds::radix::{RadixNode, RadixTree};
use crate::error::CacheError;
use crate::metrics::{CacheCounters, CacheMetrics};
use crate::traits::{Cache, PrefixSearch};

fn key_from_path(bytes: &[u8]) -> String {
    debug_assert!(std::str::from_utf8(bytes).is_ok());
    // SAFETY: a terminal path is byte-for-byte a key that entered through
    // the `String`-keyed public API, so it is valid UTF-8.
    unsafe { String::from_utf8_unchecked(bytes.to_vec()) }
}

#[derive(Debug)]
struct KvInner<V> {
    tree: RadixTree<SlotId>,
    values: ValueArena<V>,
}

impl<V> KvInner<V> {
    /// Upserts `key`; returns `true` when an existing value was replaced.
    fn set_value(&mut self, key: &str, value: V) -> bool {
        match self.tree.get(key.as_bytes()).copied() {
            Some(slot) => {
                if let Some(existing) = self.values.get_mut(slot) {
                    *existing = value;
                }
                true
            }
            None => {
                let slot = self.values.insert(value);
                self.tree.insert(key.as_bytes(), slot);
                false
            }
        }
    }

    fn get_value(&self, key: &str) -> Option<&V> {
        let slot = *self.tree.get(key.as_bytes())?;
        self.values.get(slot)
    }
}

/// Trie-indexed cache that owns its values and supports ordered prefix
/// queries. Operations never fail beyond the `NotFound` miss signal.
#[derive(Debug)]
pub struct KvCache<V> {
    inner: RwLock<KvInner<V>>,
    counters: CacheCounters,
}

impl<V> KvCache<V>
where
    V: Clone + Send + Sync,
{
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(KvInner {
                tree: RadixTree::new(),
                values: ValueArena::new(),
            }),
            counters: CacheCounters::default(),
        }
    }

    /// Returns a snapshot of the engine's operation counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }

    /// Lazily iterates `(key, value)` pairs whose keys start with `prefix`,
    /// in ascending key order.
    ///
    /// The iterator holds the engine's read lock for its entire lifetime:
    /// calling any mutating operation on this cache before dropping the
    /// iterator deadlocks.
    pub fn iter_by_prefix(&self, prefix: &str) -> KvPrefixIter<'_, V> {
        let guard = self.inner.read();
        let mut stack = Vec::new();
        let mut path = Vec::new();
        if let Some((node, full_path)) = guard.tree.locate_prefix(prefix.as_bytes()) {
            let before_segment = full_path.len() - node.segment.len();
            stack.push((node as *const RadixNode<SlotId>, before_segment));
            path = full_path;
        }
        KvPrefixIter { guard, stack, path }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let inner = self.inner.read();
        inner.tree.debug_validate_invariants();
        inner.values.debug_validate_invariants();
        assert_eq!(inner.tree.len(), inner.values.len());
    }
}

impl<V> Default for KvCache<V>
where
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Read-locked iterator over a [`KvCache`] prefix range, ascending by key.
pub struct KvPrefixIter<'a, V> {
    guard: RwLockReadGuard<'a, KvInner<V>>,
    /// Nodes still to visit, with the path length at which their segment
    /// starts; pushed in reverse child order so the leftmost pops first.
    stack: Vec<(*const RadixNode<SlotId>, usize)>,
    path: Vec<u8>,
}

impl<V> Iterator for KvPrefixIter<'_, V>
where
    V: Clone,
{
    type Item = (String, V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((ptr, before_segment)) = self.stack.pop() {
            // SAFETY: the pointer targets a node of the tree behind the read
            // guard this iterator owns; the guard keeps the tree alive and
            // unmodified until the iterator is dropped.
            let node = unsafe { &*ptr };

            self.path.truncate(before_segment);
            self.path.extend_from_slice(&node.segment);
            let depth = self.path.len();
            for child in node.children.iter().rev() {
                self.stack.push((child as *const RadixNode<SlotId>, depth));
            }

            if let Some(slot) = node.value {
                if let Some(value) = self.guard.values.get(slot) {
                    return Some((key_from_path(&self.path), value.clone()));
                }
            }
        }
        None
    }
}

impl<V> Cache<String, V> for KvCache<V>
where
    V: Clone + Send + Sync,
{
    fn set(&self, key: String, value: V) {
        let updated = self.inner.write().set_value(&key, value);
        if updated {
            self.counters.inc_update();
        } else {
            self.counters.inc_insert();
        }
    }

    fn set_if_present(&self, key: String, value: V) -> (Option<V>, bool) {
        let mut inner = self.inner.write();
        match inner.get_value(&key).cloned() {
            Some(old) => {
                inner.set_value(&key, value);
                self.counters.inc_update();
                (Some(old), true)
            }
            None => (None, false),
        }
    }

    fn set_if_absent(&self, key: String, value: V) -> (Option<V>, bool) {
        let mut inner = self.inner.write();
        match inner.get_value(&key).cloned() {
            Some(existing) => (Some(existing), false),
            None => {
                inner.set_value(&key, value);
                self.counters.inc_insert();
                (None, true)
            }
        }
    }

    fn get(&self, key: &String) -> Result<V, CacheError> {
        match self.inner.read().get_value(key) {
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

    fn del(&self, key: &String) {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.tree.remove(key.as_bytes()) {
            // Drops the value and recycles the slot for later inserts.
            inner.values.remove(slot);
            self.counters.inc_remove();
        }
    }

    fn snapshot(&self) -> HashMap<String, V> {
        let inner = self.inner.read();
        let mut out = HashMap::with_capacity(inner.values.len());
        inner.tree.for_each_prefix(b"", |path, &slot| {
            if let Some(value) = inner.values.get(slot) {
                out.insert(key_from_path(path), value.clone());
            }
        });
        out
    }

    fn len(&self) -> usize {
        self.inner.read().values.len()
    }
}

impl<V> PrefixSearch<V> for KvCache<V>
where
    V: Clone + Send + Sync,
{
    fn list_by_prefix(&self, prefix: &str) -> Result<Vec<V>, CacheError> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        inner.tree.for_each_prefix(prefix.as_bytes(), |_, &slot| {
            if let Some(value) = inner.values.get(slot) {
                out.push(value.clone());
            }
        });
        Ok(out)
    }
}
