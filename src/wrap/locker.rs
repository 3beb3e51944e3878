//! Scoped read/write transactions over any cache.
//!
//! `Locker` wraps a cache with one reader-writer lock and hands out
//! transaction guards: [`lock`](Locker::lock) returns a [`WriteTx`] exposing
//! the full cache surface, [`rlock`](Locker::rlock) a [`ReadTx`] exposing
//! only the read operations. All operations issued through one guard are
//! atomic with respect to every other guard from the same locker.
//!
//! This is not a rollback transaction: writes land in the underlying cache
//! immediately and become visible to others when the guard drops
//! (read-committed-on-release).
//!
//! The misuse cases (writing through a read transaction, using a released
//! transaction, releasing twice) are unrepresentable: a `ReadTx` has no
//! write methods, and release is the guard's `Drop`, which the compiler
//! lets happen exactly once and which runs on every exit path, panics
//! included. The inner cache's own lock still exists underneath; it becomes
//! redundant inside a transaction but never incorrect.
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::map::MapCache;
//! use cachemux::wrap::locker::Locker;
//!
//! let locker = Locker::new(MapCache::new());
//!
//! // Atomic read-modify-write across two keys.
//! {
//!     let tx = locker.lock();
//!     let a: i32 = tx.get(&"a").unwrap_or(0);
//!     tx.set("a", a + 10);
//!     tx.set("b", a);
//! } // released here
//!
//! let tx = locker.rlock();
//! assert_eq!(tx.get(&"a").unwrap(), 10);
//! ```

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::CacheError;
use crate::traits::{Cache, PrefixSearch};

/// Wraps a cache with a lock whose scopes span multiple operations.
pub struct Locker<C> {
    cache: C,
    lock: RwLock<()>,
}

impl<C> Locker<C> {
    /// Wraps `cache`.
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            lock: RwLock::new(()),
        }
    }

    /// Opens a write transaction, blocking until the lock is exclusive.
    pub fn lock(&self) -> WriteTx<'_, C> {
        WriteTx {
            cache: &self.cache,
            _guard: self.lock.write(),
        }
    }

    /// Opens a read transaction, blocking while a write transaction is open.
    pub fn rlock(&self) -> ReadTx<'_, C> {
        ReadTx {
            cache: &self.cache,
            _guard: self.lock.read(),
        }
    }
}

/// Exclusive transaction handle; released by dropping.
pub struct WriteTx<'a, C> {
    cache: &'a C,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl<C> WriteTx<'_, C> {
    pub fn set<K, V>(&self, key: K, value: V)
    where
        C: Cache<K, V>,
    {
        self.cache.set(key, value);
    }

    pub fn set_if_present<K, V>(&self, key: K, value: V) -> (Option<V>, bool)
    where
        C: Cache<K, V>,
    {
        self.cache.set_if_present(key, value)
    }

    pub fn set_if_absent<K, V>(&self, key: K, value: V) -> (Option<V>, bool)
    where
        C: Cache<K, V>,
    {
        self.cache.set_if_absent(key, value)
    }

    pub fn get<K, V>(&self, key: &K) -> Result<V, CacheError>
    where
        C: Cache<K, V>,
    {
        self.cache.get(key)
    }

    pub fn del<K, V>(&self, key: &K)
    where
        C: Cache<K, V>,
    {
        self.cache.del(key);
    }

    pub fn snapshot<K, V>(&self) -> HashMap<K, V>
    where
        C: Cache<K, V>,
    {
        self.cache.snapshot()
    }

    pub fn len<K, V>(&self) -> usize
    where
        C: Cache<K, V>,
    {
        Cache::<K, V>::len(self.cache)
    }

    pub fn list_by_prefix<V>(&self, prefix: &str) -> Result<Vec<V>, CacheError>
    where
        C: PrefixSearch<V>,
    {
        self.cache.list_by_prefix(prefix)
    }
}

/// Shared transaction handle; exposes only the read operations.
pub struct ReadTx<'a, C> {
    cache: &'a C,
    _guard: RwLockReadGuard<'a, ()>,
}

impl<C> ReadTx<'_, C> {
    pub fn get<K, V>(&self, key: &K) -> Result<V, CacheError>
    where
        C: Cache<K, V>,
    {
        self.cache.get(key)
    }

    pub fn snapshot<K, V>(&self) -> HashMap<K, V>
    where
        C: Cache<K, V>,
    {
        self.cache.snapshot()
    }

    pub fn len<K, V>(&self) -> usize
    where
        C: Cache<K, V>,
    {
        Cache::<K, V>::len(self.cache)
    }

    pub fn list_by_prefix<V>(&self, prefix: &str) -> Result<Vec<V>, CacheError>
    where
        C: PrefixSearch<V>,
    {
        self.cache.list_by_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::map::MapCache;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn write_tx_sees_own_writes() {
        let locker = Locker::new(MapCache::new());
        let tx = locker.lock();
        tx.set("k", 1);
        assert_eq!(tx.get(&"k").unwrap(), 1);
        tx.del(&"k");
        assert!(tx.get(&"k").unwrap_err().is_not_found());
    }

    #[test]
    fn read_txs_run_concurrently() {
        let locker = Arc::new(Locker::new(MapCache::new()));
        locker.lock().set("k", 1);

        let outer = locker.rlock();
        // A second reader must not block behind the first.
        let inner = locker.rlock();
        assert_eq!(outer.get(&"k").unwrap(), 1);
        assert_eq!(inner.get(&"k").unwrap(), 1);
    }

    #[test]
    fn write_tx_excludes_readers_until_release() {
        let locker = Arc::new(Locker::new(MapCache::new()));
        let released = Arc::new(AtomicBool::new(false));

        let tx = locker.lock();
        tx.set("k", 1);

        let reader_locker = locker.clone();
        let reader_released = released.clone();
        let reader = thread::spawn(move || {
            let tx = reader_locker.rlock();
            // The write transaction must have been dropped before the read
            // lock was granted.
            assert!(reader_released.load(Ordering::SeqCst));
            tx.get(&"k").unwrap()
        });

        thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        drop(tx);

        assert_eq!(reader.join().unwrap(), 1);
    }

    #[test]
    fn guard_releases_on_panic() {
        let locker = Arc::new(Locker::new(MapCache::new()));
        let panicking = locker.clone();
        let result = thread::spawn(move || {
            let tx = panicking.lock();
            tx.set("k", 1);
            panic!("die with the lock held");
        })
        .join();
        assert!(result.is_err());

        // The lock must have been released by the unwinding guard.
        let tx = locker.lock();
        assert_eq!(tx.get(&"k").unwrap(), 1);
    }

    #[test]
    fn prefix_search_available_through_transactions() {
        use crate::engine::kv::KvCache;

        let locker = Locker::new(KvCache::new());
        {
            let tx = locker.lock();
            tx.set("a1".to_string(), 1);
            tx.set("a2".to_string(), 2);
        }
        let tx = locker.rlock();
        assert_eq!(tx.list_by_prefix("a").unwrap(), vec![1, 2]);
    }
}
