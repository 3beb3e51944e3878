// ==============================================
// UPDATER CONCURRENCY TESTS (integration)
// ==============================================
//
// The load-bearing properties of the single-flight wrapper: one loader
// invocation per hot key regardless of caller count, loader concurrency
// bounded by the pool, and waiters observing the loaded value after the
// completion signal. These need real threads and cannot live inline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cachemux::engine::map::MapCache;
use cachemux::traits::Cache;
use cachemux::wrap::updater::Updater;

/// Tracks how many loads run right now and the highest ever observed.
#[derive(Default)]
struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn hot_key_loads_exactly_once() {
    let probe = Arc::new(ConcurrencyProbe::default());
    let loader_probe = probe.clone();
    let cache = Arc::new(Updater::new(MapCache::new(), 4, move |key: &String| {
        loader_probe.enter();
        thread::sleep(Duration::from_millis(50));
        loader_probe.exit();
        Ok(key.clone())
    }));

    let workers = 100;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let cache = cache.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get(&"k".to_string()).unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "k");
    }

    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn distinct_keys_saturate_exactly_the_pool() {
    const POOL: usize = 4;
    const KEYS: usize = 16;

    let probe = Arc::new(ConcurrencyProbe::default());
    let loader_probe = probe.clone();
    let cache = Arc::new(Updater::new(MapCache::new(), POOL, move |key: &String| {
        loader_probe.enter();
        thread::sleep(Duration::from_millis(40));
        loader_probe.exit();
        Ok(key.clone())
    }));

    let barrier = Arc::new(Barrier::new(KEYS));
    let mut handles = Vec::new();
    for i in 0..KEYS {
        let cache = cache.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get(&format!("key:{i}")).unwrap()
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(probe.calls.load(Ordering::SeqCst), KEYS);
    assert_eq!(
        probe.peak.load(Ordering::SeqCst),
        POOL,
        "loader concurrency must reach and never exceed the pool size"
    );
}

#[test]
fn waiters_see_the_value_written_by_the_leader() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let cache = Arc::new(Updater::new(MapCache::new(), 2, move |_key: &String| {
        counted.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        Ok(42)
    }));

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get(&"answer".to_string()).unwrap()
        }));
    }
    for handle in handles {
        // Nobody may observe a half-written state: every waiter gets the
        // leader's value via the post-completion cache read.
        assert_eq!(handle.join().unwrap(), 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_loads_release_waiters_and_retry_later() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let cache = Arc::new(Updater::new(
        MapCache::<String, String>::new(),
        2,
        move |key: &String| {
            let call = counted.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            if call == 0 {
                Err("first attempt fails".into())
            } else {
                Ok(format!("ok:{key}"))
            }
        },
    ));

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get(&"k".to_string())
        }));
    }

    let mut failures = 0;
    for handle in handles {
        if handle.join().unwrap().is_err() {
            failures += 1;
        }
    }
    // The leader of the first flight fails; waiters re-read the cache and
    // miss. Nothing was cached, so the error was not sticky:
    assert!(failures >= 1);
    assert_eq!(cache.get(&"k".to_string()).unwrap(), "ok:k");
}

#[test]
fn loads_write_through_to_the_shared_inner_cache() {
    let cache = Updater::new(MapCache::new(), 2, |key: &String| Ok(key.len()));
    assert_eq!(cache.get(&"four".to_string()).unwrap(), 4);

    // The value is in the wrapped cache itself, not private updater state.
    assert_eq!(cache.inner().get(&"four".to_string()).unwrap(), 4);
    assert_eq!(cache.snapshot().len(), 1);
}
