// ==============================================
// PRODUCER COALESCING TESTS (integration)
// ==============================================
//
// Async behavior of the creation registry as seen through the public
// cache surface: join semantics, replacement by value and by newer
// producer, cancellation, and panic isolation. Producers are gated on a
// Notify so tests control exactly when they complete.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use coalcache::builder::CacheBuilder;
use coalcache::cache::Cache;

fn counting_cache() -> (Cache<&'static str, i32>, Arc<Mutex<Vec<(bool, &'static str)>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let cache = CacheBuilder::new(100)
        .on_removed(move |evicted, key, _old, _new| {
            sink.lock().push((evicted, *key));
        })
        .build();
    (cache, calls)
}

// ==============================================
// Coalescing
// ==============================================

#[tokio::test]
async fn concurrent_get_or_put_runs_one_producer() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let runs = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        let runs = Arc::clone(&runs);
        let gate = Arc::clone(&gate);
        tasks.push(tokio::spawn(async move {
            cache
                .get_or_put("k", async move {
                    gate.notified().await;
                    runs.fetch_add(1, Ordering::SeqCst);
                    Some(7)
                })
                .await
        }));
    }

    // The permit is stored even if the winning producer has not reached
    // its await yet.
    gate.notify_one();

    for task in tasks {
        assert_eq!(task.await.unwrap(), Some(7));
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get_if_available(&"k"), Some(7));
}

#[tokio::test]
async fn get_joins_in_flight_producer() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let handle = cache.put_async("k", async move {
        producer_gate.notified().await;
        Some(42)
    });

    let getter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&"k").await })
    };

    gate.notify_one();
    assert_eq!(getter.await.unwrap(), Some(42));
    assert_eq!(handle.join().await, Some(42));
    assert_eq!(cache.get_if_available(&"k"), Some(42));
}

#[tokio::test]
async fn get_or_put_returns_committed_value_without_running_producer() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    cache.put("k", 1);

    let runs = Arc::new(AtomicUsize::new(0));
    let producer_runs = Arc::clone(&runs);
    let value = cache
        .get_or_put("k", async move {
            producer_runs.fetch_add(1, Ordering::SeqCst);
            Some(2)
        })
        .await;

    assert_eq!(value, Some(1));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

// ==============================================
// Replacement
// ==============================================

#[tokio::test]
async fn put_displaces_producer_and_awaiter_sees_value() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let runs = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let producer_runs = Arc::clone(&runs);
    let handle = cache.put_async("k", async move {
        producer_gate.notified().await;
        producer_runs.fetch_add(1, Ordering::SeqCst);
        Some(1)
    });

    assert_eq!(cache.put("k", 2), None);
    assert_eq!(handle.join().await, Some(2));
    assert_eq!(cache.get_if_available(&"k"), Some(2));

    // The displaced producer was dropped before completing; releasing the
    // gate must not resurrect it.
    gate.notify_one();
    tokio::task::yield_now().await;
    assert_eq!(cache.get_if_available(&"k"), Some(2));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn newer_producer_displaces_older_and_awaiters_rejoin() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let first_runs = Arc::new(AtomicUsize::new(0));
    let first_gate = Arc::new(Notify::new());
    let second_gate = Arc::new(Notify::new());

    let gate = Arc::clone(&first_gate);
    let runs = Arc::clone(&first_runs);
    let first = cache.put_async("k", async move {
        gate.notified().await;
        runs.fetch_add(1, Ordering::SeqCst);
        Some(1)
    });

    let gate = Arc::clone(&second_gate);
    let second = cache.put_async("k", async move {
        gate.notified().await;
        Some(2)
    });

    second_gate.notify_one();

    // The awaiter of the displaced producer joins its replacement.
    assert_eq!(first.join().await, Some(2));
    assert_eq!(second.join().await, Some(2));
    assert_eq!(cache.get_if_available(&"k"), Some(2));

    first_gate.notify_one();
    tokio::task::yield_now().await;
    assert_eq!(first_runs.load(Ordering::SeqCst), 0);
}

// ==============================================
// Producer outcomes that commit nothing
// ==============================================

#[tokio::test]
async fn producer_returning_none_commits_nothing() {
    let (cache, removals) = counting_cache();
    let value = cache.put_with("k", async { None }).await;

    assert_eq!(value, None);
    assert_eq!(cache.get_if_available(&"k"), None);
    assert!(cache.under_creation_keys().is_empty());
    assert!(removals.lock().is_empty());
}

#[tokio::test]
async fn panicking_producer_yields_none_and_commits_nothing() {
    let (cache, removals) = counting_cache();
    let value = cache.put_with("k", async { panic!("producer exploded") }).await;

    assert_eq!(value, None);
    assert_eq!(cache.get_if_available(&"k"), None);
    assert!(cache.under_creation_keys().is_empty());
    assert!(removals.lock().is_empty());

    // The key is usable again afterwards.
    assert_eq!(cache.put_with("k", async { Some(3) }).await, Some(3));
}

// ==============================================
// Cancellation
// ==============================================

#[tokio::test]
async fn remove_cancels_in_flight_producer() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let handle = cache.put_async("k", async move {
        producer_gate.notified().await;
        Some(1)
    });

    assert_eq!(cache.remove(&"k"), None);
    assert_eq!(handle.join().await, None);

    gate.notify_one();
    tokio::task::yield_now().await;
    assert_eq!(cache.get_if_available(&"k"), None);
}

#[tokio::test]
async fn clear_cancels_producers_and_empties_map() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    cache.put("present", 1);
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let handle = cache.put_async("pending", async move {
        producer_gate.notified().await;
        Some(2)
    });

    cache.clear();

    assert_eq!(handle.join().await, None);
    assert!(cache.is_empty());
    assert!(cache.under_creation_keys().is_empty());
}

#[tokio::test]
async fn remove_all_under_creation_leaves_committed_entries() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    cache.put("committed", 1);
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let handle = cache.put_async("pending", async move {
        producer_gate.notified().await;
        Some(2)
    });

    cache.remove_all_under_creation();

    assert_eq!(handle.join().await, None);
    assert_eq!(cache.get_if_available(&"committed"), Some(1));
    assert!(cache.under_creation_keys().is_empty());
}

#[tokio::test]
async fn cancelling_an_awaiter_does_not_cancel_the_producer() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let handle = cache.put_async("k", async move {
        producer_gate.notified().await;
        Some(5)
    });

    let awaiter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&"k").await })
    };
    awaiter.abort();
    let _ = awaiter.await;

    // The producer still runs to completion and commits.
    gate.notify_one();
    assert_eq!(handle.join().await, Some(5));
    assert_eq!(cache.get_if_available(&"k"), Some(5));
}

// ==============================================
// Registry / map exclusivity
// ==============================================

#[tokio::test]
async fn key_is_under_creation_or_committed_never_both() {
    let cache: Cache<&str, i32> = CacheBuilder::new(10).build();
    let gate = Arc::new(Notify::new());

    let producer_gate = Arc::clone(&gate);
    let handle = cache.put_async("k", async move {
        producer_gate.notified().await;
        Some(1)
    });

    assert_eq!(cache.under_creation_keys(), vec!["k"]);
    assert!(cache.keys().is_empty());
    assert_eq!(cache.all_keys(), vec!["k"]);

    gate.notify_one();
    assert_eq!(handle.join().await, Some(1));

    assert!(cache.under_creation_keys().is_empty());
    assert_eq!(cache.keys(), vec!["k"]);
    assert_eq!(cache.all_keys(), vec!["k"]);
}

#[tokio::test]
async fn successful_producer_eviction_counts_once() {
    // A committed producer value participates in eviction like any put.
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let cache: Cache<&str, i32> = CacheBuilder::new(2)
        .on_removed(move |evicted, key, _old, _new| {
            sink.lock().push((evicted, *key));
        })
        .build();

    assert_eq!(cache.put_with("a", async { Some(1) }).await, Some(1));
    assert_eq!(cache.put_with("b", async { Some(2) }).await, Some(2));
    assert_eq!(cache.put_with("c", async { Some(3) }).await, Some(3));

    assert_eq!(cache.len(), 2);
    assert_eq!(calls.lock().as_slice(), &[(true, "a")]);
}

// ==============================================
// Mixed concurrent workload
// ==============================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_workload_keeps_cache_consistent() {
    let cache: Cache<u64, u64> = CacheBuilder::new(64).build();

    let mut tasks = Vec::new();
    for worker in 0..8u64 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..200u64 {
                let key = (worker * 31 + i) % 96;
                match i % 5 {
                    0 | 1 => {
                        cache.put(key, i);
                    },
                    2 => {
                        let _ = cache.get(&key).await;
                    },
                    3 => {
                        let _ = cache.get_or_put(key, async move { Some(i) }).await;
                    },
                    _ => {
                        let _ = cache.remove(&key);
                    },
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(cache.size() <= cache.max_size());
    assert_eq!(cache.keys().len(), cache.len());
    assert!(cache.under_creation_keys().is_empty());
}
