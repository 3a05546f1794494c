//! Concurrency-safe, size-bounded cache with coalesced async value
//! production.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            Cache<K, V>                               │
//! │                                                                      │
//! │   creation mutex (outer)            map mutex (inner)                │
//! │   ┌──────────────────────┐          ┌──────────────────────────────┐ │
//! │   │ Registry<K, V>       │          │ MapState                     │ │
//! │   │  key → in-flight     │          │  entries: OrderedMap<K, V>   │ │
//! │   │  producer handle     │          │  size: running total         │ │
//! │   └──────────┬───────────┘          └──────────────┬───────────────┘ │
//! │              │ spawn                               │ trim            │
//! │              ▼                                     ▼                 │
//! │   driver task on the executor:          eviction walks the chain in  │
//! │   select(cancel line, producer),        the strategy's direction     │
//! │   commit on success                     until size ≤ budget          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lock order
//!
//! Two mutexes guard the cache and are always acquired in the order
//! **creation mutex → map mutex**, never the reverse. Neither lock is
//! held across an `.await`. The size calculator runs under the map mutex
//! and must be pure, fast, and non-blocking.
//!
//! ## Removal observer
//!
//! The observer configured via
//! [`CacheBuilder::on_removed`](crate::builder::CacheBuilder::on_removed)
//! fires exactly once per removed entry:
//!
//! - for evictions, [`evict_all`](Cache::evict_all), and
//!   [`clear`](Cache::clear): synchronously, **while the map mutex is
//!   held**;
//! - for replacements via [`put`](Cache::put) / [`put_all`](Cache::put_all)
//!   and for explicit [`remove`](Cache::remove): after the locks are
//!   released.
//!
//! Because of the first case, the observer must not call back into the
//! cache; doing so risks deadlock.
//!
//! ## Producers
//!
//! A producer is a `Future<Output = Option<V>>` spawned on the configured
//! executor. While it runs, its key is *under creation*: concurrent
//! [`get`](Cache::get) / [`get_or_put`](Cache::get_or_put) calls for the
//! key join the same computation instead of starting another. Starting a
//! second producer or putting a value directly displaces the running
//! producer; awaiters transparently follow the replacement. A producer
//! that yields `None`, panics, or is cancelled commits nothing and its
//! awaiters observe `None`.
//!
//! ## Key lifecycle
//!
//! | From     | Event                       | To                           |
//! |----------|-----------------------------|------------------------------|
//! | absent   | `put(v)`                    | present                      |
//! | absent   | producer started            | creating                     |
//! | creating | producer yields `Some(v)`   | present (committed)          |
//! | creating | producer yields `None`/panic| absent                       |
//! | creating | `put(v)`                    | present (producer displaced) |
//! | creating | new producer started        | creating (prior displaced)   |
//! | present  | `put(v')`                   | present (observer fires)     |
//! | present  | `remove` / evict / `clear`  | absent                       |

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::FutureExt;
use parking_lot::Mutex;

use crate::builder::CacheBuilder;
use crate::creation::{CancelReceiver, Outcome, Registry, ReplacementCause, Settled};
use crate::store::OrderedMap;
use crate::strategy::Strategy;

/// Computes the accounted size of an entry. Must be pure and fast; it is
/// invoked with the map mutex held.
pub type SizeCalculator<K, V> = Box<dyn Fn(&K, &V) -> u64 + Send + Sync>;

/// Observes removals: `(evicted, key, old_value, new_value)`.
///
/// `evicted` is `true` only when the eviction engine (or `evict_all`)
/// removed the entry. `new_value` is `Some` only for replacements where a
/// new value was committed for the same key.
pub type RemovalObserver<K, V> = Box<dyn Fn(bool, &K, &V, Option<&V>) + Send + Sync>;

const INCONSISTENT_SIZE: &str = "size calculator is reporting inconsistent results";

/// Subtracts a charge from the running size, failing loudly if the size
/// calculator produced a larger value on removal than it did on insert.
fn debit(size: u64, amount: u64) -> u64 {
    match size.checked_sub(amount) {
        Some(next) => next,
        None => panic!("{INCONSISTENT_SIZE}"),
    }
}

/// Everything guarded by the map mutex: the ordered entries and the sum
/// of their accounted sizes.
struct MapState<K, V> {
    entries: OrderedMap<K, V>,
    size: u64,
}

pub(crate) struct Inner<K, V> {
    creations: Mutex<Registry<K, V>>,
    map: Mutex<MapState<K, V>>,
    max_size: AtomicU64,
    strategy: Strategy,
    size_of: SizeCalculator<K, V>,
    on_removed: RemovalObserver<K, V>,
    executor: Option<tokio::runtime::Handle>,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn max_size(&self) -> u64 {
        self.max_size.load(Ordering::Relaxed)
    }

    fn get_if_available(&self, key: &K) -> Option<V> {
        self.map.lock().entries.get(key).cloned()
    }

    /// Commits `value` under the map mutex, adjusting the running size by
    /// the delta between the new and the replaced entry.
    fn commit(&self, key: &K, value: V) -> Option<V> {
        let mut map = self.map.lock();
        self.commit_locked(&mut map, key, value)
    }

    fn commit_locked(&self, map: &mut MapState<K, V>, key: &K, value: V) -> Option<V> {
        let added = (self.size_of)(key, &value);
        let replaced = map.entries.insert(key.clone(), value);
        if let Some(old) = &replaced {
            let removed = (self.size_of)(key, old);
            map.size = debit(map.size, removed);
        }
        map.size += added;
        replaced
    }

    /// Evicts entries in the strategy's direction until the accounted
    /// size fits the budget. Observer calls happen under the map mutex.
    fn trim_to(&self, budget: u64) {
        let mut map = self.map.lock();
        if map.size <= budget {
            return;
        }
        let from_newest = self.strategy.evicts_newest();
        let MapState { entries, size } = &mut *map;
        entries.remove_while(from_newest, |key, value| {
            *size = debit(*size, (self.size_of)(&key, &value));
            (self.on_removed)(true, &key, &value, None);
            *size <= budget
        });
        if map.entries.is_empty() {
            assert_eq!(map.size, 0, "{}", INCONSISTENT_SIZE);
        }
    }

    /// Cancels every producer and removes every entry, notifying the
    /// observer per entry with the given `evicted` flag.
    fn drain(&self, evicted: bool) {
        let mut registry = self.creations.lock();
        registry.cancel_all(None);
        let mut map = self.map.lock();
        let from_newest = self.strategy.evicts_newest();
        let MapState { entries, size } = &mut *map;
        entries.remove_while(from_newest, |key, value| {
            *size = debit(*size, (self.size_of)(&key, &value));
            (self.on_removed)(evicted, &key, &value, None);
            false
        });
        assert_eq!(map.size, 0, "{}", INCONSISTENT_SIZE);
    }

    fn spawn<T>(&self, task: T)
    where
        T: Future<Output = ()> + Send + 'static,
    {
        match &self.executor {
            Some(handle) => {
                handle.spawn(task);
            },
            None => {
                tokio::spawn(task);
            },
        }
    }

    /// Registers and spawns a producer for `key`, displacing any producer
    /// already in flight. Must be called with the registry guard held.
    fn start_creation<F>(
        self: &Arc<Self>,
        registry: &mut Registry<K, V>,
        key: K,
        producer: F,
    ) -> Outcome<V>
    where
        F: Future<Output = Option<V>> + Send + 'static,
    {
        registry.cancel(&key, Some(ReplacementCause::Creation));
        let (done_tx, done_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel();
        let outcome = done_rx.shared();
        let id = registry.install(key.clone(), outcome.clone(), cancel_tx);
        let inner = Arc::clone(self);
        self.spawn(async move {
            inner.drive(id, key, producer, cancel_rx, done_tx).await;
        });
        outcome
    }

    /// Runs one producer to its settled outcome: races the cancel line
    /// against the (panic-isolated) producer future, commits on success,
    /// and publishes the outcome to every awaiter.
    async fn drive<F>(
        &self,
        id: u64,
        key: K,
        producer: F,
        mut cancel_rx: CancelReceiver,
        done_tx: oneshot::Sender<Settled<V>>,
    ) where
        F: Future<Output = Option<V>> + Send + 'static,
    {
        let produced = AssertUnwindSafe(producer).catch_unwind();
        tokio::pin!(produced);
        let settled = tokio::select! {
            biased;
            cause = &mut cancel_rx => match cause {
                // Whoever cancelled us already took our registry entry.
                Ok(Some(cause)) => Settled::Replaced(cause),
                Ok(None) | Err(_) => Settled::Cancelled,
            },
            outcome = &mut produced => match outcome {
                Ok(value) => {
                    self.finish(id, &key, value, cancel_rx, done_tx);
                    return;
                },
                Err(_panic) => {
                    self.creations.lock().release_if_owner(&key, id);
                    Settled::Cancelled
                },
            },
        };
        let _ = done_tx.send(settled);
    }

    /// Completion body for a producer that ran to the end. The ownership
    /// check and the commit happen under the creation mutex (map mutex
    /// nested), so the transition from *creating* to *present* is atomic.
    fn finish(
        &self,
        id: u64,
        key: &K,
        value: Option<V>,
        mut cancel_rx: CancelReceiver,
        done_tx: oneshot::Sender<Settled<V>>,
    ) {
        let (owned, replaced) = {
            let mut registry = self.creations.lock();
            if registry.release_if_owner(key, id) {
                let replaced = value.as_ref().and_then(|v| self.commit(key, v.clone()));
                (true, replaced)
            } else {
                (false, None)
            }
        };

        if owned {
            if let Some(old) = &replaced {
                (self.on_removed)(false, key, old, value.as_ref());
            }
            if value.is_some() {
                self.trim_to(self.max_size());
            }
            let _ = done_tx.send(Settled::Finished(value));
        } else {
            // Displaced between completion and the ownership check: the
            // cancel line carries the cause awaiters need to recover.
            let settled = match cancel_rx.try_recv() {
                Ok(Some(cause)) => Settled::Replaced(cause),
                _ => Settled::Cancelled,
            };
            let _ = done_tx.send(settled);
        }
    }

    /// Awaits a producer outcome, following replacements: a producer
    /// displaced by a newer producer forwards its awaiters to the
    /// replacement, one displaced by a direct value reads the map.
    async fn await_outcome(&self, key: &K, outcome: Outcome<V>) -> Option<V> {
        let mut outcome = outcome;
        loop {
            match outcome.await {
                Ok(Settled::Finished(value)) => return value,
                Ok(Settled::Replaced(ReplacementCause::Creation)) => {
                    match self.creations.lock().outcome_of(key) {
                        Some(next) => outcome = next,
                        // The replacement already settled; its value (if
                        // any) is in the map by now.
                        None => return self.get_if_available(key),
                    }
                },
                Ok(Settled::Replaced(ReplacementCause::Value)) => {
                    return self.get_if_available(key);
                },
                Ok(Settled::Cancelled) | Err(_) => return None,
            }
        }
    }
}

/// Concurrency-safe, size-bounded associative cache with coalesced async
/// value production.
///
/// Cloning is cheap and shares the same cache.
///
/// # Example
///
/// ```
/// use coalcache::builder::CacheBuilder;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let cache = CacheBuilder::new(100).build();
///
///     cache.put("config", 1);
///     assert_eq!(cache.get(&"config").await, Some(1));
///
///     // Concurrent callers for the same key share one producer run.
///     let value = cache.get_or_put("weather", async { Some(21) }).await;
///     assert_eq!(value, Some(21));
/// }
/// ```
pub struct Cache<K, V> {
    pub(crate) inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("strategy", &self.inner.strategy)
            .field("size", &self.size())
            .field("max_size", &self.max_size())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts building a cache with the given size budget.
    ///
    /// Shorthand for [`CacheBuilder::new`].
    pub fn builder(max_size: u64) -> CacheBuilder<K, V> {
        CacheBuilder::new(max_size)
    }

    pub(crate) fn from_parts(
        max_size: u64,
        strategy: Strategy,
        executor: Option<tokio::runtime::Handle>,
        size_of: SizeCalculator<K, V>,
        on_removed: RemovalObserver<K, V>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                creations: Mutex::new(Registry::new()),
                map: Mutex::new(MapState {
                    entries: OrderedMap::new(strategy.chain_mode()),
                    size: 0,
                }),
                max_size: AtomicU64::new(max_size),
                strategy,
                size_of,
                on_removed,
                executor,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Returns the committed value for `key` without waiting on any
    /// in-flight producer.
    ///
    /// Under an access-ordered strategy a hit refreshes the entry's
    /// position.
    ///
    /// # Example
    ///
    /// ```
    /// use coalcache::builder::CacheBuilder;
    ///
    /// let cache = CacheBuilder::new(10).build();
    /// cache.put("k", 1);
    /// assert_eq!(cache.get_if_available(&"k"), Some(1));
    /// assert_eq!(cache.get_if_available(&"missing"), None);
    /// ```
    pub fn get_if_available(&self, key: &K) -> Option<V> {
        self.inner.get_if_available(key)
    }

    /// Returns the value for `key`, waiting for an in-flight producer if
    /// one is running.
    ///
    /// If the producer is displaced while this call waits, the call
    /// follows the replacement: it joins the newer producer, or reads the
    /// directly-put value. Cancelling the *caller* does not cancel the
    /// producer; other awaiters may still need it.
    ///
    /// # Example
    ///
    /// ```
    /// use coalcache::builder::CacheBuilder;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let cache = CacheBuilder::new(10).build();
    ///     let handle = cache.put_async("k", async { Some(7) });
    ///     // get() joins the producer started above.
    ///     assert_eq!(cache.get(&"k").await, Some(7));
    ///     assert_eq!(handle.join().await, Some(7));
    /// }
    /// ```
    pub async fn get(&self, key: &K) -> Option<V> {
        let outcome = self.inner.creations.lock().outcome_of(key);
        match outcome {
            Some(outcome) => self.inner.await_outcome(key, outcome).await,
            None => self.inner.get_if_available(key),
        }
    }

    /// As [`get`](Cache::get), substituting `default` for a missing value.
    pub async fn get_or_default(&self, key: &K, default: V) -> V {
        self.get(key).await.unwrap_or(default)
    }

    /// Returns `true` if `key` has a committed value, without touching
    /// access order or in-flight producers.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.map.lock().entries.contains(key)
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Commits `value` for `key`, returning the previously committed
    /// value.
    ///
    /// Any producer in flight for the key is displaced; its awaiters
    /// observe `value`. The removal observer fires for the replaced entry
    /// after the locks are released, then the cache is trimmed back to
    /// its budget.
    ///
    /// # Example
    ///
    /// ```
    /// use coalcache::builder::CacheBuilder;
    ///
    /// let cache = CacheBuilder::new(10).build();
    /// assert_eq!(cache.put("k", 1), None);
    /// assert_eq!(cache.put("k", 2), Some(1));
    /// ```
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let inner = &self.inner;
        let replaced = {
            let mut registry = inner.creations.lock();
            registry.cancel(&key, Some(ReplacementCause::Value));
            inner.commit(&key, value.clone())
        };
        if let Some(old) = &replaced {
            (inner.on_removed)(false, &key, old, Some(&value));
        }
        inner.trim_to(inner.max_size());
        replaced
    }

    /// Runs `producer` for `key` and waits for its outcome.
    ///
    /// Displaces any producer already in flight for the key. Returns the
    /// produced value, or `None` if the producer yielded `None`, panicked,
    /// or was itself displaced with no surviving value.
    ///
    /// # Panics
    ///
    /// Panics if no executor was configured and the call is made outside
    /// a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use coalcache::builder::CacheBuilder;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let cache = CacheBuilder::new(10).build();
    ///     let value = cache.put_with("k", async { Some("fetched") }).await;
    ///     assert_eq!(value, Some("fetched"));
    ///     assert_eq!(cache.get_if_available(&"k"), Some("fetched"));
    /// }
    /// ```
    pub async fn put_with<F>(&self, key: K, producer: F) -> Option<V>
    where
        F: Future<Output = Option<V>> + Send + 'static,
    {
        let outcome = {
            let mut registry = self.inner.creations.lock();
            self.inner.start_creation(&mut registry, key.clone(), producer)
        };
        self.inner.await_outcome(&key, outcome).await
    }

    /// Starts `producer` for `key` and returns a handle immediately.
    ///
    /// The producer runs on the cache's executor whether or not the
    /// handle is awaited; dropping the handle neither cancels nor
    /// detaches it.
    ///
    /// # Panics
    ///
    /// Panics if no executor was configured and the call is made outside
    /// a Tokio runtime.
    pub fn put_async<F>(&self, key: K, producer: F) -> CreationHandle<K, V>
    where
        F: Future<Output = Option<V>> + Send + 'static,
    {
        let outcome = {
            let mut registry = self.inner.creations.lock();
            self.inner.start_creation(&mut registry, key.clone(), producer)
        };
        CreationHandle {
            inner: Arc::clone(&self.inner),
            key,
            outcome,
        }
    }

    /// Returns the value for `key`, running `producer` only if the key is
    /// neither committed nor already under creation.
    ///
    /// Concurrent `get_or_put` calls for the same key therefore invoke at
    /// most one producer and share its outcome.
    ///
    /// # Panics
    ///
    /// Panics if no executor was configured and the call is made outside
    /// a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// use coalcache::builder::CacheBuilder;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let cache = CacheBuilder::new(10).build();
    ///     let runs = Arc::new(AtomicUsize::new(0));
    ///
    ///     for _ in 0..3 {
    ///         let runs = Arc::clone(&runs);
    ///         let value = cache
    ///             .get_or_put("k", async move {
    ///                 runs.fetch_add(1, Ordering::SeqCst);
    ///                 Some(42)
    ///             })
    ///             .await;
    ///         assert_eq!(value, Some(42));
    ///     }
    ///
    ///     // Later calls hit the committed value.
    ///     assert_eq!(runs.load(Ordering::SeqCst), 1);
    /// }
    /// ```
    pub async fn get_or_put<F>(&self, key: K, producer: F) -> Option<V>
    where
        F: Future<Output = Option<V>> + Send + 'static,
    {
        if let Some(value) = self.get(&key).await {
            return Some(value);
        }
        {
            let mut registry = self.inner.creations.lock();
            if !registry.contains(&key) {
                let present = self.inner.map.lock().entries.contains(&key);
                if !present {
                    self.inner.start_creation(&mut registry, key.clone(), producer);
                }
            }
        }
        self.get(&key).await
    }

    /// Commits every `(key, value)` pair in one atomic step with respect
    /// to concurrent readers.
    ///
    /// Producers in flight for the affected keys are displaced. The
    /// removal observer fires once per replaced entry (with the new value)
    /// after the locks are released, then the cache is trimmed.
    ///
    /// # Example
    ///
    /// ```
    /// use coalcache::builder::CacheBuilder;
    ///
    /// let cache = CacheBuilder::new(10).build();
    /// cache.put_all([("a", 1), ("b", 2)]);
    /// assert_eq!(cache.get_if_available(&"b"), Some(2));
    /// ```
    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let inner = &self.inner;
        // Drain the caller's iterator before locking anything; the locks
        // must not be held across arbitrary user code.
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let replaced = {
            let mut registry = inner.creations.lock();
            let mut map = inner.map.lock();
            let mut replaced = Vec::new();
            for (key, value) in entries {
                registry.cancel(&key, Some(ReplacementCause::Value));
                let new_value = value.clone();
                if let Some(old) = inner.commit_locked(&mut map, &key, value) {
                    replaced.push((key, old, new_value));
                }
            }
            replaced
        };
        for (key, old, new) in &replaced {
            (inner.on_removed)(false, key, old, Some(new));
        }
        inner.trim_to(inner.max_size());
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Removes the entry for `key`, cancelling any producer in flight.
    ///
    /// Returns the committed value that was removed, if any. The removal
    /// observer fires after the locks are released.
    pub fn remove(&self, key: &K) -> Option<V> {
        let inner = &self.inner;
        let removed = {
            let mut registry = inner.creations.lock();
            registry.cancel(key, None);
            let mut map = inner.map.lock();
            let removed = map.entries.remove(key);
            if let Some(old) = &removed {
                let charge = (inner.size_of)(key, old);
                map.size = debit(map.size, charge);
            }
            removed
        };
        if let Some(old) = &removed {
            (inner.on_removed)(false, key, old, None);
        }
        removed
    }

    /// Cancels every in-flight producer, leaving committed entries
    /// untouched. Awaiters of the cancelled producers observe `None`.
    pub fn remove_all_under_creation(&self) {
        self.inner.creations.lock().cancel_all(None);
    }

    /// Removes every entry and cancels every producer.
    ///
    /// The observer fires per entry with `evicted = false`.
    pub fn clear(&self) {
        self.inner.drain(false);
    }

    /// Removes every entry and cancels every producer, reporting each
    /// removal to the observer as an eviction (`evicted = true`).
    pub fn evict_all(&self) {
        self.inner.drain(true);
    }

    // ------------------------------------------------------------------
    // Budget
    // ------------------------------------------------------------------

    /// Replaces the size budget and evicts until the cache fits it.
    ///
    /// # Panics
    ///
    /// Panics if `new_max` is zero.
    pub fn resize(&self, new_max: u64) {
        assert!(new_max > 0, "max_size must be greater than zero");
        self.inner.max_size.store(new_max, Ordering::Relaxed);
        self.inner.trim_to(new_max);
    }

    /// Evicts entries in the strategy's direction until the accounted
    /// size is at most `budget`. The configured budget is unchanged.
    ///
    /// Idempotent: trimming to the current size is a no-op.
    pub fn trim_to_size(&self, budget: u64) {
        self.inner.trim_to(budget);
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Sum of the accounted sizes of all committed entries.
    pub fn size(&self) -> u64 {
        self.inner.map.lock().size
    }

    /// The configured size budget.
    pub fn max_size(&self) -> u64 {
        self.inner.max_size()
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.inner.map.lock().entries.len()
    }

    /// Returns `true` if no entry is committed.
    pub fn is_empty(&self) -> bool {
        self.inner.map.lock().entries.is_empty()
    }

    /// The eviction strategy chosen at construction.
    pub fn strategy(&self) -> Strategy {
        self.inner.strategy
    }

    /// Snapshot of the committed keys in the strategy's forward order
    /// (the entries eviction would reach last come first).
    ///
    /// # Example
    ///
    /// ```
    /// use coalcache::builder::CacheBuilder;
    ///
    /// let cache = CacheBuilder::new(10).build();
    /// cache.put("a", 1);
    /// cache.put("b", 2);
    /// // LRU forward order: most recently used first.
    /// assert_eq!(cache.keys(), vec!["b", "a"]);
    /// ```
    pub fn keys(&self) -> Vec<K> {
        let map = self.inner.map.lock();
        let from_newest = !self.inner.strategy.evicts_newest();
        map.entries.keys(from_newest).cloned().collect()
    }

    /// Snapshot of the keys with a producer in flight.
    pub fn under_creation_keys(&self) -> Vec<K> {
        self.inner.creations.lock().keys()
    }

    /// Snapshot of committed keys (forward order) followed by the keys
    /// under creation.
    pub fn all_keys(&self) -> Vec<K> {
        let registry = self.inner.creations.lock();
        let map = self.inner.map.lock();
        let from_newest = !self.inner.strategy.evicts_newest();
        let mut keys: Vec<K> = map.entries.keys(from_newest).cloned().collect();
        keys.extend(registry.keys());
        keys
    }
}

/// Handle to a producer started with [`Cache::put_async`].
///
/// Dropping the handle neither cancels nor detaches the producer; it
/// keeps running and commits on success regardless.
pub struct CreationHandle<K, V> {
    inner: Arc<Inner<K, V>>,
    key: K,
    outcome: Outcome<V>,
}

impl<K, V> CreationHandle<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// The key this producer computes.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Waits for the producer's outcome.
    ///
    /// Follows replacements the same way [`Cache::get`] does: if the
    /// producer was displaced by a newer producer the call joins it, and
    /// if it was displaced by a direct value the call returns that value.
    pub async fn join(self) -> Option<V> {
        self.inner.await_outcome(&self.key, self.outcome).await
    }
}

impl<K, V> fmt::Debug for CreationHandle<K, V>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreationHandle")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
