//! Builder for [`Cache`] instances.
//!
//! Collects the size budget, eviction strategy, executor, size
//! calculator, and removal observer, then validates them into a cache.
//!
//! ## Example
//!
//! ```rust
//! use coalcache::builder::CacheBuilder;
//! use coalcache::strategy::Strategy;
//!
//! let cache = CacheBuilder::new(1_000_000)
//!     .strategy(Strategy::Lru)
//!     .size_of(|_key, value: &String| value.len() as u64)
//!     .build();
//!
//! cache.put("greeting".to_string(), "hello".to_string());
//! assert_eq!(cache.size(), 5);
//! ```

use std::hash::Hash;

use crate::cache::{Cache, RemovalObserver, SizeCalculator};
use crate::error::ConfigError;
use crate::strategy::Strategy;

/// Builder for a [`Cache`].
///
/// Every option except the size budget has a default: LRU strategy, the
/// ambient Tokio runtime as executor, a size calculator that charges one
/// unit per entry, and a no-op removal observer.
pub struct CacheBuilder<K, V> {
    max_size: u64,
    strategy: Strategy,
    executor: Option<tokio::runtime::Handle>,
    size_of: SizeCalculator<K, V>,
    on_removed: RemovalObserver<K, V>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder with the given size budget.
    ///
    /// The budget bounds the sum of entry sizes as reported by the size
    /// calculator; with the default calculator it is an entry count.
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            strategy: Strategy::default(),
            executor: None,
            size_of: Box::new(|_, _| 1),
            on_removed: Box::new(|_, _, _, _| {}),
        }
    }

    /// Selects the eviction strategy (default: [`Strategy::Lru`]).
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Runs producers on `handle` instead of the ambient Tokio runtime.
    pub fn executor(mut self, handle: tokio::runtime::Handle) -> Self {
        self.executor = Some(handle);
        self
    }

    /// Sets the per-entry size calculator.
    ///
    /// Invoked with the map mutex held; it must be pure, fast, and
    /// non-blocking, and must return the same size for the same entry
    /// every time it is asked.
    pub fn size_of<F>(mut self, size_of: F) -> Self
    where
        F: Fn(&K, &V) -> u64 + Send + Sync + 'static,
    {
        self.size_of = Box::new(size_of);
        self
    }

    /// Sets the removal observer: `(evicted, key, old_value, new_value)`.
    ///
    /// Fires exactly once per removed entry. For evictions it runs while
    /// the map mutex is held, so it must not call back into the cache.
    pub fn on_removed<F>(mut self, on_removed: F) -> Self
    where
        F: Fn(bool, &K, &V, Option<&V>) + Send + Sync + 'static,
    {
        self.on_removed = Box::new(on_removed);
        self
    }

    /// Builds the cache, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_size` is zero.
    pub fn try_build(self) -> Result<Cache<K, V>, ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::new("max_size must be greater than zero"));
        }
        Ok(Cache::from_parts(
            self.max_size,
            self.strategy,
            self.executor,
            self.size_of,
            self.on_removed,
        ))
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero; use [`try_build`](Self::try_build)
    /// to handle that case gracefully.
    pub fn build(self) -> Cache<K, V> {
        match self.try_build() {
            Ok(cache) => cache,
            Err(err) => panic!("{err}"),
        }
    }
}
