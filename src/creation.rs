//! In-flight producer registry.
//!
//! Tracks at most one running producer per key. Every awaiter of a
//! producer holds a clone of a [`Shared`] oneshot receiver that resolves
//! to a [`Settled`] outcome, so concurrent requests for the same key join
//! one computation instead of duplicating it.
//!
//! Displacing a producer (by a newer producer or by a direct value) is
//! signalled through a structured [`ReplacementCause`] on a dedicated
//! cancel line, never through the runtime's task-cancellation machinery:
//! awaiters pattern-match the cause to decide whether to re-join the
//! replacement or to read the committed value.
//!
//! ```text
//!   registry (guarded by the cache's creation mutex)
//!   ┌───────┬──────────────────────────────────────────────┐
//!   │  key  │ Creation { id, outcome, cancel }             │
//!   ├───────┼──────────────────────────────────────────────┤
//!   │ "k1"  │ id: 7,  outcome: Shared<Receiver<Settled>>   │
//!   │ "k2"  │ id: 9,  outcome: Shared<Receiver<Settled>>   │
//!   └───────┴──────────────────────────────────────────────┘
//!                       ▲                      │ cancel(cause)
//!            awaiters clone the outcome        ▼
//!            driver task: select(cancel line, producer future)
//! ```
//!
//! The `id` is a registry-scoped counter: a producer that finishes checks
//! it still owns its key before committing, so a finished producer that
//! was displaced mid-completion never clobbers its replacement.

use std::hash::Hash;

use futures::channel::oneshot;
use futures::future::Shared;
use rustc_hash::FxHashMap;

/// Why a running producer was displaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplacementCause {
    /// A newer producer was started for the same key.
    Creation,
    /// A value was put directly for the same key.
    Value,
}

/// Final outcome of a producer, as observed by every awaiter.
#[derive(Debug, Clone)]
pub(crate) enum Settled<V> {
    /// The producer ran to completion; `None` means it yielded no value.
    Finished(Option<V>),
    /// The producer was displaced; the cause tells awaiters how to recover.
    Replaced(ReplacementCause),
    /// The producer panicked or was cancelled outright (remove/clear).
    Cancelled,
}

/// Outcome channel shared by all awaiters of one producer.
pub(crate) type Outcome<V> = Shared<oneshot::Receiver<Settled<V>>>;

/// Sender half of a producer's cancel line. `None` is an outright
/// cancellation; `Some(cause)` is a replacement.
pub(crate) type CancelSender = tokio::sync::oneshot::Sender<Option<ReplacementCause>>;

/// Receiver half of a producer's cancel line, selected against the
/// producer future by the driver task.
pub(crate) type CancelReceiver = tokio::sync::oneshot::Receiver<Option<ReplacementCause>>;

/// One in-flight producer.
pub(crate) struct Creation<V> {
    id: u64,
    outcome: Outcome<V>,
    cancel: Option<CancelSender>,
}

impl<V> Creation<V> {
    fn cancel(mut self, cause: Option<ReplacementCause>) {
        if let Some(line) = self.cancel.take() {
            // The driver may already have finished; a dead line is fine.
            let _ = line.send(cause);
        }
    }
}

/// Map of in-flight producers, keyed by cache key.
///
/// Not synchronized; the cache guards it with its creation mutex, which
/// is the outer lock of the cache's two-lock order.
pub(crate) struct Registry<K, V> {
    entries: FxHashMap<K, Creation<V>>,
    next_id: u64,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            next_id: 0,
        }
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Clones the outcome channel for `key`, if a producer is in flight.
    pub(crate) fn outcome_of(&self, key: &K) -> Option<Outcome<V>> {
        self.entries.get(key).map(|c| c.outcome.clone())
    }

    /// Registers a new producer for `key` and returns its registry id.
    ///
    /// Any previous entry for the key must have been cancelled first.
    pub(crate) fn install(&mut self, key: K, outcome: Outcome<V>, cancel: CancelSender) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let prior = self.entries.insert(
            key,
            Creation {
                id,
                outcome,
                cancel: Some(cancel),
            },
        );
        debug_assert!(prior.is_none(), "installed over a live producer");
        id
    }

    /// Removes and cancels the producer for `key`; returns `true` if one
    /// was in flight.
    pub(crate) fn cancel(&mut self, key: &K, cause: Option<ReplacementCause>) -> bool {
        match self.entries.remove(key) {
            Some(creation) => {
                creation.cancel(cause);
                true
            },
            None => false,
        }
    }

    /// Removes and cancels every in-flight producer.
    pub(crate) fn cancel_all(&mut self, cause: Option<ReplacementCause>) {
        for (_, creation) in self.entries.drain() {
            creation.cancel(cause);
        }
    }

    /// Deregisters `key` if it is still owned by the producer with `id`.
    ///
    /// Returns `true` when the caller was the owner; `false` means the
    /// key was displaced or removed while the producer ran.
    pub(crate) fn release_if_owner(&mut self, key: &K, id: u64) -> bool {
        match self.entries.get(key) {
            Some(creation) if creation.id == id => {
                self.entries.remove(key);
                true
            },
            _ => false,
        }
    }

    /// Snapshot of the keys with a producer in flight.
    pub(crate) fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }
}
