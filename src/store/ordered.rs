//! Ordered keyed map: hash index over an arena-linked entry chain.
//!
//! `OrderedMap` is the primary store of the cache. It pairs an `FxHashMap`
//! index (key → slot) with a [`LinkedArena`] chain threaded through the
//! entry slots, so keyed lookup, removal, and reordering are all O(1)
//! while the chain keeps every entry in eviction order.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        OrderedMap<K, V> Layout                      │
//! │                                                                     │
//! │   index: FxHashMap<K, SlotId>        chain: LinkedArena<Entry>      │
//! │                                                                     │
//! │   ┌──────────┬──────────┐            ┌────────┬───────────────┐     │
//! │   │   Key    │  SlotId  │            │ SlotId │ { key, value }│     │
//! │   ├──────────┼──────────┤            ├────────┼───────────────┤     │
//! │   │  "a"     │    0     │───────────►│   0    │ "a" → 1       │     │
//! │   │  "b"     │    1     │───────────►│   1    │ "b" → 2       │     │
//! │   │  "c"     │    2     │───────────►│   2    │ "c" → 3       │     │
//! │   └──────────┴──────────┘            └────────┴───────────────┘     │
//! │                                                                     │
//! │   oldest ─► ["a"] ◄──► ["b"] ◄──► ["c"] ◄── newest                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Chain modes
//!
//! The chain reflects either *access* order or *insertion* order, chosen
//! at construction via [`ChainMode`]:
//!
//! | Mode        | `insert` (new) | `insert` (replace) | `get`          |
//! |-------------|----------------|--------------------|----------------|
//! | `Access`    | newest end     | moves to newest    | moves to newest|
//! | `Insertion` | newest end     | keeps position     | keeps position |
//!
//! Both eviction and enumeration pick a traversal direction at the call
//! site (`remove_while`, `keys`), so one map serves all four eviction
//! strategies.
//!
//! ## Operations
//!
//! | Operation      | Time   | Notes                                   |
//! |----------------|--------|-----------------------------------------|
//! | `insert`       | O(1)   | Returns replaced value                  |
//! | `get` / `peek` | O(1)   | `get` reorders in `Access` mode         |
//! | `remove`       | O(1)   | Unlinks from chain                      |
//! | `remove_while` | O(k)   | Pops k entries from the chosen end      |
//! | `keys`         | O(n)   | Lazy walk in either direction           |
//!
//! ## Thread Safety
//!
//! Not thread-safe; the cache guards it with its map mutex.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{LinkedArena, SlotId};
use crate::error::InvariantError;

/// Ordering discipline maintained by the entry chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// Chain reflects access recency: hits move entries to the newest end.
    Access,
    /// Chain reflects insertion order: hits and replacements keep position.
    Insertion,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Associative container whose entries form a doubly linked chain in
/// access or insertion order.
///
/// # Example
///
/// ```
/// use coalcache::store::{ChainMode, OrderedMap};
///
/// let mut map = OrderedMap::new(ChainMode::Access);
/// map.insert("a", 1);
/// map.insert("b", 2);
///
/// // Access moves "a" to the newest end.
/// assert_eq!(map.get(&"a"), Some(&1));
/// let order: Vec<_> = map.keys(false).copied().collect();
/// assert_eq!(order, ["b", "a"]);
/// ```
#[derive(Debug)]
pub struct OrderedMap<K, V> {
    index: FxHashMap<K, SlotId>,
    chain: LinkedArena<Entry<K, V>>,
    mode: ChainMode,
}

impl<K, V> OrderedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty map with the given chain mode.
    pub fn new(mode: ChainMode) -> Self {
        Self {
            index: FxHashMap::default(),
            chain: LinkedArena::new(),
            mode,
        }
    }

    /// Creates an empty map with reserved capacity.
    pub fn with_capacity(mode: ChainMode, capacity: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            chain: LinkedArena::with_capacity(capacity),
            mode,
        }
    }

    /// Returns the chain mode chosen at construction.
    pub fn mode(&self) -> ChainMode {
        self.mode
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` if the key is present, without touching the chain.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or replaces a value, returning the previous value.
    ///
    /// New entries enter at the newest end of the chain. In `Access` mode
    /// a replacement also moves the entry to the newest end; in
    /// `Insertion` mode a replacement keeps its chain position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&id) = self.index.get(&key) {
            let old = self
                .chain
                .get_mut(id)
                .map(|entry| std::mem::replace(&mut entry.value, value));
            if self.mode == ChainMode::Access {
                self.chain.move_to_newest(id);
            }
            return old;
        }

        let id = self.chain.push_newest(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);
        None
    }

    /// Returns a reference to the value for `key`.
    ///
    /// In `Access` mode a hit moves the entry to the newest end.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        if self.mode == ChainMode::Access {
            self.chain.move_to_newest(id);
        }
        self.chain.get(id).map(|entry| &entry.value)
    }

    /// Returns a reference to the value for `key` without reordering.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.chain.get(id).map(|entry| &entry.value)
    }

    /// Removes the entry for `key`, unlinking it from the chain.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.chain.remove(id).map(|entry| entry.value)
    }

    /// Pops entries from one end of the chain, handing each removed
    /// `(key, value)` to `visit`, until `visit` returns `true` or the map
    /// is empty.
    ///
    /// Each entry is removed from the map *before* `visit` observes it,
    /// so the callback sees a store that no longer contains the entry.
    pub fn remove_while<F>(&mut self, from_newest: bool, mut visit: F)
    where
        F: FnMut(K, V) -> bool,
    {
        loop {
            let entry = if from_newest {
                self.chain.pop_newest()
            } else {
                self.chain.pop_oldest()
            };
            let Some(entry) = entry else { break };
            self.index.remove(&entry.key);
            if visit(entry.key, entry.value) {
                break;
            }
        }
    }

    /// Iterates keys in chain order, from the newest or the oldest end.
    pub fn keys(&self, from_newest: bool) -> impl Iterator<Item = &K> {
        let iter = if from_newest {
            self.chain.iter_newest_first()
        } else {
            self.chain.iter_oldest_first()
        };
        iter.map(|entry| &entry.key)
    }

    /// Removes all entries without visiting them.
    pub fn clear(&mut self) {
        self.index.clear();
        self.chain.clear();
    }

    /// Verifies that the index and the chain agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.chain.len() {
            return Err(InvariantError::new(format!(
                "index has {} entries but chain has {}",
                self.index.len(),
                self.chain.len()
            )));
        }
        let mut walked = 0usize;
        for entry in self.chain.iter_oldest_first() {
            walked += 1;
            match self.index.get(&entry.key) {
                Some(&id) if self.chain.get(id).map(|e| &e.key) == Some(&entry.key) => {},
                Some(_) => {
                    return Err(InvariantError::new("index slot does not hold its key"));
                },
                None => {
                    return Err(InvariantError::new("chained key missing from index"));
                },
            }
        }
        if walked != self.index.len() {
            return Err(InvariantError::new(format!(
                "chain walk visited {} entries, index has {}",
                walked,
                self.index.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_oldest_first(map: &OrderedMap<&'static str, i32>) -> Vec<&'static str> {
        map.keys(false).copied().collect()
    }

    // ==============================================
    // Access mode
    // ==============================================

    mod access_mode {
        use super::*;

        #[test]
        fn get_moves_entry_to_newest() {
            let mut map = OrderedMap::new(ChainMode::Access);
            map.insert("a", 1);
            map.insert("b", 2);
            map.insert("c", 3);

            assert_eq!(map.get(&"a"), Some(&1));
            assert_eq!(keys_oldest_first(&map), vec!["b", "c", "a"]);
        }

        #[test]
        fn replace_moves_entry_to_newest() {
            let mut map = OrderedMap::new(ChainMode::Access);
            map.insert("a", 1);
            map.insert("b", 2);

            assert_eq!(map.insert("a", 10), Some(1));
            assert_eq!(keys_oldest_first(&map), vec!["b", "a"]);
            assert_eq!(map.peek(&"a"), Some(&10));
        }

        #[test]
        fn peek_does_not_reorder() {
            let mut map = OrderedMap::new(ChainMode::Access);
            map.insert("a", 1);
            map.insert("b", 2);

            assert_eq!(map.peek(&"a"), Some(&1));
            assert_eq!(keys_oldest_first(&map), vec!["a", "b"]);
        }
    }

    // ==============================================
    // Insertion mode
    // ==============================================

    mod insertion_mode {
        use super::*;

        #[test]
        fn get_keeps_position() {
            let mut map = OrderedMap::new(ChainMode::Insertion);
            map.insert("a", 1);
            map.insert("b", 2);

            assert_eq!(map.get(&"a"), Some(&1));
            assert_eq!(keys_oldest_first(&map), vec!["a", "b"]);
        }

        #[test]
        fn replace_keeps_position() {
            let mut map = OrderedMap::new(ChainMode::Insertion);
            map.insert("a", 1);
            map.insert("b", 2);

            assert_eq!(map.insert("a", 10), Some(1));
            assert_eq!(keys_oldest_first(&map), vec!["a", "b"]);
            assert_eq!(map.peek(&"a"), Some(&10));
        }
    }

    // ==============================================
    // Removal and traversal
    // ==============================================

    #[test]
    fn remove_unlinks_entry() {
        let mut map = OrderedMap::new(ChainMode::Access);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);

        assert_eq!(map.remove(&"b"), Some(2));
        assert_eq!(map.remove(&"b"), None);
        assert_eq!(keys_oldest_first(&map), vec!["a", "c"]);
        assert!(map.check_invariants().is_ok());
    }

    #[test]
    fn remove_while_from_oldest_stops_on_done() {
        let mut map = OrderedMap::new(ChainMode::Insertion);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);

        let mut seen = Vec::new();
        map.remove_while(false, |k, v| {
            seen.push((k, v));
            seen.len() == 2
        });

        assert_eq!(seen, vec![("a", 1), ("b", 2)]);
        assert_eq!(keys_oldest_first(&map), vec!["c"]);
    }

    #[test]
    fn remove_while_from_newest_drains_everything() {
        let mut map = OrderedMap::new(ChainMode::Insertion);
        map.insert("a", 1);
        map.insert("b", 2);

        let mut seen = Vec::new();
        map.remove_while(true, |k, _| {
            seen.push(k);
            false
        });

        assert_eq!(seen, vec!["b", "a"]);
        assert!(map.is_empty());
        assert!(map.check_invariants().is_ok());
    }

    #[test]
    fn keys_direction() {
        let mut map = OrderedMap::new(ChainMode::Insertion);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);

        let newest_first: Vec<_> = map.keys(true).copied().collect();
        assert_eq!(newest_first, vec!["c", "b", "a"]);
    }

    #[test]
    fn clear_empties_map() {
        let mut map = OrderedMap::new(ChainMode::Access);
        map.insert("a", 1);
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains(&"a"));
        assert!(map.check_invariants().is_ok());
    }

    #[test]
    fn slot_reuse_keeps_index_consistent() {
        let mut map = OrderedMap::new(ChainMode::Access);
        map.insert("a", 1);
        map.insert("b", 2);
        map.remove(&"a");
        map.insert("c", 3);
        map.get(&"b");

        assert_eq!(map.peek(&"c"), Some(&3));
        assert_eq!(keys_oldest_first(&map), vec!["c", "b"]);
        assert!(map.check_invariants().is_ok());
    }
}
