//! Eviction strategies: chain mode plus traversal directions.
//!
//! A strategy decides two things about the entry chain:
//!
//! 1. **Chain mode** — whether the chain tracks access recency or pure
//!    insertion order ([`ChainMode`]).
//! 2. **Eviction end** — which end of the chain the eviction engine pops
//!    first when the cache is over budget.
//!
//! Key enumeration always walks the chain from the *opposite* end, so
//! `keys()` starts with the entries that would survive eviction longest.
//!
//! | Strategy | Chain mode | Evicts from     | `keys()` forward order    |
//! |----------|------------|-----------------|---------------------------|
//! | `Lru`    | access     | least recent    | most → least recent       |
//! | `Mru`    | access     | most recent     | least → most recent       |
//! | `Fifo`   | insertion  | oldest inserted | newest → oldest inserted  |
//! | `Filo`   | insertion  | newest inserted | oldest → newest inserted  |

use crate::store::ChainMode;

/// Replacement strategy for a cache.
///
/// # Example
///
/// ```
/// use coalcache::strategy::Strategy;
///
/// assert_eq!(Strategy::default(), Strategy::Lru);
/// assert!(!Strategy::Fifo.uses_access_order());
/// assert!(Strategy::Mru.evicts_newest());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Evict the least recently used entry first.
    #[default]
    Lru,
    /// Evict the most recently used entry first.
    Mru,
    /// Evict the oldest inserted entry first; access does not reorder.
    Fifo,
    /// Evict the newest inserted entry first; access does not reorder.
    Filo,
}

impl Strategy {
    /// Returns `true` if lookups reorder the chain.
    pub fn uses_access_order(self) -> bool {
        matches!(self, Strategy::Lru | Strategy::Mru)
    }

    /// Chain mode the primary map must maintain for this strategy.
    pub fn chain_mode(self) -> ChainMode {
        if self.uses_access_order() {
            ChainMode::Access
        } else {
            ChainMode::Insertion
        }
    }

    /// Returns `true` if eviction pops the newest end of the chain.
    pub fn evicts_newest(self) -> bool {
        matches!(self, Strategy::Mru | Strategy::Filo)
    }
}
