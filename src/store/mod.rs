//! Primary storage for the cache.
//!
//! The store owns key/value data and chain order; the cache layers size
//! accounting, eviction strategy, and concurrency on top of it.

pub mod ordered;

pub use ordered::{ChainMode, OrderedMap};
