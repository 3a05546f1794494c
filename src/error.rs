//! Error types for the coalcache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are
//!   invalid (e.g. a zero size budget).
//! - [`InvariantError`]: Returned when internal data-structure invariants
//!   are violated (`check_invariants` methods used by tests).
//!
//! ## Example Usage
//!
//! ```
//! use coalcache::builder::CacheBuilder;
//! use coalcache::cache::Cache;
//! use coalcache::error::ConfigError;
//!
//! // Fallible constructor for user-configurable parameters
//! let cache: Result<Cache<String, i32>, ConfigError> =
//!     CacheBuilder::new(100).try_build();
//! assert!(cache.is_ok());
//!
//! // A zero budget is caught without panicking
//! let bad = CacheBuilder::<String, i32>::new(0).try_build();
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build).
/// Carries a human-readable description of which parameter failed
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by `check_invariants` methods such as
/// [`OrderedMap::check_invariants`](crate::store::OrderedMap::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("max_size must be greater than zero");
        assert_eq!(err.to_string(), "max_size must be greater than zero");
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("chain length mismatch");
        assert_eq!(err.to_string(), "chain length mismatch");
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
        assert_error::<InvariantError>();
    }

    #[test]
    fn clone_and_eq() {
        let a = ConfigError::new("x");
        assert_eq!(a.clone(), a);
        let b = InvariantError::new("y");
        assert_eq!(b.clone(), b);
    }
}
