pub use crate::builder::CacheBuilder;
pub use crate::cache::{Cache, CreationHandle};
pub use crate::ds::{LinkedArena, SlotId};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::store::{ChainMode, OrderedMap};
pub use crate::strategy::Strategy;
