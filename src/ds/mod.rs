pub mod linked_arena;

pub use linked_arena::{ChainIter, LinkedArena, SlotId};
