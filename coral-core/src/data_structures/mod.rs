//! Data structures for the shard index.
//!
//! # Organization
//!
//! - [`sorted`] - The concurrent skip list, its accessor, iterator and cursor
//! - [`comparator`] - Element orderings
//! - [`internal`] - Nodes, allocation, recycling and height generation

pub mod comparator;
pub mod internal;
pub mod sorted;

pub use comparator::{Comparator, NaturalOrder, Reverse};
pub use internal::{
    DEFAULT_CHUNK_SIZE, MAX_HEIGHT, NodeAllocator, RandomHeight, RecyclerStats,
    SystemNodeAllocator,
};
pub use sorted::{Accessor, Iter, SkipList, Skipper};
