//! Optimistic skip list and the handles used to operate on it.
//!
//! - [`SkipList`] - the shared engine, always held in an `Arc`
//! - [`Accessor`] - pinned handle carrying every read and write
//! - [`Iter`] - level 0 iterator borrowed from an accessor
//! - [`Skipper`] - forward cursor with per-level search hints

pub mod accessor;
pub mod skip_list;
pub mod skip_list_iter;
pub mod skipper;

pub use accessor::Accessor;
pub use skip_list::SkipList;
pub use skip_list_iter::Iter;
pub use skipper::Skipper;
