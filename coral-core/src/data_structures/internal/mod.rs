//! Internal implementation details.
//!
//! Node layout, allocation and recycling are pub(crate); only the allocator
//! trait, the height oracle and the recycler statistics are re-exported.

pub mod node_allocator;
pub mod node_recycler;
pub mod random_height;
pub mod skip_node;

pub use node_allocator::{NodeAllocator, SystemNodeAllocator};
pub(crate) use node_recycler::NodeRecycler;
pub use node_recycler::{DEFAULT_CHUNK_SIZE, RecyclerStats};
pub use random_height::RandomHeight;
pub(crate) use skip_node::{NodeGuard, SkipNode, SkipNodePtr};
pub use skip_node::MAX_HEIGHT;
