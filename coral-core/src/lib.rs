pub mod common_tests;
pub mod config;
pub mod data_structures;
pub mod error;
pub(crate) mod guard;

pub use config::{DEFAULT_MAX_HEIGHT, SkipListBuilder, SkipListConfig};
pub use data_structures::{
    Accessor, Comparator, Iter, MAX_HEIGHT, NaturalOrder, NodeAllocator, RandomHeight,
    RecyclerStats, Reverse, SkipList, Skipper, SystemNodeAllocator,
};
pub use error::ConfigError;
