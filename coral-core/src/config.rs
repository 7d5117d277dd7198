//! List configuration and builder.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::data_structures::comparator::{Comparator, NaturalOrder};
use crate::data_structures::internal::{
    DEFAULT_CHUNK_SIZE, MAX_HEIGHT, NodeAllocator, RandomHeight, SystemNodeAllocator,
};
use crate::data_structures::sorted::SkipList;
use crate::error::ConfigError;

/// Default level cap of a list.
pub const DEFAULT_MAX_HEIGHT: usize = 24;

/// Sizing knobs of a skip list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkipListConfig {
    /// Level count of the head when the list is created.
    pub initial_height: usize,
    /// Level count the head never grows past.
    pub max_height: usize,
    /// Nodes allocated at once when a recycler queue is empty.
    pub chunk_size: usize,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        SkipListConfig {
            initial_height: 1,
            max_height: DEFAULT_MAX_HEIGHT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SkipListConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HEIGHT).contains(&self.max_height) {
            return Err(ConfigError::MaxHeightOutOfRange {
                max_height: self.max_height,
                limit: MAX_HEIGHT,
            });
        }
        if !(1..=self.max_height).contains(&self.initial_height) {
            return Err(ConfigError::InitialHeightOutOfRange {
                initial_height: self.initial_height,
                max_height: self.max_height,
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }
}

/// Builder for [`SkipList`].
///
/// ```
/// use coral_core::SkipList;
///
/// let list = SkipList::<u64>::builder()
///     .initial_height(4)
///     .chunk_size(16)
///     .build()
///     .unwrap();
/// let accessor = list.accessor();
/// assert!(accessor.add(7));
/// ```
pub struct SkipListBuilder<T, C = NaturalOrder, A = SystemNodeAllocator> {
    config: SkipListConfig,
    comparator: C,
    allocator: A,
    random_height: Option<Arc<RandomHeight>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SkipListBuilder<T> {
    pub fn new() -> Self {
        SkipListBuilder {
            config: SkipListConfig::default(),
            comparator: NaturalOrder,
            allocator: SystemNodeAllocator,
            random_height: None,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SkipListBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, A> SkipListBuilder<T, C, A> {
    pub fn config(mut self, config: SkipListConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_height(mut self, height: usize) -> Self {
        self.config.initial_height = height;
        self
    }

    pub fn max_height(mut self, height: usize) -> Self {
        self.config.max_height = height;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Height oracle to draw node heights from. Defaults to
    /// [`RandomHeight::shared`].
    pub fn random_height(mut self, random_height: Arc<RandomHeight>) -> Self {
        self.random_height = Some(random_height);
        self
    }

    pub fn comparator<C2>(self, comparator: C2) -> SkipListBuilder<T, C2, A> {
        SkipListBuilder {
            config: self.config,
            comparator,
            allocator: self.allocator,
            random_height: self.random_height,
            _marker: PhantomData,
        }
    }

    pub fn allocator<A2>(self, allocator: A2) -> SkipListBuilder<T, C, A2> {
        SkipListBuilder {
            config: self.config,
            comparator: self.comparator,
            allocator,
            random_height: self.random_height,
            _marker: PhantomData,
        }
    }
}

impl<T, C: Comparator<T>, A: NodeAllocator> SkipListBuilder<T, C, A> {
    pub fn build(self) -> Result<Arc<SkipList<T, C, A>>, ConfigError> {
        self.config.validate()?;

        let random_height = self.random_height.unwrap_or_else(RandomHeight::shared);
        Ok(Arc::new(SkipList::from_parts(
            &self.config,
            self.comparator,
            self.allocator,
            random_height,
        )))
    }
}
