//! Test routines shared by the integration tests.
//!
//! Every routine takes the [`SkipListConfig`] to build its list from, so the
//! integration tests can run the same checks over several shapes (flat or
//! tall heads, tiny recycler chunks, low height caps) through `rstest` cases.


use std::alloc::Layout;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::SkipListConfig;
use crate::data_structures::internal::{NodeAllocator, SystemNodeAllocator};
use crate::data_structures::sorted::SkipList;

/// Build an `i32` list for a test.
pub fn new_list(config: SkipListConfig) -> Arc<SkipList<i32>> {
    SkipList::builder()
        .config(config)
        .build()
        .expect("test configuration must be valid")
}

/// Build an `i32` list whose nodes come from `allocator`.
pub fn new_counted_list(
    config: SkipListConfig,
    allocator: &Arc<CountingAllocator>,
) -> Arc<SkipList<i32, crate::NaturalOrder, Arc<CountingAllocator>>> {
    SkipList::builder()
        .config(config)
        .allocator(Arc::clone(allocator))
        .build()
        .expect("test configuration must be valid")
}

/// Node allocator that counts allocations and deallocations.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocated: AtomicUsize,
    deallocated: AtomicUsize,
}

impl CountingAllocator {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn deallocated(&self) -> usize {
        self.deallocated.load(Ordering::SeqCst)
    }

    /// Blocks currently handed out.
    pub fn live(&self) -> usize {
        self.allocated() - self.deallocated()
    }
}

unsafe impl NodeAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        SystemNodeAllocator.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        self.deallocated.fetch_add(1, Ordering::SeqCst);
        unsafe { SystemNodeAllocator.deallocate(ptr, layout) }
    }
}
