//! Allocation interface for skip list nodes.
//!
//! Nodes are variable-length records (a header followed by `height` forward
//! pointers), so they are allocated from a raw `Layout` rather than through
//! `Box`. Routing every allocation through `NodeAllocator` lets a shard plug in
//! a pool or an arena without touching the engine.

use std::alloc::{Layout, alloc, dealloc};

/// Raw memory source for skip list nodes.
///
/// # Safety
///
/// Implementations must return either null or a pointer to a fresh block that
/// satisfies `layout` and stays valid until passed back to `deallocate` with
/// the same layout.
///
pub unsafe trait NodeAllocator: Send + Sync {
    /// Allocate a block for `layout`. Returns null on exhaustion.
    fn allocate(&self, layout: Layout) -> *mut u8;

    /// Return a block obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same `layout`
    /// and must not be used afterwards.
    ///
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout);
}

/// Default allocator backed by the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemNodeAllocator;

unsafe impl NodeAllocator for SystemNodeAllocator {
    #[inline]
    fn allocate(&self, layout: Layout) -> *mut u8 {
        unsafe { alloc(layout) }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        unsafe { dealloc(ptr, layout) }
    }
}

unsafe impl<A: NodeAllocator> NodeAllocator for std::sync::Arc<A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> *mut u8 {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocator_round_trip() {
        let allocator = SystemNodeAllocator;
        let layout = Layout::from_size_align(64, 8).unwrap();

        let ptr = allocator.allocate(layout);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 8, 0);

        unsafe {
            ptr.write_bytes(0xAB, 64);
            assert_eq!(*ptr.add(63), 0xAB);
            allocator.deallocate(ptr, layout);
        }
    }
}
