use std::alloc::{Layout, handle_alloc_error};
use std::cell::UnsafeCell;
use std::ptr::{self, addr_of_mut};
use std::sync::atomic::{AtomicPtr, AtomicU16, Ordering};

use bitflags::bitflags;
use parking_lot::{Mutex, MutexGuard};

use super::node_allocator::NodeAllocator;

/// Hard upper bound on the number of levels a node (or the head) can have.
pub const MAX_HEIGHT: usize = 64;

pub(crate) type SkipNodePtr<T> = *mut SkipNode<T>;

/// Exclusive guard over a node's forward pointers.
///
/// Structural changes (link, unlink, head copy) hold the guard of every node
/// whose forward array they rewrite. Dropping the guard releases it, so every
/// early return in insert/remove gives the locks back.
pub(crate) type NodeGuard<'a> = MutexGuard<'a, ()>;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct NodeFlags: u16 {
        const IS_HEAD = 1;
        const MARKED_FOR_REMOVAL = 1 << 1;
        const FULLY_LINKED = 1 << 2;
    }
}

// ============================================================================
// SkipNode - Variable height node with per-node guard
// ============================================================================

/// A skip list node with a tower of forward pointers.
///
/// Uses the flexible array member pattern:
/// - Single allocation per node
/// - Forward pointers are inline after the struct fields
/// - Layout: [header][forward[0..h]] where h = height
///
/// The payload is `None` for heads and for nodes sitting in the recycler's
/// free queues. It is written exactly once, by the inserting thread, while the
/// node is still private, and published by the Release store that links it.
///
#[repr(C)]
pub(crate) struct SkipNode<T> {
    flags: AtomicU16,
    height: u8,
    guard: Mutex<()>,
    value: UnsafeCell<Option<T>>,
    // Flexible array: forward pointers are allocated inline after this struct
    pointers: [AtomicPtr<SkipNode<T>>; 0],
}

impl<T> SkipNode<T> {
    /// Calculate layout for a node with given height
    fn get_layout(height: usize) -> Layout {
        Layout::new::<Self>()
            .extend(Layout::array::<AtomicPtr<Self>>(height).expect("node tower layout overflow"))
            .expect("node layout overflow")
            .0
            .pad_to_align()
    }

    /// Allocate and initialize an empty node of `height` levels.
    ///
    /// Exhaustion is fatal: a null node would corrupt every later operation,
    /// so `handle_alloc_error` aborts instead of returning.
    pub(crate) fn create<A: NodeAllocator>(allocator: &A, height: usize, is_head: bool) -> *mut Self {
        debug_assert!(
            (1..=MAX_HEIGHT).contains(&height),
            "node height {height} out of range"
        );

        let layout = Self::get_layout(height);
        let ptr = allocator.allocate(layout) as *mut Self;
        if ptr.is_null() {
            handle_alloc_error(layout);
        }

        let flags = if is_head {
            NodeFlags::IS_HEAD
        } else {
            NodeFlags::empty()
        };

        unsafe {
            ptr::write(addr_of_mut!((*ptr).flags), AtomicU16::new(flags.bits()));
            ptr::write(addr_of_mut!((*ptr).height), height as u8);
            ptr::write(addr_of_mut!((*ptr).guard), Mutex::new(()));
            ptr::write(addr_of_mut!((*ptr).value), UnsafeCell::new(None));

            let pointers_base = addr_of_mut!((*ptr).pointers) as *mut AtomicPtr<Self>;
            for i in 0..height {
                ptr::write(pointers_base.add(i), AtomicPtr::new(ptr::null_mut()));
            }
        }

        ptr
    }

    /// Drop the payload and give the memory back to `allocator`.
    ///
    /// # Safety
    /// - `ptr` must come from `create` on the same allocator
    /// - No other thread may reach the node any more
    /// - Must only be called once
    pub(crate) unsafe fn destroy<A: NodeAllocator>(allocator: &A, ptr: *mut Self) {
        unsafe {
            let layout = Self::get_layout((*ptr).height());

            ptr::drop_in_place(addr_of_mut!((*ptr).value));
            ptr::drop_in_place(addr_of_mut!((*ptr).guard));

            allocator.deallocate(ptr as *mut u8, layout);
        }
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height as usize
    }

    #[inline]
    pub(crate) fn max_layer(&self) -> usize {
        self.height() - 1
    }

    // =========================================================================
    // Forward pointer accessors
    // =========================================================================

    #[inline]
    fn pointer_at(&self, level: usize) -> &AtomicPtr<SkipNode<T>> {
        debug_assert!(level < self.height(), "level {level} above node height");
        unsafe { &*self.pointers.as_ptr().add(level) }
    }

    /// Load forward pointer at level (Acquire ordering)
    #[inline]
    pub(crate) fn forward(&self, level: usize) -> SkipNodePtr<T> {
        self.pointer_at(level).load(Ordering::Acquire)
    }

    /// Store forward pointer at level (Release ordering)
    #[inline]
    pub(crate) fn set_forward(&self, level: usize, node: SkipNodePtr<T>) {
        self.pointer_at(level).store(node, Ordering::Release)
    }

    /// First node after this one at level 0 that is not marked for removal.
    pub(crate) fn next(&self) -> SkipNodePtr<T> {
        let mut node = self.forward(0);
        unsafe {
            while !node.is_null() && (*node).marked_for_removal() {
                node = (*node).forward(0);
            }
        }
        node
    }

    /// Copy flags and every forward pointer of a shorter head into this one.
    pub(crate) fn copy_head(&self, old_head: &SkipNode<T>) -> &Self {
        debug_assert!(self.height() > old_head.height());

        self.set_flags(old_head.flags());
        for level in 0..old_head.height() {
            self.set_forward(level, old_head.forward(level));
        }
        self
    }

    /// Prepare a node coming out of a free queue for reuse.
    ///
    /// Must only be called while the caller owns the node exclusively.
    pub(crate) fn reset(&self, is_head: bool) {
        let flags = if is_head {
            NodeFlags::IS_HEAD
        } else {
            NodeFlags::empty()
        };
        self.set_flags(flags);
        for level in 0..self.height() {
            self.set_forward(level, ptr::null_mut());
        }
    }

    // =========================================================================
    // Flags
    // =========================================================================

    #[inline]
    pub(crate) fn flags(&self) -> NodeFlags {
        NodeFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_flags(&self, flags: NodeFlags) {
        self.flags.store(flags.bits(), Ordering::Release)
    }

    #[inline]
    fn insert_flags(&self, flags: NodeFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn is_head(&self) -> bool {
        self.flags().contains(NodeFlags::IS_HEAD)
    }

    #[inline]
    pub(crate) fn fully_linked(&self) -> bool {
        self.flags().contains(NodeFlags::FULLY_LINKED)
    }

    #[inline]
    pub(crate) fn marked_for_removal(&self) -> bool {
        self.flags().contains(NodeFlags::MARKED_FOR_REMOVAL)
    }

    #[inline]
    pub(crate) fn set_fully_linked(&self) {
        self.insert_flags(NodeFlags::FULLY_LINKED)
    }

    #[inline]
    pub(crate) fn set_marked_for_removal(&self) {
        self.insert_flags(NodeFlags::MARKED_FOR_REMOVAL)
    }

    // =========================================================================
    // Guard and payload
    // =========================================================================

    #[inline]
    pub(crate) fn acquire_guard(&self) -> NodeGuard<'_> {
        self.guard.lock()
    }

    /// Store the payload of a freshly popped node.
    ///
    /// # Safety
    /// The node must not yet be reachable by any other thread.
    pub(crate) unsafe fn store_value(&self, value: T) {
        unsafe {
            *self.value.get() = Some(value);
        }
    }

    /// Payload of a data node.
    ///
    /// Panics on a head node, which never carries a value.
    #[inline]
    pub(crate) fn value(&self) -> &T {
        unsafe {
            (*self.value.get())
                .as_ref()
                .expect("Cannot get value from head node")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::internal::node_allocator::SystemNodeAllocator;
    use std::rc::Rc;

    fn data_node(height: usize, value: i32) -> *mut SkipNode<i32> {
        let node = SkipNode::create(&SystemNodeAllocator, height, false);
        unsafe { (*node).store_value(value) };
        node
    }

    #[test]
    fn test_create_initializes_tower() {
        let node = SkipNode::<i32>::create(&SystemNodeAllocator, 5, false);
        unsafe {
            assert_eq!((*node).height(), 5);
            assert_eq!((*node).max_layer(), 4);
            assert_eq!((*node).flags(), NodeFlags::empty());
            for level in 0..5 {
                assert!((*node).forward(level).is_null());
            }
            SkipNode::destroy(&SystemNodeAllocator, node);
        }
    }

    #[test]
    fn test_head_flag_and_max_height() {
        let head = SkipNode::<i32>::create(&SystemNodeAllocator, MAX_HEIGHT, true);
        unsafe {
            assert!((*head).is_head());
            assert!(!(*head).fully_linked());
            assert_eq!((*head).height(), MAX_HEIGHT);
            SkipNode::destroy(&SystemNodeAllocator, head);
        }
    }

    #[test]
    fn test_flags_accumulate() {
        let node = data_node(1, 7);
        unsafe {
            (*node).set_fully_linked();
            (*node).set_marked_for_removal();
            assert!((*node).fully_linked());
            assert!((*node).marked_for_removal());
            assert!(!(*node).is_head());

            (*node).reset(true);
            assert_eq!((*node).flags(), NodeFlags::IS_HEAD);
            SkipNode::destroy(&SystemNodeAllocator, node);
        }
    }

    #[test]
    fn test_next_skips_marked_nodes() {
        let a = data_node(1, 1);
        let b = data_node(1, 2);
        let c = data_node(1, 3);
        unsafe {
            (*a).set_forward(0, b);
            (*b).set_forward(0, c);
            assert_eq!((*a).next(), b);

            (*b).set_marked_for_removal();
            assert_eq!((*a).next(), c);

            (*c).set_marked_for_removal();
            assert!((*a).next().is_null());

            for node in [a, b, c] {
                SkipNode::destroy(&SystemNodeAllocator, node);
            }
        }
    }

    #[test]
    fn test_copy_head() {
        let old_head = SkipNode::<i32>::create(&SystemNodeAllocator, 2, true);
        let new_head = SkipNode::<i32>::create(&SystemNodeAllocator, 3, true);
        let a = data_node(2, 10);
        unsafe {
            (*old_head).set_forward(0, a);
            (*old_head).set_forward(1, a);

            (*new_head).copy_head(&*old_head);
            assert_eq!((*new_head).forward(0), a);
            assert_eq!((*new_head).forward(1), a);
            assert!((*new_head).forward(2).is_null());
            assert!((*new_head).is_head());

            for node in [old_head, new_head, a] {
                SkipNode::destroy(&SystemNodeAllocator, node);
            }
        }
    }

    #[test]
    fn test_destroy_drops_payload() {
        let payload = Rc::new(5);
        let node = SkipNode::create(&SystemNodeAllocator, 3, false);
        unsafe {
            (*node).store_value(Rc::clone(&payload));
            assert_eq!(Rc::strong_count(&payload), 2);
            assert_eq!(**(*node).value(), 5);
            SkipNode::destroy(&SystemNodeAllocator, node);
        }
        assert_eq!(Rc::strong_count(&payload), 1);
    }

    #[test]
    fn test_guard_is_exclusive() {
        let node = data_node(1, 0);
        unsafe {
            let guard = (*node).acquire_guard();
            assert!((*node).guard.try_lock().is_none());
            drop(guard);
            assert!((*node).guard.try_lock().is_some());
            SkipNode::destroy(&SystemNodeAllocator, node);
        }
    }
}
