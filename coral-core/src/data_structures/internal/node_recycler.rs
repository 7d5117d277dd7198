//! Node pool with pin-count based deferred reclamation.
//!
//! ```text
//!                 pop(h)                       push(h)
//!   free[h] ───────────────► engine ──────────────────────► retired
//!     ▲     (refill chunk          (node unlinked at every      │
//!     │      when empty)            level, readers may still    │
//!     │                             be traversing it)           │
//!     │ discard(h)                                              │
//!     └── never-published nodes                                 │
//!                                                               ▼
//!            last release_ref() with dirty set ──► destroy free[*] + retired
//! ```
//!
//! Removed nodes are parked, not reissued: a pinned reader may still hold a
//! pointer into one, and reissuing it would rewrite its payload and tower under
//! that reader. Once the pin count drops to zero no reader can reach a parked
//! node, so the sweep frees them.

use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam::queue::SegQueue;
use parking_lot::Mutex;

use super::node_allocator::NodeAllocator;
use super::skip_node::{MAX_HEIGHT, SkipNode, SkipNodePtr};
use crate::guard::ReclaimPermit;

/// Default number of nodes allocated when a free queue runs dry.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

struct NodeHandle<T>(NonNull<SkipNode<T>>);

// Safety: a handle is only held by one queue or list at a time, and the node
// it points to is not reachable by traversal while it sits there.
unsafe impl<T: Send> Send for NodeHandle<T> {}

impl<T> NodeHandle<T> {
    fn new(node: SkipNodePtr<T>) -> Self {
        NodeHandle(NonNull::new(node).expect("recycler received a null node"))
    }

    fn as_ptr(&self) -> SkipNodePtr<T> {
        self.0.as_ptr()
    }
}

/// Snapshot of the recycler counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecyclerStats {
    /// Nodes waiting in free queues.
    pub free_nodes: usize,
    /// Unlinked nodes waiting for the pin count to reach zero.
    pub retired_nodes: usize,
    /// Nodes allocated since creation.
    pub allocated: usize,
    /// Nodes destroyed since creation.
    pub destroyed: usize,
    /// Live pins.
    pub refs: usize,
}

pub(crate) struct NodeRecycler<T, A: NodeAllocator> {
    free_queues: Box<[SegQueue<NodeHandle<T>>]>,
    retired: Mutex<Vec<NodeHandle<T>>>,
    refs: AtomicUsize,
    dirty: AtomicBool,
    chunk_size: usize,
    allocator: A,
    allocated: AtomicUsize,
    destroyed: AtomicUsize,
}

impl<T, A: NodeAllocator> NodeRecycler<T, A> {
    pub(crate) fn new(allocator: A, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);

        NodeRecycler {
            free_queues: (0..MAX_HEIGHT).map(|_| SegQueue::new()).collect(),
            retired: Mutex::new(Vec::new()),
            refs: AtomicUsize::new(0),
            dirty: AtomicBool::new(false),
            chunk_size,
            allocator,
            allocated: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn queue(&self, height: usize) -> &SegQueue<NodeHandle<T>> {
        debug_assert!((1..=MAX_HEIGHT).contains(&height));
        &self.free_queues[height - 1]
    }

    #[inline]
    pub(crate) fn refs(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// Take a node of `height` levels, refilling its queue when empty.
    ///
    /// The node comes back with no flags except (optionally) IS_HEAD and with
    /// every forward pointer cleared.
    pub(crate) fn pop(&self, height: usize, is_head: bool) -> SkipNodePtr<T> {
        let queue = self.queue(height);

        let node = loop {
            if let Some(handle) = queue.pop() {
                break handle.as_ptr();
            }
            self.refill(height);
        };

        self.dirty.store(true, Ordering::Release);

        unsafe { (*node).reset(is_head) };
        node
    }

    fn refill(&self, height: usize) {
        let queue = self.queue(height);
        for _ in 0..self.chunk_size {
            let node = SkipNode::create(&self.allocator, height, false);
            queue.push(NodeHandle::new(node));
        }
        self.allocated.fetch_add(self.chunk_size, Ordering::Relaxed);

        tracing::trace!(height, chunk = self.chunk_size, "refilled node free queue");
    }

    /// Park a node that was unlinked from the list.
    pub(crate) fn push(&self, height: usize, node: SkipNodePtr<T>) {
        debug_assert_eq!(unsafe { (*node).height() }, height);
        debug_assert!(self.refs() > 0, "push without a pin");

        let mut retired = self.retired.lock();
        retired.push(NodeHandle::new(node));
        self.dirty.store(true, Ordering::Release);
    }

    /// Return a node that was never reachable by traversal.
    pub(crate) fn discard(&self, height: usize, node: SkipNodePtr<T>) {
        debug_assert_eq!(unsafe { (*node).height() }, height);

        self.queue(height).push(NodeHandle::new(node));
    }

    pub(crate) fn add_ref(&self) -> usize {
        self.refs.fetch_add(1, Ordering::AcqRel)
    }

    /// Drop one pin. The release that takes the count to zero on a dirty
    /// recycler destroys every pooled and parked node.
    ///
    /// Only a release that sees a count of 1 takes the retire lock. Two
    /// releases racing from 2 can both take the fast path and leave the count
    /// at zero without a sweep; the parked nodes then stay until the next
    /// dirty transition to zero, or until the recycler drops.
    pub(crate) fn release_ref(&self) -> usize {
        if !self.dirty.load(Ordering::Acquire) || self.refs() > 1 {
            return self.refs.fetch_sub(1, Ordering::AcqRel);
        }

        let (previous, sweep) = {
            let mut retired = self.retired.lock();
            let previous = self.refs.fetch_sub(1, Ordering::AcqRel);
            if previous == 1 {
                self.dirty.store(false, Ordering::Release);
                // Safety: the count reached zero under the retire lock, so
                // every parked node was unlinked before any live pin started.
                let permit = unsafe { ReclaimPermit::new_unchecked() };
                (previous, Some((permit, mem::take(&mut *retired))))
            } else {
                (previous, None)
            }
        };

        if let Some((permit, retired)) = sweep {
            self.reclaim(permit, retired);
        }

        previous
    }

    fn reclaim(&self, _permit: ReclaimPermit, retired: Vec<NodeHandle<T>>) {
        let mut destroyed = 0;

        for queue in self.free_queues.iter() {
            while let Some(handle) = queue.pop() {
                unsafe { SkipNode::destroy(&self.allocator, handle.as_ptr()) };
                destroyed += 1;
            }
        }

        for handle in retired {
            unsafe { SkipNode::destroy(&self.allocator, handle.as_ptr()) };
            destroyed += 1;
        }

        self.destroyed.fetch_add(destroyed, Ordering::Relaxed);

        tracing::debug!(destroyed, "reclaimed recycler nodes");
    }

    /// Destroy a node the caller owns exclusively (list teardown).
    pub(crate) fn destroy_exclusive(&mut self, node: SkipNodePtr<T>) {
        unsafe { SkipNode::destroy(&self.allocator, node) };
        *self.destroyed.get_mut() += 1;
    }

    pub(crate) fn stats(&self) -> RecyclerStats {
        RecyclerStats {
            free_nodes: self.free_queues.iter().map(SegQueue::len).sum(),
            retired_nodes: self.retired.lock().len(),
            allocated: self.allocated.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            refs: self.refs(),
        }
    }
}

impl<T, A: NodeAllocator> Drop for NodeRecycler<T, A> {
    fn drop(&mut self) {
        debug_assert_eq!(*self.refs.get_mut(), 0, "recycler dropped while pinned");

        let retired = mem::take(self.retired.get_mut());
        // Safety: `&mut self` rules out any live pin.
        let permit = unsafe { ReclaimPermit::new_unchecked() };
        self.reclaim(permit, retired);
    }
}
