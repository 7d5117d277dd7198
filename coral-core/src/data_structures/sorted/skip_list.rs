use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crossbeam::utils::Backoff;

use super::accessor::Accessor;
use crate::config::{SkipListBuilder, SkipListConfig};
use crate::data_structures::comparator::{Comparator, NaturalOrder};
use crate::data_structures::internal::{
    MAX_HEIGHT, NodeAllocator, NodeGuard, NodeRecycler, RandomHeight, RecyclerStats, SkipNode,
    SkipNodePtr, SystemNodeAllocator,
};
use crate::error::ConfigError;
use crate::guard::Reclaimable;

/// Per-level predecessor / successor snapshot of a search.
pub(crate) type Tower<T> = [SkipNodePtr<T>; MAX_HEIGHT];

// Spins on a node that is not fully linked yet before a warning is logged.
const LONG_LINK_WAIT_SPINS: u32 = 1 << 16;

// =============================================================================
// SkipList - Optimistic skip list with per-node guards
// =============================================================================

/// A concurrent ordered set built as an optimistic (lazy) skip list.
///
/// Structure:
/// ```text
///   head (h=3) ─────────────────────────► [30] ───────────► null
///   head       ────────► [10] ──────────► [30] ───────────► null
///   head       ─► [5] ─► [10] ─► [20] ──► [30] ─► [40] ───► null
/// ```
///
/// Readers never lock: they follow Acquire-loaded forward pointers and skip
/// nodes marked for removal. Writers search without locks, then lock every
/// distinct predecessor bottom-up, validate that the neighbourhood did not
/// change, and link or unlink the node in one critical section. Validation
/// failures retry from the head.
///
/// The head is itself a node. When the element count passes the size limit of
/// the current height, a taller head is built from a copy of the old one and
/// swapped in by CAS; the old head is marked and retired.
///
/// Nodes only ever come from and return to the list's recycler, and every
/// operation goes through an [`Accessor`], which pins the recycler so that no
/// node a reader can still reach is freed under it.
///
pub struct SkipList<T, C = NaturalOrder, A: NodeAllocator = SystemNodeAllocator> {
    recycler: NodeRecycler<T, A>,
    head: AtomicPtr<SkipNode<T>>,
    size: AtomicUsize,
    comparator: C,
    random_height: Arc<RandomHeight>,
    max_height: usize,
}

impl<T: Ord> SkipList<T> {
    /// Build a list with the default comparator, allocator and limits and
    /// return its first accessor.
    pub fn create(initial_height: usize) -> Result<Accessor<T>, ConfigError> {
        let list = SkipListBuilder::new().initial_height(initial_height).build()?;
        Ok(list.accessor())
    }
}

impl<T> SkipList<T> {
    pub fn builder() -> SkipListBuilder<T> {
        SkipListBuilder::new()
    }
}

impl<T, C, A: NodeAllocator> SkipList<T, C, A> {
    pub(crate) fn from_parts(
        config: &SkipListConfig,
        comparator: C,
        allocator: A,
        random_height: Arc<RandomHeight>,
    ) -> Self {
        let recycler = NodeRecycler::new(allocator, config.chunk_size);
        let head = recycler.pop(config.initial_height, true);

        SkipList {
            recycler,
            head: AtomicPtr::new(head),
            size: AtomicUsize::new(0),
            comparator,
            random_height,
            max_height: config.max_height,
        }
    }

    /// Pin the list and return a handle for operating on it.
    pub fn accessor(self: &Arc<Self>) -> Accessor<T, C, A> {
        Accessor::new(Arc::clone(self))
    }

    /// Number of fully linked, non-removed elements. Approximate under
    /// concurrent updates.
    #[inline]
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn max_height(&self) -> usize {
        self.max_height
    }

    pub fn recycler_stats(&self) -> RecyclerStats {
        self.recycler.stats()
    }

    #[inline]
    pub(crate) fn head(&self) -> SkipNodePtr<T> {
        self.head.load(Ordering::Acquire)
    }

    /// Current level count. Only meaningful while pinned.
    #[inline]
    pub(crate) fn height(&self) -> usize {
        unsafe { (*self.head()).height() }
    }
}

impl<T, C: Comparator<T>, A: NodeAllocator> SkipList<T, C, A> {
    // =========================================================================
    // Comparisons against possibly-null nodes
    // =========================================================================

    /// `node` exists and sorts before `value`.
    #[inline]
    pub(crate) fn greater(&self, value: &T, node: SkipNodePtr<T>) -> bool {
        !node.is_null() && self.comparator.less(unsafe { (*node).value() }, value)
    }

    /// `node` is the end of the level or sorts after `value`.
    #[inline]
    fn less(&self, value: &T, node: SkipNodePtr<T>) -> bool {
        node.is_null() || self.comparator.less(value, unsafe { (*node).value() })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Walk down from `start` at `start_layer`, recording per level the last
    /// node before `value` and the node after it.
    ///
    /// Returns the highest level at which a node equal to `value` was met.
    /// From that level down, `succs` holds that node.
    pub(crate) fn find_insertion_point(
        &self,
        start: SkipNodePtr<T>,
        start_layer: usize,
        value: &T,
        preds: &mut Tower<T>,
        succs: &mut Tower<T>,
    ) -> Option<usize> {
        let mut found_layer = None;
        let mut found_node = ptr::null_mut();
        let mut pred = start;

        for layer in (0..=start_layer).rev() {
            let mut node = unsafe { (*pred).forward(layer) };
            while self.greater(value, node) {
                pred = node;
                node = unsafe { (*node).forward(layer) };
            }

            if found_layer.is_none() && !self.less(value, node) {
                found_layer = Some(layer);
                found_node = node;
            }

            preds[layer] = pred;
            succs[layer] = if found_node.is_null() { node } else { found_node };
        }

        found_layer
    }

    /// Search from the current head. Also returns the top level searched.
    fn search(&self, value: &T, preds: &mut Tower<T>, succs: &mut Tower<T>) -> (Option<usize>, usize) {
        let head = self.head();
        let max_layer = unsafe { (*head).max_layer() };
        (
            self.find_insertion_point(head, max_layer, value, preds, succs),
            max_layer,
        )
    }

    /// Down-right walk for `value`.
    ///
    /// Returns the node equal to `value` and `true`, or the first node after
    /// `value` at level 0 (possibly null) and `false`.
    fn find_node_down_right(&self, value: &T) -> (SkipNodePtr<T>, bool) {
        let mut pred = self.head();
        let mut height = unsafe { (*pred).height() };
        let mut node = ptr::null_mut();

        loop {
            while height > 0 {
                node = unsafe { (*pred).forward(height - 1) };
                if !self.less(value, node) {
                    break;
                }
                height -= 1;
            }
            if height == 0 {
                return (node, false);
            }
            height -= 1;

            while self.greater(value, node) {
                pred = node;
                node = unsafe { (*node).forward(height) };
            }
            if !self.less(value, node) {
                return (node, true);
            }
        }
    }

    /// Node equal to `value` that is not marked for removal.
    pub(crate) fn find(&self, value: &T) -> SkipNodePtr<T> {
        match self.find_node_down_right(value) {
            (node, true) if unsafe { !(*node).marked_for_removal() } => node,
            _ => ptr::null_mut(),
        }
    }

    /// First node not before `value`, skipping nodes marked for removal.
    pub(crate) fn lower_bound(&self, value: &T) -> SkipNodePtr<T> {
        let (mut node, _) = self.find_node_down_right(value);
        unsafe {
            while !node.is_null() && (*node).marked_for_removal() {
                node = (*node).forward(0);
            }
        }
        node
    }

    pub(crate) fn first(&self) -> SkipNodePtr<T> {
        unsafe { (*self.head()).next() }
    }

    /// Rightmost node reached by a top-down walk, null on an empty list.
    pub(crate) fn last(&self) -> SkipNodePtr<T> {
        let mut pred = self.head();
        let max_layer = unsafe { (*pred).max_layer() };

        for layer in (0..=max_layer).rev() {
            loop {
                let node = unsafe { (*pred).forward(layer) };
                if node.is_null() {
                    break;
                }
                pred = node;
            }
        }

        if unsafe { (*pred).is_head() } {
            ptr::null_mut()
        } else {
            pred
        }
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Lock each distinct predecessor of levels `0..height` and check that the
    /// search snapshot still holds.
    ///
    /// Returns `None` (with every acquired guard released) when a predecessor
    /// was marked or no longer points at the recorded successor, or, when
    /// `adding`, when a successor was marked.
    fn lock_nodes_for_change(
        &self,
        height: usize,
        preds: &Tower<T>,
        succs: &Tower<T>,
        adding: bool,
    ) -> Option<Vec<NodeGuard<'_>>> {
        let mut guards = Vec::with_capacity(height);
        let mut prev_pred = ptr::null_mut();

        for layer in 0..height {
            let pred = preds[layer];
            let succ = succs[layer];
            debug_assert!(!pred.is_null());

            let pred_ref = unsafe { &*pred };
            if pred != prev_pred {
                guards.push(pred_ref.acquire_guard());
                prev_pred = pred;
            }

            let mut valid = !pred_ref.marked_for_removal() && pred_ref.forward(layer) == succ;
            if adding {
                valid = valid && (succ.is_null() || unsafe { !(*succ).marked_for_removal() });
            }
            if !valid {
                return None;
            }
        }

        Some(guards)
    }

    fn wait_fully_linked(&self, node: &SkipNode<T>) {
        let backoff = Backoff::new();
        let mut spins = 0u32;

        while !node.fully_linked() {
            spins = spins.wrapping_add(1);
            if spins == LONG_LINK_WAIT_SPINS {
                tracing::warn!(spins, "insert still waiting for a racing insert to link");
            }
            backoff.snooze();
        }
    }

    /// Insert `value` unless an equal element is present.
    ///
    /// Returns the node holding the element and whether this call linked it.
    pub(crate) fn add_or_get(&self, value: T) -> (SkipNodePtr<T>, bool) {
        let mut preds: Tower<T> = [ptr::null_mut(); MAX_HEIGHT];
        let mut succs: Tower<T> = [ptr::null_mut(); MAX_HEIGHT];

        let (node, new_size) = loop {
            let (found, max_layer) = self.search(&value, &mut preds, &mut succs);

            if let Some(layer) = found {
                let existing = succs[layer];
                let existing_ref = unsafe { &*existing };
                if existing_ref.marked_for_removal() {
                    continue;
                }
                self.wait_fully_linked(existing_ref);
                return (existing, false);
            }

            let height = self.random_height.height(max_layer + 1);
            let Some(guards) = self.lock_nodes_for_change(height, &preds, &succs, true) else {
                continue;
            };

            let node = self.recycler.pop(height, false);
            unsafe {
                (*node).store_value(value);
                for level in 0..height {
                    (*node).set_forward(level, succs[level]);
                    (*preds[level]).set_forward(level, node);
                }
                (*node).set_fully_linked();
            }
            let new_size = self.size.fetch_add(1, Ordering::Relaxed) + 1;
            drop(guards);

            break (node, new_size);
        };

        let height = self.height();
        if height < self.max_height && new_size > self.random_height.size_limit(height) {
            self.grow_height(height + 1);
        }

        (node, true)
    }

    /// Unlink the element equal to `value`.
    ///
    /// Only a fully linked, unmarked node found at its own top level can be
    /// removed. Marking happens once under the node's guard; if locking the
    /// predecessors then fails, the search and locking are retried while the
    /// mark stays in place, so no other remover or inserter can claim it.
    pub(crate) fn remove(&self, value: &T) -> bool {
        let mut preds: Tower<T> = [ptr::null_mut(); MAX_HEIGHT];
        let mut succs: Tower<T> = [ptr::null_mut(); MAX_HEIGHT];
        let mut marked: SkipNodePtr<T> = ptr::null_mut();

        loop {
            let (found, _) = self.search(value, &mut preds, &mut succs);

            if marked.is_null() {
                let Some(layer) = found else {
                    return false;
                };
                let candidate = succs[layer];
                if !Self::ok_to_delete(unsafe { &*candidate }, layer) {
                    return false;
                }

                let candidate_ref = unsafe { &*candidate };
                let _guard = candidate_ref.acquire_guard();
                if candidate_ref.marked_for_removal() {
                    return false;
                }
                candidate_ref.set_marked_for_removal();
                marked = candidate;
            }

            let node = unsafe { &*marked };
            let height = node.height();
            // Every predecessor must still point at the node itself.
            succs[..height].fill(marked);

            let Some(guards) = self.lock_nodes_for_change(height, &preds, &succs, false) else {
                continue;
            };

            for level in (0..height).rev() {
                unsafe { (*preds[level]).set_forward(level, node.forward(level)) };
            }
            self.size.fetch_sub(1, Ordering::Relaxed);
            drop(guards);

            self.recycler.push(height, marked);
            return true;
        }
    }

    fn ok_to_delete(candidate: &SkipNode<T>, layer: usize) -> bool {
        candidate.fully_linked() && candidate.max_layer() == layer && !candidate.marked_for_removal()
    }

    /// Swap in a head of `height` levels if the current one is shorter.
    fn grow_height(&self, height: usize) {
        let old_head = self.head();
        let old_ref = unsafe { &*old_head };
        if old_ref.height() >= height {
            return;
        }

        let new_head = self.recycler.pop(height, true);
        {
            let _guard = old_ref.acquire_guard();
            unsafe { (*new_head).copy_head(old_ref) };

            if self
                .head
                .compare_exchange(old_head, new_head, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                self.recycler.discard(height, new_head);
                return;
            }
            old_ref.set_marked_for_removal();
        }

        tracing::debug!(height, size = self.len(), "skip list head grew");
        self.recycler.push(old_ref.height(), old_head);
    }
}

impl<T, C, A: NodeAllocator> Reclaimable for SkipList<T, C, A> {
    #[inline]
    fn add_ref(&self) -> usize {
        self.recycler.add_ref()
    }

    #[inline]
    fn release_ref(&self) -> usize {
        self.recycler.release_ref()
    }
}

impl<T, C, A: NodeAllocator> Drop for SkipList<T, C, A> {
    fn drop(&mut self) {
        // Removed nodes and replaced heads are retired; the recycler frees them
        // when it drops. Everything still linked is freed here.
        let mut current = *self.head.get_mut();
        while !current.is_null() {
            let next = unsafe { (*current).forward(0) };
            self.recycler.destroy_exclusive(current);
            current = next;
        }
    }
}

// Safety: nodes are only mutated under their guards or before publication,
// and shared payloads are handed out as `&T`.
unsafe impl<T: Send + Sync, C: Send + Sync, A: NodeAllocator> Send for SkipList<T, C, A> {}
unsafe impl<T: Send + Sync, C: Send + Sync, A: NodeAllocator> Sync for SkipList<T, C, A> {}
