use std::ptr;

use super::accessor::Accessor;
use super::skip_list::Tower;
use crate::data_structures::comparator::{Comparator, NaturalOrder};
use crate::data_structures::internal::{MAX_HEIGHT, NodeAllocator, SystemNodeAllocator};

/// Forward cursor for merge-style scans.
///
/// Keeps the predecessor and successor at every level of the position it
/// stands on, so [`to`](Skipper::to) can resume the search from close by
/// instead of from the head. Per-level hints remember the level at which the
/// previous jump had to start.
///
/// ```text
///   level 2: preds[2] ───────────────────────► succs[2]
///   level 1: preds[1] ──────────► succs[1]
///   level 0:            preds[0] ─► succs[0]   (current element)
/// ```
///
/// The cursor only moves forward. The head height is captured when the
/// skipper is created; a later head growth is not seen.
///
pub struct Skipper<T, C = NaturalOrder, A: NodeAllocator = SystemNodeAllocator> {
    accessor: Accessor<T, C, A>,
    head_height: usize,
    preds: Tower<T>,
    succs: Tower<T>,
    hints: [u8; MAX_HEIGHT],
}

impl<T, C: Comparator<T>, A: NodeAllocator> Skipper<T, C, A> {
    /// Position a cursor on the first element of the list.
    pub fn new(accessor: Accessor<T, C, A>) -> Self {
        let head = accessor.skip_list().head();
        let head_height = unsafe { (*head).height() };

        let mut skipper = Skipper {
            accessor,
            head_height,
            preds: [ptr::null_mut(); MAX_HEIGHT],
            succs: [ptr::null_mut(); MAX_HEIGHT],
            hints: [0; MAX_HEIGHT],
        };

        for level in 0..head_height {
            skipper.preds[level] = head;
            skipper.succs[level] = unsafe { (*head).forward(level) };
        }

        let max_layer = skipper.max_layer();
        for level in 0..max_layer {
            skipper.hints[level] = (level + 1) as u8;
        }
        skipper.hints[max_layer] = max_layer as u8;

        skipper
    }

    pub fn accessor(&self) -> &Accessor<T, C, A> {
        &self.accessor
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.succs[0].is_null()
    }

    /// Top level of the head captured at creation.
    #[inline]
    pub fn max_layer(&self) -> usize {
        self.head_height - 1
    }

    /// Levels of the current element, capped at the head height; 0 past the
    /// end.
    pub fn current_height(&self) -> usize {
        let current = self.succs[0];
        if current.is_null() {
            0
        } else {
            self.head_height.min(unsafe { (*current).height() })
        }
    }

    /// Element under the cursor.
    pub fn current(&self) -> Option<&T> {
        let current = self.succs[0];
        if current.is_null() {
            None
        } else {
            Some(unsafe { (*current).value() })
        }
    }

    /// Step to the next node at level 0.
    ///
    /// Levels that the passed node was linked on move along with it. Past the
    /// end this is a no-op.
    pub fn advance(&mut self) {
        if !self.is_valid() {
            return;
        }

        let passed = self.succs[0];
        let passed_height = self.current_height();

        self.preds[0] = passed;
        self.succs[0] = unsafe { (*passed).forward(0) };

        for level in 1..passed_height {
            if self.succs[level] != passed {
                break;
            }
            self.preds[level] = passed;
            self.succs[level] = unsafe { (*passed).forward(level) };
        }
    }

    /// Move forward to `value`, or to the first element after it.
    ///
    /// Returns whether an element equal to `value` was found and is not
    /// marked for removal. `value` must not sort before the current element.
    pub fn to(&mut self, value: &T) -> bool {
        let height = self.current_height();
        if height == 0 {
            return false;
        }

        let layer = height - 1;
        let max_layer = self.max_layer();
        let list = self.accessor.skip_list();

        // Climb from the hinted level until the successor there is no longer
        // before `value`.
        let mut start = self.hints[layer] as usize;
        while list.greater(value, self.succs[start]) && start < max_layer {
            start += 1;
        }
        self.hints[layer] = start as u8;

        let found = list.find_insertion_point(
            self.preds[start],
            start,
            value,
            &mut self.preds,
            &mut self.succs,
        );

        match found {
            Some(_) => unsafe { !(*self.succs[0]).marked_for_removal() },
            None => false,
        }
    }
}
