use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::data_structures::internal::SkipNodePtr;

/// Forward, single-pass iterator over a skip list.
///
/// Follows level 0 and skips nodes marked for removal when it reaches them,
/// so an element removed before the iterator gets there is not returned.
/// Concurrent inserts after the current position may or may not be seen; an
/// element removed after it was yielded stays readable for the lifetime of
/// the accessor.
pub struct Iter<'a, T> {
    node: SkipNodePtr<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(node: SkipNodePtr<T>) -> Self {
        Iter {
            node,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        // Safety: the accessor borrowed for 'a keeps every node reachable from
        // here alive.
        unsafe {
            // Re-check at yield time: the node picked on the previous call may
            // have been removed since.
            while !self.node.is_null() && (*self.node).marked_for_removal() {
                self.node = (*self.node).forward(0);
            }
            if self.node.is_null() {
                return None;
            }

            let node = &*self.node;
            self.node = node.forward(0);
            Some(node.value())
        }
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter::new(self.node)
    }
}
