use std::fmt;
use std::sync::Arc;

use super::skip_list::SkipList;
use super::skip_list_iter::Iter;
use super::skipper::Skipper;
use crate::data_structures::comparator::{Comparator, NaturalOrder};
use crate::data_structures::internal::{NodeAllocator, SkipNodePtr, SystemNodeAllocator};
use crate::guard::RecyclerPin;

/// Pinned handle to a [`SkipList`]. All reads and writes go through one.
///
/// While any accessor of a list is alive, nodes removed from that list are
/// parked instead of freed, so every reference handed out here stays valid for
/// as long as the accessor it came from. The element may have been removed
/// from the list in the meantime; it is still readable.
///
/// Cloning pins again; dropping unpins. The last accessor to drop after a
/// change frees the parked nodes.
///
/// Parked nodes are not reused, so memory grows with every removal made while
/// some accessor stays alive. Hold accessors for the span of a request or a
/// batch, not for the life of the shard; a list that is never fully unpinned
/// only gives its removed nodes back when it is dropped.
///
/// ```
/// use coral_core::SkipList;
///
/// let accessor = SkipList::<i32>::create(1).unwrap();
/// accessor.add(2);
/// accessor.add(5);
/// accessor.add(4);
///
/// assert_eq!(accessor.iter().copied().collect::<Vec<_>>(), vec![2, 4, 5]);
/// assert_eq!(accessor.first(), Some(&2));
/// assert_eq!(accessor.last(), Some(&5));
/// ```
pub struct Accessor<T, C = NaturalOrder, A: NodeAllocator = SystemNodeAllocator> {
    pin: RecyclerPin<SkipList<T, C, A>>,
}

impl<T, C, A: NodeAllocator> Accessor<T, C, A> {
    pub(crate) fn new(list: Arc<SkipList<T, C, A>>) -> Self {
        Accessor {
            pin: RecyclerPin::new(list),
        }
    }

    /// The list this accessor pins.
    pub fn skip_list(&self) -> &Arc<SkipList<T, C, A>> {
        self.pin.target()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pin.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pin.is_empty()
    }

    /// Current level count of the head.
    #[inline]
    pub fn height(&self) -> usize {
        self.pin.height()
    }

    #[inline]
    fn value_of(&self, node: SkipNodePtr<T>) -> Option<&T> {
        if node.is_null() {
            None
        } else {
            Some(unsafe { (*node).value() })
        }
    }
}

impl<T, C: Comparator<T>, A: NodeAllocator> Accessor<T, C, A> {
    /// Insert `value` unless an equal element is present.
    ///
    /// Returns the stored element (the existing one on a duplicate) and whether
    /// this call inserted it.
    pub fn insert(&self, value: T) -> (&T, bool) {
        let (node, inserted) = self.pin.add_or_get(value);
        (unsafe { (*node).value() }, inserted)
    }

    pub fn add(&self, value: T) -> bool {
        self.pin.add_or_get(value).1
    }

    pub fn remove(&self, value: &T) -> bool {
        self.pin.remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        !self.pin.find(value).is_null()
    }

    pub fn find(&self, value: &T) -> Option<&T> {
        self.value_of(self.pin.find(value))
    }

    /// First element that does not sort before `value`.
    pub fn lower_bound(&self, value: &T) -> Option<&T> {
        self.value_of(self.pin.lower_bound(value))
    }

    pub fn first(&self) -> Option<&T> {
        self.value_of(self.pin.first())
    }

    pub fn last(&self) -> Option<&T> {
        self.value_of(self.pin.last())
    }

    /// Remove the last element. Not atomic: another thread may remove it (or
    /// append after it) between the lookup and the removal.
    pub fn pop_back(&self) -> bool {
        let node = self.pin.last();
        !node.is_null() && self.pin.remove(unsafe { (*node).value() })
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.pin.first())
    }

    /// Iterate from the first element that does not sort before `value`.
    pub fn iter_from(&self, value: &T) -> Iter<'_, T> {
        Iter::new(self.pin.lower_bound(value))
    }

    pub fn skipper(&self) -> Skipper<T, C, A> {
        Skipper::new(self.clone())
    }
}

impl<T, C, A: NodeAllocator> Clone for Accessor<T, C, A> {
    fn clone(&self) -> Self {
        Accessor {
            pin: self.pin.clone(),
        }
    }
}

impl<'a, T, C: Comparator<T>, A: NodeAllocator> IntoIterator for &'a Accessor<T, C, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, C: Comparator<T>, A: NodeAllocator> fmt::Debug for Accessor<T, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
