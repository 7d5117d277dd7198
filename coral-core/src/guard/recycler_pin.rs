//! Scoped pin over a reclaimable structure.

use std::ops::Deref;
use std::sync::Arc;

/// Structures that defer node destruction while pinned.
///
/// Every `add_ref` must be matched by exactly one `release_ref`. A leaked pin
/// blocks reclamation forever; an extra release frees nodes that readers may
/// still dereference. `RecyclerPin` is the only caller.
///
pub(crate) trait Reclaimable {
    /// Pin; returns the previous pin count.
    fn add_ref(&self) -> usize;

    /// Unpin; returns the previous pin count.
    fn release_ref(&self) -> usize;
}

/// Owning handle that keeps `R` pinned for its whole lifetime.
pub(crate) struct RecyclerPin<R: Reclaimable> {
    target: Arc<R>,
}

impl<R: Reclaimable> RecyclerPin<R> {
    pub(crate) fn new(target: Arc<R>) -> Self {
        target.add_ref();
        RecyclerPin { target }
    }

    pub(crate) fn target(&self) -> &Arc<R> {
        &self.target
    }
}

impl<R: Reclaimable> Clone for RecyclerPin<R> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.target))
    }
}

impl<R: Reclaimable> Drop for RecyclerPin<R> {
    fn drop(&mut self) {
        self.target.release_ref();
    }
}

impl<R: Reclaimable> Deref for RecyclerPin<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.target
    }
}
