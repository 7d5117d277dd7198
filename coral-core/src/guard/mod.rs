//! Pinning and reclamation guards.
//!
//! This module defines how readers keep node memory alive and how the
//! recycler proves it may destroy nodes.
//!
//! # Design
//!
//! ```text
//! Accessor
//!     │
//!     └── RecyclerPin<SkipList>      add_ref() on creation / clone
//!             │                      release_ref() on drop
//!             ▼
//!         NodeRecycler ── count hits zero ──► ReclaimPermit ──► destroy nodes
//! ```
//!
//! A node unlinked while any pin is alive is parked, never freed. The only
//! functions that free parked nodes consume a `ReclaimPermit`, and a permit is
//! only minted by the transition of the pin count to zero (or by exclusive
//! `&mut` access while the recycler is being dropped).

mod recycler_pin;

pub(crate) use recycler_pin::{Reclaimable, RecyclerPin};

/// Proof that no pin is alive, so parked nodes can be destroyed.
///
/// Neither `Clone` nor `Copy`: each permit authorizes one sweep.
#[must_use]
pub(crate) struct ReclaimPermit {
    _private: (),
}

impl ReclaimPermit {
    /// Mint a permit.
    ///
    /// # Safety
    /// The caller must have observed the pin count drop to zero while holding
    /// the recycler's retire lock, or must hold exclusive access to the
    /// recycler.
    pub(crate) unsafe fn new_unchecked() -> Self {
        ReclaimPermit { _private: () }
    }
}
