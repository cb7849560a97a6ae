//! Non-owning handles between the levels of a work tree
//!
//! Children never hold a pointer to their parent. Instead each unit records the
//! [`WorkId`] of the work that owns it and each item records the [`UnitKey`] of
//! its unit. A handle is only meaningful when resolved through the work that
//! minted it; resolving it through any other work yields a [`StateError`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_WORK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one in-memory [`Work`](super::Work) instance
///
/// Two `Work` values built from the same URL (for instance a fresh fetch and a
/// cache load) have different ids, which is what lets a stale back-reference be
/// detected after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkId(u64);

impl WorkId {
    /// Mints a new id that has never been handed out before
    pub fn next() -> Self {
        Self(NEXT_WORK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Placeholder used for entities that have not been attached to a work yet
    ///
    /// Never returned by [`WorkId::next`], so resolving a detached handle
    /// always fails.
    pub const fn detached() -> Self {
        Self(0)
    }

    pub fn is_detached(&self) -> bool {
        self.0 == 0
    }
}

impl Default for WorkId {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work#{}", self.0)
    }
}

/// Handle to a unit, resolved through its owning work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnitKey {
    pub work: WorkId,
    pub unit: u32,
}

impl UnitKey {
    pub fn item(&self, item: u32) -> ItemKey {
        ItemKey {
            work: self.work,
            unit: self.unit,
            item,
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/unit {}", self.work, self.unit)
    }
}

/// Handle to an item, resolved through its owning work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub work: WorkId,
    pub unit: u32,
    pub item: u32,
}

impl ItemKey {
    pub fn unit_key(&self) -> UnitKey {
        UnitKey {
            work: self.work,
            unit: self.unit,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/unit {}/item {}", self.work, self.unit, self.item)
    }
}

/// A handle could not be resolved against the tree it was presented to
///
/// Outside of tests this always points at a reconciliation defect: some
/// subtree kept a back-reference to a work that was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("stale handle: expected {expected}, found {found}")]
    StaleHandle { expected: WorkId, found: WorkId },

    #[error("unit {0} not found")]
    UnitNotFound(u32),

    #[error("item {item} of unit {unit} not found")]
    ItemNotFound { unit: u32, item: u32 },

    #[error("{0} has no title yet")]
    MissingTitle(String),
}
