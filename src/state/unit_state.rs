/// Unit state definitions for tracking crawl progress
///
/// A unit moves `Queued → Skipped` when it is already complete, or
/// `Queued → Fetching → {Ready | FetchFailed}` otherwise.
use std::fmt;

/// Represents the current state of a unit in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitState {
    // ===== Active States =====
    /// Unit is waiting in the unit queue
    Queued,

    /// Unit document is being fetched and parsed
    Fetching,

    // ===== Terminal States =====
    /// Every item was already downloaded; nothing was fetched
    Skipped,

    /// Unit has a title and items, all of which were handed to the item queue
    Ready,

    /// Fetching or parsing the unit failed; no items were enqueued
    FetchFailed,
}

impl UnitState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Fetching)
    }

    /// Returns true if this represents a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Skipped => "skipped",
            Self::Ready => "ready",
            Self::FetchFailed => "fetch_failed",
        }
    }

    /// Returns all possible unit states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Skipped,
            Self::Ready,
            Self::FetchFailed,
        ]
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
