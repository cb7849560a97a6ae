/// Item state definitions for tracking download progress
///
/// An item moves `Queued → Skipped` when it is already on disk, or
/// `Queued → Downloading → {Downloaded | DownloadFailed}` otherwise.
use std::fmt;

/// Represents the current state of an item in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemState {
    // ===== Active States =====
    /// Item is waiting in the item queue
    Queued,

    /// Resource is being resolved and downloaded
    Downloading,

    // ===== Terminal States =====
    /// Resource was downloaded by an earlier run
    Skipped,

    /// Resource was written to disk in full
    Downloaded,

    /// Resolving or downloading the resource failed
    DownloadFailed,
}

impl ItemState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Downloading)
    }

    /// Returns true if the resource is on disk after this state
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Skipped | Self::Downloaded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Skipped => "skipped",
            Self::Downloaded => "downloaded",
            Self::DownloadFailed => "download_failed",
        }
    }

    /// Returns all possible item states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Downloading,
            Self::Skipped,
            Self::Downloaded,
            Self::DownloadFailed,
        ]
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
