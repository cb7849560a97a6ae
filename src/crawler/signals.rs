use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Shutdown signals shared by the worker pools of one work
///
/// Cancellation comes from outside (Ctrl-C, or a caller holding the
/// coordinator's token). Exhaustion is raised by the last unit worker to exit,
/// after which no further item will ever be enqueued.
#[derive(Debug)]
pub struct Signals {
    cancel: CancellationToken,
    exhausted: AtomicBool,
    remaining_unit_workers: AtomicUsize,
}

impl Signals {
    pub fn new(cancel: CancellationToken, unit_workers: usize) -> Self {
        Self {
            cancel,
            exhausted: AtomicBool::new(unit_workers == 0),
            remaining_unit_workers: AtomicUsize::new(unit_workers),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolves once cancellation was requested
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Records that a unit worker exited
    ///
    /// Returns true for the last one, which also raises the exhaustion flag.
    pub fn unit_worker_finished(&self) -> bool {
        let last = self.remaining_unit_workers.fetch_sub(1, Ordering::AcqRel) == 1;
        if last {
            self.exhausted.store(true, Ordering::Release);
        }
        last
    }

    /// True once every unit worker has exited
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }
}
