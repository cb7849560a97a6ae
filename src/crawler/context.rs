use crate::cache::{CacheStore, SharedWork};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::DocumentParser;
use crate::crawler::signals::Signals;
use crate::output::FailureLog;
use crate::ScrollError;
use std::sync::Arc;

/// Everything the workers of one work share
pub struct CrawlContext {
    pub work: SharedWork,

    /// Title of the work, for log lines and failure records
    pub work_title: String,

    pub fetcher: Arc<dyn Fetcher>,
    pub parser: Arc<dyn DocumentParser>,
    pub store: CacheStore,
    pub failures: FailureLog,
    pub signals: Signals,
}

impl CrawlContext {
    /// Saves the tree, logging instead of failing
    ///
    /// A failed save only loses progress since the previous one; the crawl
    /// itself carries on.
    pub async fn persist(&self, reason: &str) {
        match self.work.save(&self.store).await {
            Ok(path) => tracing::debug!("Saved {} after {} to {}", self.work_title, reason, path.display()),
            Err(e) => tracing::error!("{}: save after {} failed: {}", self.work_title, reason, e),
        }
    }
}

/// Logs a unit or item failure
///
/// Failures a later run may get past are warnings. Anything else, tree state
/// errors in particular, is logged as an error.
pub(crate) fn log_error(work_title: &str, context: &str, error: &ScrollError) {
    if error.is_retryable() {
        tracing::warn!("{} ({}): {}", work_title, context, error);
    } else {
        tracing::error!("{} ({}): {}", work_title, context, error);
    }
}
