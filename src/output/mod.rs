//! Output module for crawl failures and end-of-session reports
//!
//! This module handles:
//! - Collecting unit and item failures while workers run
//! - Summarizing each work and the whole session
//! - Printing the session report

mod failures;
mod report;

pub use failures::{FailedItem, FailedUnit, FailureLog, Failures};
pub use report::{print_report, CrawlReport, WorkOutcome, WorkReport};
