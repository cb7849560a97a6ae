//! End-of-session crawl report

use crate::output::failures::Failures;
use crate::state::{ItemState, StateTally, UnitState};
use chrono::{DateTime, Utc};
use std::fmt;

/// How the crawl of one work ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Both worker pools ran until their queues were exhausted
    Completed,

    /// Cancellation was requested while the work was in progress
    Cancelled,

    /// The work document itself could not be fetched or parsed
    FetchFailed(String),
}

impl fmt::Display for WorkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::FetchFailed(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

/// Result of crawling a single work
#[derive(Debug, Clone)]
pub struct WorkReport {
    pub url: String,
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: WorkOutcome,
    pub tally: StateTally,
    pub failures: Failures,

    /// Units in the reconciled tree
    pub total_units: usize,

    /// Units with every item on disk at the end of the session
    pub complete_units: usize,
}

impl WorkReport {
    /// Report for a work that never got past its own document
    pub fn fetch_failed(url: impl Into<String>, started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            url: url.into(),
            title: None,
            started_at,
            finished_at: Utc::now(),
            outcome: WorkOutcome::FetchFailed(error),
            tally: StateTally::new(),
            failures: Failures::default(),
            total_units: 0,
            complete_units: 0,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Result of a whole crawl session
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub works: Vec<WorkReport>,

    /// True if the session stopped before every target was visited
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            works: Vec::new(),
            cancelled: false,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Sum of every work's tally
    pub fn totals(&self) -> StateTally {
        let mut totals = StateTally::new();
        for work in &self.works {
            totals.merge(work.tally.clone());
        }
        totals
    }

    /// True if every work completed without a single failed unit or item
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self
                .works
                .iter()
                .all(|w| w.outcome == WorkOutcome::Completed && w.failures.is_empty() && w.tally.is_clean())
    }
}

impl Default for CrawlReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    let totals = report.totals();
    println!("Overview:");
    println!("  Works: {}", report.works.len());
    println!("  Started: {}", report.started_at.to_rfc3339());
    if let Some(finished) = report.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
        println!(
            "  Duration: {}s",
            (finished - report.started_at).num_seconds()
        );
    }
    if report.cancelled {
        println!("  Status: cancelled");
    }
    println!();

    println!("Units:");
    for state in UnitState::all_states().into_iter().filter(|s| s.is_terminal()) {
        println!("  {}: {}", state, totals.units_in(state));
    }
    println!();

    println!("Items:");
    for state in ItemState::all_states().into_iter().filter(|s| s.is_terminal()) {
        println!("  {}: {}", state, totals.items_in(state));
    }
    println!();

    println!("Works:");
    for work in &report.works {
        println!(
            "  {} [{}] {}/{} units complete, {} failures, {}s",
            work.display_name(),
            work.outcome,
            work.complete_units,
            work.total_units,
            work.failures.len(),
            work.duration_seconds()
        );
        for failure in &work.failures.units {
            println!("    - {}", failure);
        }
        for failure in &work.failures.items {
            println!("    - {}", failure);
        }
    }
    println!();
}
