//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator drives one work at a time end-to-end:
//! - Fetching the work document and its unit list
//! - Reconciling the fresh tree with the cached one
//! - Running the unit and item worker pools until both are drained
//! - Reporting failures and persisting the final tree

use crate::cache::{reconcile, CacheStore, SharedWork};
use crate::config::{Config, TargetEntry};
use crate::crawler::context::CrawlContext;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::item_worker::run_item_worker;
use crate::crawler::parser::{DocumentKind, DocumentParser, ParserRegistry};
use crate::crawler::signals::Signals;
use crate::crawler::unit_worker::run_unit_worker;
use crate::output::{CrawlReport, FailureLog, WorkOutcome, WorkReport};
use crate::state::{StateTally, UnitState};
use crate::tree::{Unit, UnitKey, Work};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    parsers: ParserRegistry,
    store: CacheStore,
    cancel: CancellationToken,
    ignore_cache: bool,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ScrollError)` - The HTTP client or a parser could not be built
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::from_config(&config.user_agent, &config.crawler)?);
        let parsers = ParserRegistry::from_config(&config)?;
        Ok(Self::with_parts(config, fetcher, parsers))
    }

    /// Creates a coordinator around an existing fetcher and parser set
    pub fn with_parts(config: Config, fetcher: Arc<dyn Fetcher>, parsers: ParserRegistry) -> Self {
        let store = CacheStore::new(&config.output.root);
        Self {
            config: Arc::new(config),
            fetcher,
            parsers,
            store,
            cancel: CancellationToken::new(),
            ignore_cache: false,
        }
    }

    /// Skips loading caches, so every work is crawled as if seen for the first time
    pub fn ignore_cache(mut self, ignore: bool) -> Self {
        self.ignore_cache = ignore;
        self
    }

    /// Token that stops the crawl when cancelled
    ///
    /// Downloads already in flight are allowed to finish; no new unit or item
    /// is started, and no further work is visited.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls every configured target in order
    pub async fn run(&self) -> CrawlReport {
        let mut report = CrawlReport::new();
        tracing::info!("Starting crawl of {} works", self.config.targets.len());

        for target in &self.config.targets {
            if self.cancel.is_cancelled() {
                tracing::info!("Crawl cancelled; skipping remaining works");
                report.cancelled = true;
                break;
            }

            let work = self
                .crawl_work(target)
                .instrument(tracing::info_span!("work", url = %target.url))
                .await;
            if work.outcome == WorkOutcome::Cancelled {
                report.cancelled = true;
            }
            report.works.push(work);
        }

        report.finish();
        tracing::info!(
            "Crawl finished: {} works visited{}",
            report.works.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }

    /// Crawls a single work to completion
    ///
    /// Never fails as a whole: a work whose own document cannot be fetched is
    /// reported as [`WorkOutcome::FetchFailed`] and the caller moves on.
    pub async fn crawl_work(&self, target: &TargetEntry) -> WorkReport {
        let started_at = Utc::now();
        tracing::info!("Crawling {}", target.url);

        let parser = match self.parsers.get(&target.parser) {
            Ok(parser) => parser,
            Err(e) => {
                tracing::warn!(
                    "Skipping {}: {} (known parsers: {})",
                    target.url,
                    e,
                    self.parsers.names().collect::<Vec<_>>().join(", ")
                );
                return WorkReport::fetch_failed(&target.url, started_at, e.to_string());
            }
        };

        let mut work = match fetch_work(self.fetcher.as_ref(), parser.as_ref(), &target.url).await {
            Ok(work) => work,
            Err(e) => {
                tracing::warn!("Failed to fetch work {}: {}", target.url, e);
                return WorkReport::fetch_failed(&target.url, started_at, e.to_string());
            }
        };

        if self.ignore_cache {
            tracing::info!("Ignoring cache for {}", target.url);
        } else {
            match self.store.load(&work).await {
                Ok(Some(cached)) => {
                    reconcile(&mut work, cached, self.config.crawler.merge_policy);
                }
                Ok(None) => tracing::info!("No cache for {}; starting cold", target.url),
                Err(e) => tracing::warn!("Ignoring unreadable cache for {}: {}", target.url, e),
            }
        }

        let work_title = work.title.clone().unwrap_or_else(|| work.url.clone());
        let unit_keys: Vec<UnitKey> = work.units.iter().map(Unit::key).collect();
        tracing::info!(
            "{}: {} units, {} already complete",
            work_title,
            unit_keys.len(),
            work.complete_units()
        );

        let unit_workers = self.config.crawler.unit_workers.max(1);
        let item_workers = self.config.crawler.item_workers.max(1);

        let ctx = Arc::new(CrawlContext {
            work: SharedWork::new(work),
            work_title,
            fetcher: Arc::clone(&self.fetcher),
            parser,
            store: self.store.clone(),
            failures: FailureLog::new(),
            signals: Signals::new(self.cancel.child_token(), unit_workers),
        });
        ctx.persist("reconciling").await;

        let tally = run_pools(&ctx, unit_keys, unit_workers, item_workers).await;
        if !ctx.signals.is_exhausted() {
            // Only a unit worker that died before exiting its loop gets here
            tracing::error!("{}: unit stage never reported exhaustion", ctx.work_title);
        }

        let failures = ctx.failures.drain();
        if failures.is_empty() {
            tracing::info!("{}: every unit and item succeeded", ctx.work_title);
        } else {
            for failure in &failures.units {
                tracing::info!("Failed unit: {}", failure);
            }
            for failure in &failures.items {
                tracing::info!("Failed item: {}", failure);
            }
        }

        ctx.persist("finishing").await;

        let outcome = if ctx.signals.is_cancelled() {
            WorkOutcome::Cancelled
        } else {
            WorkOutcome::Completed
        };
        let (title, total_units, complete_units) = ctx.work.read(|work| {
            (work.title.clone(), work.units.len(), work.complete_units())
        });

        tracing::info!(
            "{}: {} ({}/{} units complete)",
            ctx.work_title,
            outcome,
            complete_units,
            total_units
        );

        WorkReport {
            url: target.url.clone(),
            title,
            started_at,
            finished_at: Utc::now(),
            outcome,
            tally,
            failures,
            total_units,
            complete_units,
        }
    }
}

/// Runs both worker pools over one work and waits for every worker
async fn run_pools(
    ctx: &Arc<CrawlContext>,
    unit_keys: Vec<UnitKey>,
    unit_workers: usize,
    item_workers: usize,
) -> StateTally {
    let (unit_tx, unit_rx) = mpsc::unbounded_channel();
    for key in unit_keys {
        tracing::trace!("Unit {} is {}", key.unit, UnitState::Queued);
        if unit_tx.send(key).is_err() {
            break;
        }
    }
    drop(unit_tx);
    let unit_queue = Arc::new(Mutex::new(unit_rx));

    let (item_tx, item_rx) = mpsc::unbounded_channel();
    let item_queue = Arc::new(Mutex::new(item_rx));

    let mut workers = JoinSet::new();
    for id in 0..item_workers {
        workers.spawn(
            run_item_worker(id, Arc::clone(ctx), Arc::clone(&item_queue))
                .instrument(tracing::debug_span!("item_worker", id)),
        );
    }
    for id in 0..unit_workers {
        workers.spawn(
            run_unit_worker(id, Arc::clone(ctx), Arc::clone(&unit_queue), item_tx.clone())
                .instrument(tracing::debug_span!("unit_worker", id)),
        );
    }
    // The item queue closes once the last unit worker drops its sender
    drop(item_tx);
    drop(item_queue);

    tracing::debug!(
        "{}: started {} unit workers and {} item workers",
        ctx.work_title,
        unit_workers,
        item_workers
    );

    let mut tally = StateTally::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(worker_tally) => tally.merge(worker_tally),
            Err(e) => tracing::error!("{}: worker died: {}", ctx.work_title, e),
        }
    }
    tally
}

/// Fetches a work document and builds a skeleton tree from it
///
/// # Returns
///
/// * `Ok(Work)` - Titled work with one untitled, empty unit per listed URL
/// * `Err(ScrollError)` - The document could not be fetched or parsed
pub async fn fetch_work(
    fetcher: &dyn Fetcher,
    parser: &dyn DocumentParser,
    url: &str,
) -> Result<Work> {
    let document = fetcher.fetch_document(url).await?;
    let title = parser.extract_title(DocumentKind::Work, &document)?;
    let unit_urls = parser
        .extract_child_urls(DocumentKind::Work, &document, fetcher)
        .await?;

    let mut work = Work::new(url);
    work.title = Some(title);
    work.set_unit_urls(unit_urls);
    tracing::debug!("Fetched {}: {} units listed", url, work.units.len());
    Ok(work)
}

/// Runs a complete crawl over HTTP
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use sumi_scroll::config::load_config;
/// use sumi_scroll::crawler::run_crawl;
/// use std::path::Path;
///
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} works crawled", report.works.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    Ok(Coordinator::new(config)?.run().await)
}
