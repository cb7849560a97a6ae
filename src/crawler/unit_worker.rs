//! Unit worker pool
//!
//! Unit workers pop units off a pre-filled queue, make sure each one knows
//! its title and items, and hand every item to the item pool in ascending
//! order. A worker exits when the unit queue is empty or cancellation was
//! requested; the last one to exit marks the unit stage exhausted.

use crate::crawler::context::{log_error, CrawlContext};
use crate::crawler::parser::DocumentKind;
use crate::output::FailedUnit;
use crate::state::{ItemState, StateTally, UnitState};
use crate::tree::{Item, ItemKey, UnitKey};
use crate::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Queue of units waiting for a worker, closed once filled
pub(crate) type UnitQueue = Arc<Mutex<mpsc::UnboundedReceiver<UnitKey>>>;

/// Runs one unit worker until the queue is drained or the crawl is cancelled
///
/// # Arguments
///
/// * `id` - Worker number, for logging
/// * `ctx` - Shared state of the work being crawled
/// * `queue` - Units still to process
/// * `items` - Sender side of the item queue
///
/// # Returns
///
/// The terminal state of every unit this worker handled
pub(crate) async fn run_unit_worker(
    id: usize,
    ctx: Arc<CrawlContext>,
    queue: UnitQueue,
    items: mpsc::UnboundedSender<ItemKey>,
) -> StateTally {
    let mut tally = StateTally::new();

    loop {
        if ctx.signals.is_cancelled() {
            tracing::debug!("Unit worker {} stopping: cancelled", id);
            break;
        }

        let next = queue.lock().await.try_recv();
        let Ok(key) = next else {
            break;
        };

        let state = process_unit(&ctx, key, &items).await;
        tracing::debug!("Unit {} of {} is {}", key.unit, ctx.work_title, state);
        tally.record_unit(state);
    }

    drop(items);
    if ctx.signals.unit_worker_finished() {
        tracing::debug!("All units of {} handed out", ctx.work_title);
    }
    tally
}

/// Takes one unit to a terminal state
pub(crate) async fn process_unit(
    ctx: &CrawlContext,
    key: UnitKey,
    items: &mpsc::UnboundedSender<ItemKey>,
) -> UnitState {
    let status = ctx.work.read(|work| {
        work.resolve_unit(key)
            .map(|unit| (unit.is_complete(), unit.is_populated(), unit.url.clone()))
    });

    let (complete, populated, url) = match status {
        Ok(status) => status,
        Err(e) => {
            // The unit itself is gone; its work is the closest known source
            let work_url = ctx.work.read(|work| work.url.clone());
            record_failure(ctx, key.unit, work_url, e.into());
            return UnitState::FetchFailed;
        }
    };

    if complete {
        tracing::debug!("Skipping unit {} of {}: already complete", key.unit, ctx.work_title);
        return UnitState::Skipped;
    }

    if !populated {
        tracing::debug!("Unit {} of {} is {}", key.unit, ctx.work_title, UnitState::Fetching);
        if let Err(e) = fetch_unit(ctx, key, &url).await {
            record_failure(ctx, key.unit, url, e);
            return UnitState::FetchFailed;
        }
    }

    let pending = ctx.work.read(|work| {
        work.resolve_unit(key).map(|unit| {
            let mut keys: Vec<ItemKey> = unit.items.iter().map(Item::key).collect();
            keys.sort_by_key(|k| k.item);
            keys
        })
    });

    let pending = match pending {
        Ok(pending) => pending,
        Err(e) => {
            record_failure(ctx, key.unit, url, e.into());
            return UnitState::FetchFailed;
        }
    };

    tracing::info!(
        "Unit {} of {}: queueing {} items",
        key.unit,
        ctx.work_title,
        pending.len()
    );
    ctx.persist(&format!("unit {} ready", key.unit)).await;

    for item in pending {
        tracing::trace!("Item {}/{} is {}", item.unit, item.item, ItemState::Queued);
        if items.send(item).is_err() {
            tracing::debug!("Item queue of {} closed; dropping remaining items", ctx.work_title);
            break;
        }
    }

    UnitState::Ready
}

/// Fetches a unit document and fills in its title and items
async fn fetch_unit(ctx: &CrawlContext, key: UnitKey, url: &str) -> Result<()> {
    let document = ctx.fetcher.fetch_document(url).await?;
    let title = ctx.parser.extract_title(DocumentKind::Unit, &document)?;
    let urls = ctx
        .parser
        .extract_child_urls(DocumentKind::Unit, &document, ctx.fetcher.as_ref())
        .await?;
    let resources = ctx.parser.items_are_resources();

    ctx.work.write(|work| -> Result<()> {
        let unit = work.resolve_unit_mut(key)?;
        unit.title = Some(title);
        unit.items = urls
            .into_iter()
            .enumerate()
            .map(|(idx, url)| {
                let num = idx as u32 + 1;
                if resources {
                    Item::with_resource(key, num, url)
                } else {
                    Item::new(key, num, url)
                }
            })
            .collect();
        Ok(())
    })
}

fn record_failure(ctx: &CrawlContext, unit: u32, url: String, error: crate::ScrollError) {
    log_error(&ctx.work_title, &format!("unit {}", unit), &error);
    ctx.failures.record_unit(FailedUnit {
        work_title: ctx.work_title.clone(),
        unit,
        url,
        error: error.to_string(),
    });
}
