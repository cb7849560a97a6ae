//! Item worker pool
//!
//! Item workers take items off the item queue, resolve each item's resource
//! URL and file name, and download it into the unit's directory. Every item
//! handed to a worker ends up `processed`, whatever the outcome. When that
//! settles its unit, the tree is saved.

use crate::crawler::context::{log_error, CrawlContext};
use crate::output::FailedItem;
use crate::state::{ItemState, StateTally};
use crate::tree::ItemKey;
use crate::{Result, ScrollError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Queue of items waiting for a worker
///
/// Closes once every unit worker has dropped its sender.
pub(crate) type ItemQueue = Arc<Mutex<mpsc::UnboundedReceiver<ItemKey>>>;

/// Runs one item worker until the queue closes or the crawl is cancelled
///
/// A download already in progress when cancellation arrives is finished
/// before the worker exits.
pub(crate) async fn run_item_worker(id: usize, ctx: Arc<CrawlContext>, queue: ItemQueue) -> StateTally {
    let mut tally = StateTally::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.signals.cancelled() => {
                tracing::debug!("Item worker {} stopping: cancelled", id);
                break;
            }
            next = async { queue.lock().await.recv().await } => next,
        };

        let Some(key) = next else {
            tracing::debug!(
                "Item worker {} stopping: queue closed (unit stage exhausted: {})",
                id,
                ctx.signals.is_exhausted()
            );
            break;
        };

        let state = process_item(&ctx, key).await;
        tally.record_item(state);
    }

    tally
}

/// Takes one item to a terminal state and marks it processed
pub(crate) async fn process_item(ctx: &CrawlContext, key: ItemKey) -> ItemState {
    let already = ctx
        .work
        .read(|work| work.resolve_item(key).map(|item| item.downloaded));

    let outcome = match already {
        Ok(true) => Ok(None),
        Ok(false) => {
            tracing::debug!("Item {}/{} is {}", key.unit, key.item, ItemState::Downloading);
            download_item(ctx, key).await.map(Some)
        }
        Err(e) => Err(e.into()),
    };

    let settled = ctx.work.write(|work| -> Result<(bool, ItemState)> {
        let unit = work.resolve_unit_mut(key.unit_key())?;
        let was_settled = unit.is_settled();
        let item = unit.item_mut(key.item)?;

        let state = match &outcome {
            Ok(None) => ItemState::Skipped,
            Ok(Some(path)) => {
                item.mark_downloaded(path.clone());
                ItemState::Downloaded
            }
            Err(_) => ItemState::DownloadFailed,
        };
        item.processed = true;

        Ok((!was_settled && unit.is_settled(), state))
    });

    let state = match (settled, outcome) {
        (Ok((settled_now, state)), outcome) => {
            if let Err(e) = outcome {
                record_failure(ctx, key, e);
            }
            if settled_now {
                tracing::info!("Unit {} of {} settled", key.unit, ctx.work_title);
                ctx.persist(&format!("settling unit {}", key.unit)).await;
            }
            state
        }
        (Err(e), outcome) => {
            if let Err(first) = outcome {
                log_error(&ctx.work_title, &format!("item {}/{}", key.unit, key.item), &first);
            }
            record_failure(ctx, key, e);
            ItemState::DownloadFailed
        }
    };

    tracing::debug!(
        "Item {} of unit {} of {} is {}",
        key.item,
        key.unit,
        ctx.work_title,
        state
    );
    state
}

/// Resolves and downloads one item's resource
///
/// # Returns
///
/// The absolute path of the downloaded file
async fn download_item(ctx: &CrawlContext, key: ItemKey) -> Result<PathBuf> {
    let (page_url, image_url) = ctx.work.read(|work| {
        work.resolve_item(key)
            .map(|item| (item.page_url.clone(), item.image_url.clone()))
    })?;

    let image_url = match image_url {
        Some(url) => url,
        None => {
            tracing::debug!("Resolving resource of item {}/{} from {}", key.unit, key.item, page_url);
            let document = ctx.fetcher.fetch_document(&page_url).await?;
            ctx.parser.extract_resource_url(&document)?
        }
    };

    let destination = ctx.work.write(|work| -> Result<PathBuf> {
        let unit_dir = ctx
            .store
            .work_dir(work)?
            .join(work.resolve_unit(key.unit_key())?.directory_name()?);
        let item = work.resolve_item_mut(key)?;
        item.image_url = Some(image_url.clone());
        let filename = item.resolve_filename()?;
        Ok(unit_dir.join(filename))
    })?;

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    ctx.fetcher.download_binary(&image_url, &destination).await?;

    let path = match tokio::fs::canonicalize(&destination).await {
        Ok(path) => path,
        Err(_) => destination,
    };
    tracing::debug!("Downloaded {} to {}", image_url, path.display());
    Ok(path)
}

fn record_failure(ctx: &CrawlContext, key: ItemKey, error: ScrollError) {
    log_error(
        &ctx.work_title,
        &format!("item {}/{}", key.unit, key.item),
        &error,
    );

    let url = ctx
        .work
        .read(|work| {
            work.resolve_item(key)
                .map(|item| item.image_url.clone().unwrap_or_else(|| item.page_url.clone()))
        })
        .unwrap_or_default();

    ctx.failures.record_item(FailedItem {
        work_title: ctx.work_title.clone(),
        unit: key.unit,
        item: key.item,
        url,
        error: error.to_string(),
    });
}
