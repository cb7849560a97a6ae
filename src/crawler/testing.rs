//! In-memory [`Fetcher`] for unit tests

use crate::crawler::fetcher::{Document, Fetcher};
use crate::{Result, ScrollError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// Serves canned documents and writes the resource URL as file contents
#[derive(Debug, Default)]
pub(crate) struct ScriptedFetcher {
    pages: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    requested: Mutex<Vec<String>>,
    document_requests: AtomicUsize,
    downloads: AtomicUsize,
    download_delay: Option<Duration>,
    download_started: Notify,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every download sleeps for `delay` after announcing itself
    pub(crate) fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    pub(crate) fn page(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    /// Requests for `url` fail with HTTP 500
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn document_requests(&self) -> usize {
        self.document_requests.load(Ordering::SeqCst)
    }

    /// Download attempts, successful or not
    pub(crate) fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Every URL requested so far, documents and downloads alike
    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// Resolves once a download has started
    pub(crate) async fn download_started(&self) {
        self.download_started.notified().await
    }

    fn check(&self, url: &str) -> Result<()> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            return Err(ScrollError::transport(url, "HTTP 500"));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_document(&self, url: &str) -> Result<Document> {
        self.document_requests.fetch_add(1, Ordering::SeqCst);
        self.check(url)?;
        let body = self
            .pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ScrollError::transport(url, "HTTP 404 (dead link)"))?;
        Ok(Document::new(Url::parse(url)?, body))
    }

    async fn download_binary(&self, url: &str, destination: &Path) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.check(url)?;
        if let Some(delay) = self.download_delay {
            self.download_started.notify_one();
            tokio::time::sleep(delay).await;
        }
        tokio::fs::write(destination, url.as_bytes()).await?;
        Ok(())
    }
}
