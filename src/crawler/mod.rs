//! Crawler module for mirroring works
//!
//! This module contains the core crawling logic, including:
//! - Fetching documents and downloading resources
//! - Site-specific extraction of titles, links and resource URLs
//! - The unit and item worker pools
//! - Overall crawl coordination

mod context;
mod coordinator;
mod fetcher;
mod item_worker;
mod parser;
mod signals;
mod unit_worker;

#[cfg(test)]
pub(crate) mod testing;

pub use context::CrawlContext;
pub use coordinator::{fetch_work, run_crawl, Coordinator};
pub use fetcher::{build_http_client, Document, Fetcher, HttpFetcher};
pub use parser::{DocumentKind, DocumentParser, ParserRegistry, SelectorParser};
pub use signals::Signals;
