//! Document parsing strategies
//!
//! A [`DocumentParser`] knows how one family of sites lays out its pages:
//! where the title is, where the links to the next level are, and where an
//! item page keeps its resource. Parsers are chosen per work from a
//! [`ParserRegistry`].

use crate::config::{Config, SelectorConfig};
use crate::crawler::fetcher::{Document, Fetcher};
use crate::{Result, ScrollError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use url::Url;

/// Upper bound on listing pages followed through `next-page` links
const MAX_LISTING_PAGES: usize = 200;

/// Level of the tree a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// The work's landing page, listing units
    Work,
    /// A unit page, listing items
    Unit,
}

impl DocumentKind {
    fn child_name(&self) -> &'static str {
        match self {
            Self::Work => "unit",
            Self::Unit => "item",
        }
    }
}

/// Extraction strategy for one family of target sites
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Title of a work or unit document. Fails if missing or empty.
    fn extract_title(&self, kind: DocumentKind, document: &Document) -> Result<String>;

    /// Ordered absolute URLs of the document's children
    ///
    /// May fetch further listing pages through `fetcher` to assemble the full
    /// list.
    async fn extract_child_urls(
        &self,
        kind: DocumentKind,
        document: &Document,
        fetcher: &dyn Fetcher,
    ) -> Result<Vec<String>>;

    /// Resource URL found on an item's own page
    fn extract_resource_url(&self, document: &Document) -> Result<String>;

    /// True if the URLs listed on a unit page are the resources themselves
    fn items_are_resources(&self) -> bool {
        false
    }
}

/// [`DocumentParser`] driven by CSS selectors from the configuration
#[derive(Debug)]
pub struct SelectorParser {
    work_title: Selector,
    unit_links: Selector,
    unit_title: Selector,
    item_links: Selector,
    item_resource: Option<Selector>,
    next_page: Option<Selector>,
    items_are_resources: bool,
}

impl SelectorParser {
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            work_title: compile(&config.work_title)?,
            unit_links: compile(&config.unit_links)?,
            unit_title: compile(&config.unit_title)?,
            item_links: compile(&config.item_links)?,
            item_resource: config.item_resource.as_deref().map(compile).transpose()?,
            next_page: config.next_page.as_deref().map(compile).transpose()?,
            items_are_resources: config.items_are_resources,
        })
    }

    /// Links of one listing page plus the link to the following page, if any
    fn listing_page(
        &self,
        kind: DocumentKind,
        document: &Document,
    ) -> (Vec<String>, Option<String>) {
        let html = Html::parse_document(&document.body);
        let selector = match kind {
            DocumentKind::Work => &self.unit_links,
            DocumentKind::Unit => &self.item_links,
        };

        let links = html
            .select(selector)
            .filter_map(|element| element_link(element))
            .filter_map(|href| resolve_link(href, &document.url))
            .collect();

        let next = match (kind, &self.next_page) {
            (DocumentKind::Work, Some(next_page)) => html
                .select(next_page)
                .filter_map(element_link)
                .find_map(|href| resolve_link(href, &document.url)),
            _ => None,
        };

        (links, next)
    }
}

#[async_trait]
impl DocumentParser for SelectorParser {
    fn extract_title(&self, kind: DocumentKind, document: &Document) -> Result<String> {
        let html = Html::parse_document(&document.body);
        let selector = match kind {
            DocumentKind::Work => &self.work_title,
            DocumentKind::Unit => &self.unit_title,
        };

        html.select(selector)
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .find(|title| !title.is_empty())
            .ok_or_else(|| {
                ScrollError::Extraction(format!("no title found on {}", document.url))
            })
    }

    async fn extract_child_urls(
        &self,
        kind: DocumentKind,
        document: &Document,
        fetcher: &dyn Fetcher,
    ) -> Result<Vec<String>> {
        let (mut urls, mut next) = self.listing_page(kind, document);
        let mut visited = HashSet::from([document.url.to_string()]);

        while let Some(next_url) = next.take() {
            if !visited.insert(next_url.clone()) {
                tracing::debug!("Listing of {} loops back to {}", document.url, next_url);
                break;
            }
            if visited.len() > MAX_LISTING_PAGES {
                tracing::warn!(
                    "Listing of {} exceeds {} pages; stopping",
                    document.url,
                    MAX_LISTING_PAGES
                );
                break;
            }

            tracing::debug!("Following listing page {}", next_url);
            let page = fetcher.fetch_document(&next_url).await?;
            let (more, following) = self.listing_page(kind, &page);
            urls.extend(more);
            next = following;
        }

        let mut seen = HashSet::new();
        urls.retain(|url| seen.insert(url.clone()));

        if urls.is_empty() {
            return Err(ScrollError::Extraction(format!(
                "no {} links found on {}",
                kind.child_name(),
                document.url
            )));
        }

        Ok(urls)
    }

    fn extract_resource_url(&self, document: &Document) -> Result<String> {
        let selector = self.item_resource.as_ref().ok_or_else(|| {
            ScrollError::Extraction("parser has no item-resource selector".to_string())
        })?;

        let html = Html::parse_document(&document.body);
        html.select(selector)
            .filter_map(element_link)
            .find_map(|href| resolve_link(href, &document.url))
            .ok_or_else(|| {
                ScrollError::Extraction(format!("no resource found on {}", document.url))
            })
    }

    fn items_are_resources(&self) -> bool {
        self.items_are_resources
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrollError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// URL-bearing attribute of an element: `href` for links, `src` for images
fn element_link(element: ElementRef<'_>) -> Option<&str> {
    let value = element.value();
    value
        .attr("href")
        .or_else(|| value.attr("src"))
        .or_else(|| value.attr("data-src"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Parser families available to the crawler, by name
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: BTreeMap<String, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one [`SelectorParser`] per `[parsers.<name>]` table
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for (name, selectors) in &config.parsers {
            registry.insert(name.clone(), Arc::new(SelectorParser::new(selectors)?));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, parser: Arc<dyn DocumentParser>) {
        self.parsers.insert(name.into(), parser);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DocumentParser>> {
        self.parsers
            .get(name)
            .cloned()
            .ok_or_else(|| ScrollError::UnknownParser(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }
}
