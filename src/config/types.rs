use crate::cache::MergePolicy;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Sumi-Scroll
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub parsers: BTreeMap<String, SelectorConfig>,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of unit workers fetching unit documents
    #[serde(rename = "unit-workers", default = "default_unit_workers")]
    pub unit_workers: usize,

    /// Number of item workers downloading resources
    #[serde(rename = "item-workers", default = "default_item_workers")]
    pub item_workers: usize,

    /// Timeout applied to every request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How cached units are merged with freshly fetched ones
    #[serde(rename = "merge-policy", default)]
    pub merge_policy: MergePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            unit_workers: default_unit_workers(),
            item_workers: default_item_workers(),
            request_timeout_secs: default_request_timeout(),
            merge_policy: MergePolicy::default(),
        }
    }
}

fn default_unit_workers() -> usize {
    1
}

fn default_item_workers() -> usize {
    5
}

fn default_request_timeout() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory every work is mirrored under
    #[serde(default = "default_output_root")]
    pub root: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

fn default_output_root() -> String {
    "./output".to_string()
}

/// CSS selectors describing one family of target sites
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Element holding the work title
    #[serde(rename = "work-title")]
    pub work_title: String,

    /// Links to the units of a work, in reading order
    #[serde(rename = "unit-links")]
    pub unit_links: String,

    /// Element holding the unit title
    #[serde(rename = "unit-title")]
    pub unit_title: String,

    /// Links to the items of a unit, in reading order
    #[serde(rename = "item-links")]
    pub item_links: String,

    /// Element on an item page pointing at the resource
    #[serde(rename = "item-resource", default)]
    pub item_resource: Option<String>,

    /// Link to the next page of a paginated listing
    #[serde(rename = "next-page", default)]
    pub next_page: Option<String>,

    /// The item links already point at the resources
    #[serde(rename = "items-are-resources", default)]
    pub items_are_resources: bool,
}

/// One work to mirror
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub url: String,

    /// Name of the `[parsers.<name>]` table used for this target
    #[serde(default = "default_parser_name")]
    pub parser: String,
}

fn default_parser_name() -> String {
    "default".to_string()
}
