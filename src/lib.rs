//! Sumi-Scroll: a resumable mirror for serialized works
//!
//! This crate crawls a work (an ordered list of units, each an ordered list of
//! downloadable items) and mirrors it to local storage. Progress is kept in a
//! per-work cache file so an interrupted or partially failed run picks up where
//! it left off without repeating finished downloads.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod tree;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sumi-Scroll operations
#[derive(Debug, Error)]
pub enum ScrollError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Corrupt cache file {}: {source}", path.display())]
    CacheCorruption {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Tree state error: {0}")]
    State(#[from] tree::StateError),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Unknown parser family: {0}")]
    UnknownParser(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrollError {
    /// Builds a transport error from anything displayable
    pub fn transport(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// True for errors that only affect the unit or item that raised them
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Extraction(_) | Self::Io(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Sumi-Scroll operations
pub type Result<T> = std::result::Result<T, ScrollError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlContext};
pub use output::CrawlReport;
pub use tree::{Item, Unit, Work};
