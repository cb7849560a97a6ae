//! Resource fetching
//!
//! This module handles all network access for the crawler:
//! - The [`Fetcher`] trait the workers depend on
//! - Building HTTP clients with proper user agent strings
//! - GET requests for documents
//! - Streaming binary downloads to disk without leaving partial files

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::{Result, ScrollError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// A fetched document, ready for a [`DocumentParser`](super::DocumentParser)
#[derive(Debug, Clone)]
pub struct Document {
    /// Final URL after redirects, used to resolve relative links
    pub url: Url,

    /// Raw document body
    pub body: String,
}

impl Document {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }
}

/// Network access used by the crawl pipeline
///
/// Any error returned here only aborts the unit or item that asked for it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches and returns the document at `url`
    async fn fetch_document(&self, url: &str) -> Result<Document>;

    /// Downloads the resource at `url` to `destination`
    ///
    /// On success the file at `destination` is complete; on failure it is
    /// left untouched.
    async fn download_binary(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Supplies the request timeout
///
/// # Example
///
/// ```no_run
/// use sumi_scroll::config::{CrawlerConfig, UserAgentConfig};
/// use sumi_scroll::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "SumiScroll".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(build_http_client(user_agent, crawler)?))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrollError::transport(url, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrollError::transport(url, status_message(status)));
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_document(&self, url: &str) -> Result<Document> {
        tracing::debug!("Fetching document {}", url);
        let response = self.get(url).await?;
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ScrollError::transport(url, describe(&e)))?;

        Ok(Document::new(final_url, body))
    }

    async fn download_binary(&self, url: &str, destination: &Path) -> Result<()> {
        tracing::debug!("Downloading {} to {}", url, destination.display());
        let mut response = self.get(url).await?;

        let partial = partial_path(destination);
        let result = async {
            let mut file = tokio::fs::File::create(&partial).await?;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ScrollError::transport(url, describe(&e)))?
            {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&partial, destination).await?;
            Ok::<_, ScrollError>(())
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result
    }
}

/// Sibling path a download is streamed to before being renamed into place
fn partial_path(destination: &Path) -> PathBuf {
    let mut partial = destination.as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

fn status_message(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => "HTTP 404 (dead link)".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "HTTP 429 (rate limited)".to_string(),
        s => format!("HTTP {}", s.as_u16()),
    }
}

/// Classifies a reqwest error for the failure report
fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), &CrawlerConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            create_test_config().header_value(),
            "TestCrawler/1.0 (+https://example.com/about)"
        );
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/out/w/u/0001.png")),
            PathBuf::from("/out/w/u/0001.png.part")
        );
    }

    #[test]
    fn test_status_message() {
        assert_eq!(status_message(StatusCode::NOT_FOUND), "HTTP 404 (dead link)");
        assert_eq!(status_message(StatusCode::BAD_GATEWAY), "HTTP 502");
    }

    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_fetcher() -> HttpFetcher {
        HttpFetcher::from_config(&create_test_config(), &CrawlerConfig::default()).unwrap()
    }

    async fn serve_image(server: &MockServer, route: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_download_writes_complete_file() {
        let server = MockServer::start().await;
        serve_image(&server, "/img/1.png", 200).await;
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("0001.png");

        create_test_fetcher()
            .download_binary(&format!("{}/img/1.png", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_download_error_status_leaves_nothing_behind() {
        let server = MockServer::start().await;
        serve_image(&server, "/img/1.png", 500).await;
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("0001.png");

        let err = create_test_fetcher()
            .download_binary(&format!("{}/img/1.png", server.uri()), &destination)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 500"));
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_partial_file() {
        let server = MockServer::start().await;
        serve_image(&server, "/img/1.png", 200).await;
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let destination = dir.path().join("0001.png");
        std::fs::create_dir_all(destination.join("occupied")).unwrap();

        let result = create_test_fetcher()
            .download_binary(&format!("{}/img/1.png", server.uri()), &destination)
            .await;

        assert!(result.is_err());
        assert!(destination.is_dir());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_fetch_document_keeps_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/work"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Work</h1>"))
            .mount(&server)
            .await;

        let url = format!("{}/work", server.uri());
        let document = create_test_fetcher().fetch_document(&url).await.unwrap();
        assert_eq!(document.url.as_str(), url);
        assert_eq!(document.body, "<h1>Work</h1>");
    }
}
