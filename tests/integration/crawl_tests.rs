//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small work over HTTP and run the full
//! crawl cycle end-to-end, including resuming from the cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use sumi_scroll::config::{
    parse_config, Config, CrawlerConfig, OutputConfig, SelectorConfig, TargetEntry,
    UserAgentConfig,
};
use sumi_scroll::crawler::Coordinator;
use sumi_scroll::output::WorkOutcome;
use sumi_scroll::state::{ItemState, UnitState};
use sumi_scroll::Work;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Shape of the mocked work
struct Site {
    units: u32,
    items: u32,
    failing_unit: Option<u32>,
    gif_item: Option<(u32, u32)>,
    failing_image: Option<(u32, u32)>,
}

impl Site {
    fn new(units: u32, items: u32) -> Self {
        Self {
            units,
            items,
            failing_unit: None,
            gif_item: None,
            failing_image: None,
        }
    }

    async fn mount(&self, server: &MockServer) {
        let links: String = (1..=self.units)
            .map(|u| format!(r#"<li><a href="/u/{}">Chapter {}</a></li>"#, u, u))
            .collect();
        mount_html(
            server,
            "/work",
            format!(
                r#"<html><body><h1>Mock Work</h1><ul class="units">{}</ul></body></html>"#,
                links
            ),
        )
        .await;

        for u in 1..=self.units {
            if self.failing_unit == Some(u) {
                Mock::given(method("GET"))
                    .and(path(format!("/u/{}", u)))
                    .respond_with(ResponseTemplate::new(500))
                    .mount(server)
                    .await;
                continue;
            }

            let pages: String = (1..=self.items)
                .map(|i| format!(r#"<a href="/u/{}/p/{}">{}</a>"#, u, i, i))
                .collect();
            mount_html(
                server,
                &format!("/u/{}", u),
                format!(
                    r#"<html><body><h2>Chapter {}</h2><div class="pages">{}</div></body></html>"#,
                    u, pages
                ),
            )
            .await;

            for i in 1..=self.items {
                let ext = if self.gif_item == Some((u, i)) { "gif" } else { "png" };
                mount_html(
                    server,
                    &format!("/u/{}/p/{}", u, i),
                    format!(r#"<html><body><img id="page" src="/img/{}-{}.{}"></body></html>"#, u, i, ext),
                )
                .await;

                let status = if self.failing_image == Some((u, i)) { 500 } else { 200 };
                Mock::given(method("GET"))
                    .and(path(format!("/img/{}-{}.{}", u, i, ext)))
                    .respond_with(
                        ResponseTemplate::new(status)
                            .set_body_bytes(image_bytes(u, i))
                            .insert_header("content-type", "image/png"),
                    )
                    .mount(server)
                    .await;
            }
        }
    }
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn image_bytes(unit: u32, item: u32) -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', unit as u8, item as u8]
}

fn selectors() -> SelectorConfig {
    SelectorConfig {
        work_title: "h1".to_string(),
        unit_links: "ul.units a".to_string(),
        unit_title: "h2".to_string(),
        item_links: "div.pages a".to_string(),
        item_resource: Some("img#page".to_string()),
        next_page: None,
        items_are_resources: false,
    }
}

/// Creates a test configuration mirroring the mocked work into `root`
fn create_test_config(base_url: &str, root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            unit_workers: 2,
            item_workers: 3,
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        output: OutputConfig {
            root: root.display().to_string(),
        },
        parsers: BTreeMap::from([("default".to_string(), selectors())]),
        targets: vec![TargetEntry {
            url: format!("{}/work", base_url),
            parser: "default".to_string(),
        }],
    }
}

fn work_dir(root: &Path) -> PathBuf {
    root.join("Mock Work")
}

fn load_cache(root: &Path) -> Work {
    let bytes = std::fs::read(work_dir(root).join("cache.json")).expect("cache file missing");
    serde_json::from_slice(&bytes).expect("cache file is not valid JSON")
}

/// Paths of every request the server has seen so far
async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_mirrors_every_item() {
    let server = MockServer::start().await;
    Site::new(2, 3).mount(&server).await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), root.path());
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(report.is_success(), "crawl reported failures: {:?}", report);
    let work = &report.works[0];
    assert_eq!(work.title.as_deref(), Some("Mock Work"));
    assert_eq!(work.tally.units_in(UnitState::Ready), 2);
    assert_eq!(work.tally.items_in(ItemState::Downloaded), 6);

    for u in 1..=2 {
        for i in 1..=3 {
            let file = work_dir(root.path())
                .join(format!("Chapter {}", u))
                .join(format!("{:04}.png", i));
            assert_eq!(std::fs::read(&file).expect("missing file"), image_bytes(u, i));
        }
    }

    let cached = load_cache(root.path());
    assert_eq!(cached.title.as_deref(), Some("Mock Work"));
    assert!(cached.units.iter().all(|u| u.is_complete()));
}

#[tokio::test]
async fn test_second_run_repeats_nothing() {
    let server = MockServer::start().await;
    Site::new(3, 2).mount(&server).await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), root.path());
    Coordinator::new(config.clone())
        .expect("Failed to create coordinator")
        .run()
        .await;
    let first_requests = request_paths(&server).await.len();
    let first_cache = std::fs::read(work_dir(root.path()).join("cache.json")).unwrap();

    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(report.is_success());
    assert_eq!(report.works[0].tally.units_in(UnitState::Skipped), 3);
    let second_requests = &request_paths(&server).await[first_requests..];
    assert_eq!(second_requests, ["/work"]);
    assert_eq!(
        std::fs::read(work_dir(root.path()).join("cache.json")).unwrap(),
        first_cache
    );
}

#[tokio::test]
async fn test_unit_server_error_is_isolated() {
    let server = MockServer::start().await;
    let mut site = Site::new(3, 2);
    site.failing_unit = Some(2);
    site.mount(&server).await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), root.path());
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    let work = &report.works[0];
    assert_eq!(work.outcome, WorkOutcome::Completed);
    assert_eq!(work.tally.units_in(UnitState::FetchFailed), 1);
    assert_eq!(work.tally.items_in(ItemState::Downloaded), 4);
    assert_eq!(work.failures.units.len(), 1);
    assert_eq!(work.failures.units[0].unit, 2);
    assert!(work.failures.units[0].error.contains("HTTP 500"));
    assert!(!report.is_success());

    let cached = load_cache(root.path());
    assert_eq!(cached.units.len(), 3);
    assert!(cached.units[1].items.is_empty());
    assert!(cached.units[0].is_complete());
    assert!(cached.units[2].is_complete());
}

#[tokio::test]
async fn test_unsupported_resource_type_fails_only_that_item() {
    let server = MockServer::start().await;
    let mut site = Site::new(1, 3);
    site.gif_item = Some((1, 2));
    site.mount(&server).await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), root.path());
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    let work = &report.works[0];
    assert_eq!(work.tally.items_in(ItemState::Downloaded), 2);
    assert_eq!(work.tally.items_in(ItemState::DownloadFailed), 1);
    assert_eq!(work.failures.items[0].item, 2);
    assert!(work.failures.items[0].error.contains("gif"));

    let chapter = work_dir(root.path()).join("Chapter 1");
    assert!(chapter.join("0001.png").exists());
    assert!(chapter.join("0003.png").exists());
    assert!(!request_paths(&server).await.iter().any(|p| p.ends_with(".gif")));
}

#[tokio::test]
async fn test_image_server_error_leaves_no_file() {
    let server = MockServer::start().await;
    let mut site = Site::new(1, 3);
    site.failing_image = Some((1, 2));
    site.mount(&server).await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), root.path());
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    let work = &report.works[0];
    assert_eq!(work.outcome, WorkOutcome::Completed);
    assert_eq!(work.tally.items_in(ItemState::Downloaded), 2);
    assert_eq!(work.tally.items_in(ItemState::DownloadFailed), 1);
    assert_eq!(work.failures.items[0].item, 2);
    assert!(work.failures.items[0].error.contains("HTTP 500"));
    assert!(work.failures.items[0].url.ends_with("/img/1-2.png"));

    let chapter = work_dir(root.path()).join("Chapter 1");
    let mut files: Vec<String> = std::fs::read_dir(&chapter)
        .expect("chapter directory missing")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, ["0001.png", "0003.png"]);

    let cached = load_cache(root.path());
    let failed = cached.units[0].item(2).expect("item 2 missing from cache");
    assert!(!failed.downloaded);
    assert!(failed.file_path.is_none());
}

#[tokio::test]
async fn test_missing_work_page_is_reported() {
    let server = MockServer::start().await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), root.path());
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert_eq!(report.works.len(), 1);
    assert!(matches!(report.works[0].outcome, WorkOutcome::FetchFailed(_)));
    assert!(!work_dir(root.path()).exists());
}

#[tokio::test]
async fn test_crawl_from_toml_config() {
    let server = MockServer::start().await;
    Site::new(1, 2).mount(&server).await;
    let root = TempDir::new().expect("Failed to create temp dir");

    let toml = format!(
        r#"
[crawler]
unit-workers = 1
item-workers = 2

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[output]
root = "{root}"

[parsers.mock]
work-title = "h1"
unit-links = "ul.units a"
unit-title = "h2"
item-links = "div.pages a"
item-resource = "img#page"

[[target]]
url = "{base}/work"
parser = "mock"
"#,
        root = root.path().display(),
        base = server.uri()
    );

    let config = parse_config(&toml).expect("config should parse");
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(report.is_success());
    assert!(work_dir(root.path()).join("Chapter 1").join("0002.png").exists());
}
