//! Sumi-Scroll main entry point
//!
//! This is the command-line interface for the Sumi-Scroll work mirror.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sumi_scroll::config::{load_config_with_hash, Config};
use sumi_scroll::crawler::Coordinator;
use sumi_scroll::output::print_report;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Sumi-Scroll: a resumable mirror for serialized works
///
/// Sumi-Scroll crawls each configured work, its units and their items, and
/// mirrors every resource to disk. Progress is cached per work, so an
/// interrupted run resumes without downloading anything twice.
#[derive(Parser, Debug)]
#[command(name = "sumi-scroll")]
#[command(version = "1.0.0")]
#[command(about = "A resumable mirror for serialized works", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore existing caches and crawl every work from scratch
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = setup_logging(cli.verbose, cli.quiet, cli.log_dir.as_deref())?;

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_scroll=info,warn"),
            1 => EnvFilter::new("sumi_scroll=debug,info"),
            2 => EnvFilter::new("sumi_scroll=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    fn console_layer<S>() -> fmt::Layer<S> {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
    }

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer())
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "sumi-scroll.log"));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(EnvFilter::new("sumi_scroll=debug,info"));

    tracing_subscriber::registry()
        .with(console_layer().with_filter(filter))
        .with(file_layer)
        .init();
    Ok(Some(guard))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Scroll Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Unit workers: {}", config.crawler.unit_workers);
    println!("  Item workers: {}", config.crawler.item_workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Merge policy: {:?}", config.crawler.merge_policy);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);

    println!("\nParsers ({}):", config.parsers.len());
    for (name, selectors) in &config.parsers {
        println!("  - {}", name);
        println!("    * work title: {}", selectors.work_title);
        println!("    * unit links: {}", selectors.unit_links);
        println!("    * item links: {}", selectors.item_links);
        match (&selectors.item_resource, selectors.items_are_resources) {
            (_, true) => println!("    * item links are resources"),
            (Some(resource), false) => println!("    * item resource: {}", resource),
            (None, false) => {}
        }
    }

    println!("\nTargets ({}):", config.targets.len());
    for target in &config.targets {
        println!("  - {} (parser: {})", target.url, target.parser);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would mirror {} works", config.targets.len());
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<ExitCode> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring caches)");
    } else {
        tracing::info!("Starting crawl (resuming from caches where present)");
    }

    let coordinator = Coordinator::new(config)
        .context("failed to set up crawler")?
        .ignore_cache(fresh);

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing downloads in progress");
            token.cancel();
        }
    });

    let report = coordinator.run().await;
    print_report(&report);

    if report.is_success() {
        tracing::info!("Crawl completed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("Crawl finished with failures or was interrupted");
        Ok(ExitCode::FAILURE)
    }
}
