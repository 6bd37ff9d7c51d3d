//! Sumi-Scroll main entry point
//!
//! This is the command-line interface for the Sumi-Scroll site aggregator.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_scroll::config::{load_config_with_hash, validate, Config};
use sumi_scroll::output::print_statistics;
use sumi_scroll::storage::{open_store, ItemStore};
use sumi_scroll::{run_job, AppContext};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Scroll: maps a website and condenses it for language models
///
/// Sumi-Scroll discovers a site's pages in two crawl passes, fetches their
/// rendered content through a browser-automation service, classifies every
/// page and writes an `llms.txt` style index and a full markdown document.
#[derive(Parser, Debug)]
#[command(name = "sumi-scroll")]
#[command(version = "1.0.0")]
#[command(about = "A site mapper and content aggregator", long_about = None)]
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

    /// Validate config and show what would be mapped without running a job
    #[arg(long, conflicts_with = "list_items")]
    dry_run: bool,

    /// List persisted items from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    list_items: bool,

    /// Override the root URL from the configuration
    #[arg(long, value_name = "URL")]
    root_url: Option<String>,

    /// Skip the editorial rewrite of the summary index
    #[arg(long)]
    no_rewrite: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(root_url) = cli.root_url {
        tracing::info!("Overriding root URL: {}", root_url);
        config.job.root_url = root_url;
        // The override has to pass the same checks as the file
        validate(&config)?;
    }
    if cli.no_rewrite {
        config.generation.rewrite_summary = false;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.list_items {
        handle_list_items(&config)?;
    } else {
        handle_job(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_scroll=info,warn"),
            1 => EnvFilter::new("sumi_scroll=debug,info"),
            2 => EnvFilter::new("sumi_scroll=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Scroll Dry Run ===\n");

    println!("Job:");
    println!("  Root URL: {}", config.job.root_url);
    if let Some(name) = &config.job.item_name {
        println!("  Item name: {}", name);
    }
    println!("  Excluded paths ({}):", config.job.exclude_paths.len());
    for path in &config.job.exclude_paths {
        println!("    - {}", path);
    }

    println!("\nCrawler:");
    println!(
        "  Pages per batch: {} (every {}ms)",
        config.crawler.max_concurrent_pages_open, config.crawler.batch_interval
    );
    println!(
        "  Frontier caps: {} primary, {} secondary",
        config.crawler.max_primary_pages, config.crawler.max_secondary_pages
    );
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout);
    println!(
        "  Retries: {} attempts, delays {:?}ms",
        config.crawler.retry_attempts, config.crawler.retry_delays
    );

    println!("\nServices:");
    println!("  Mapping: {}", config.mapping.endpoint);
    println!("  Browser: {}", config.browser.webdriver_url);
    println!(
        "  Generation: {} ({})",
        config.generation.endpoint, config.generation.model
    );
    println!(
        "  Summary rewrite: {}",
        if config.generation.rewrite_summary {
            "on"
        } else {
            "off"
        }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }
    if let Some(path) = &config.output.full_path {
        println!("  Full: {}", path);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --list-items mode: lists persisted items
fn handle_list_items(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))
        .context("failed to open the item database")?;
    let items = store.list_items()?;

    if items.is_empty() {
        println!("No items yet.");
    }
    for item in items {
        println!("  #{} {} ({})", item.id, item.name, item.created_at);
    }

    Ok(())
}

/// Handles the main job: runs the pipeline until done or Ctrl-C
async fn handle_job(config: Config, config_hash: String) -> anyhow::Result<()> {
    let database_path = config.output.database_path.clone();
    let ctx = AppContext::from_config(config, config_hash)
        .context("failed to set up service clients")?;
    let mut store = open_store(Path::new(&database_path))
        .context("failed to open the item database")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling job");
            ctrl_c.cancel();
        }
    });

    tracing::info!("Mapping {} as \"{}\"", ctx.root(), ctx.item_name());

    match run_job(&ctx, &mut store, &cancel).await {
        Ok(report) => {
            tracing::info!("Job completed successfully");
            print_statistics(&report.stats);
            println!("\n✓ Saved item #{} ({})", report.item.id, report.item.name);
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            tracing::warn!("Job cancelled during {}", e.stage);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Job failed: {}", e);
            Err(e.into())
        }
    }
}
