//! Knowledge Crawler main entry point
//!
//! This is the command-line interface for the knowledge-base crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use knowledge_crawler::config::{load_config_with_hash, Config};
use knowledge_crawler::crawler::{Coordinator, CrawlRequest};
use knowledge_crawler::output::{
    format_crawl_report, format_page_list, format_scrape_report, load_statistics,
    print_statistics,
};
use knowledge_crawler::storage::{PageSink, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Knowledge Crawler: a bounded site crawler for knowledge-base ingestion
///
/// Crawls a single site breadth-first, extracts clean text from each page and
/// upserts the records into a local SQLite knowledge base.
#[derive(Parser, Debug)]
#[command(name = "knowledge-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A bounded site crawler for knowledge-base ingestion", long_about = None)]
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

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site starting from SEED and store every extracted page
    Crawl {
        /// Seed URL or bare domain
        seed: String,

        /// Page budget (defaults to the configured max-pages)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and store a single page without following links
    Scrape {
        url: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored pages, newest first
    List {
        /// Only pages whose title, description or content contain QUERY
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,
    },

    /// Remove one stored page
    Delete { url: String },

    /// Remove all stored pages
    Clear,

    /// Show knowledge-base statistics and recent runs
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    let storage = Arc::new(
        SqliteStorage::new(Path::new(&config.output.database_path)).with_context(|| {
            format!("Failed to open database {}", config.output.database_path)
        })?,
    );

    match cli.command {
        Command::Crawl {
            seed,
            max_pages,
            json,
        } => handle_crawl(&config, &config_hash, storage, seed, max_pages, json).await,
        Command::Scrape { url, json } => handle_scrape(&config, storage, &url, json).await,
        Command::List { search } => handle_list(storage.as_ref(), search.as_deref()),
        Command::Delete { url } => handle_delete(storage.as_ref(), &url),
        Command::Clear => handle_clear(storage.as_ref()),
        Command::Stats => handle_stats(&config, storage.as_ref()),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("knowledge_crawler=info,warn"),
            1 => EnvFilter::new("knowledge_crawler=debug,info"),
            2 => EnvFilter::new("knowledge_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `crawl`: records a run around one domain crawl
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    storage: Arc<SqliteStorage>,
    seed: String,
    max_pages: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let max_pages = max_pages.unwrap_or(config.crawler.max_pages);
    let sink: Arc<dyn PageSink> = storage.clone();
    let coordinator = Coordinator::new(config, sink)?;

    // Ctrl-C stops the loop after the page in flight; pages already stored stay stored
    let cancel = coordinator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let run_id = storage.create_run(&seed, config_hash)?;
    tracing::info!("Starting crawl run {}", run_id);

    let result = coordinator
        .crawl(CrawlRequest::new(seed.clone(), max_pages))
        .await;
    storage.finish_run(run_id, &result.run_outcome())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_crawl_report(&result));
    }

    if !result.success {
        bail!(
            "Crawl of {} failed: {}",
            seed,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Handles `scrape`: one page, no link following
async fn handle_scrape(
    config: &Config,
    storage: Arc<SqliteStorage>,
    url: &str,
    json: bool,
) -> anyhow::Result<()> {
    let sink: Arc<dyn PageSink> = storage;
    let coordinator = Coordinator::new(config, sink)?;
    let result = coordinator.scrape(url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_scrape_report(&result));
    }

    if !result.success {
        bail!(
            "Scrape of {} failed: {}",
            url,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Handles `list`: all pages, or a substring search
fn handle_list(storage: &dyn Storage, search: Option<&str>) -> anyhow::Result<()> {
    let pages = match search {
        Some(query) => storage.search_pages(query)?,
        None => storage.list_pages()?,
    };
    print!("{}", format_page_list(&pages));
    Ok(())
}

fn handle_delete(storage: &dyn Storage, url: &str) -> anyhow::Result<()> {
    if storage.delete_page(url)? {
        println!("Deleted {}", url);
    } else {
        println!("No stored page for {}", url);
    }
    Ok(())
}

fn handle_clear(storage: &dyn Storage) -> anyhow::Result<()> {
    let removed = storage.clear_pages()?;
    println!("Removed {} page(s)", removed);
    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config, storage: &dyn Storage) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let stats = load_statistics(storage)?;
    print_statistics(&stats);

    Ok(())
}
