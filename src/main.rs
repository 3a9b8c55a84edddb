//! Reef-Crawler main entry point
//!
//! This is the command-line interface for the Reef-Crawler catalogue crawler.

use anyhow::Context;
use clap::Parser;
use reef_crawler::config::{load_config_with_hash, CacheBackend, Config};
use reef_crawler::crawler::crawl;
use reef_crawler::storage::{CursorStore, JsonResultStore, SqliteStorage};
use reef_crawler::Cursor;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Reef-Crawler: a resumable catalogue crawler
///
/// Reef-Crawler walks every category listing of a shop site, extracts the
/// care sheet of each product and appends it to a JSON result file. It can
/// be interrupted at any point and picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "reef-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A resumable catalogue crawler", long_about = None)]
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

    /// Discard the saved cursor and start over; cached pages and results are kept
    #[arg(long)]
    fresh: bool,

    /// Validate config and show where the crawl would start without crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show statistics from the result file and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reef_crawler=info,warn"),
            1 => EnvFilter::new("reef_crawler=debug,info"),
            2 => EnvFilter::new("reef_crawler=trace,debug"),
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

/// Opens the cursor store read-only, and only if a crawl has already created it
fn open_existing_state(config: &Config) -> anyhow::Result<Option<SqliteStorage>> {
    let state_path = Path::new(&config.output.state_path);
    if !state_path.exists() {
        return Ok(None);
    }
    let storage = SqliteStorage::open_read_only(state_path)
        .with_context(|| format!("Failed to open state database {}", state_path.display()))?;
    Ok(Some(storage))
}

/// Handles the --dry-run mode: validates config and shows where the crawl would start
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Reef-Crawler Dry Run ===\n");

    println!("Site:");
    println!("  Host: {}", config.site.host);
    println!("  Products per index page: {}", config.site.index_list_limit);

    println!("\nCategories ({}):", config.site.categories.len());
    for (i, category) in config.site.categories.iter().enumerate() {
        println!("  {}. {}", i, category);
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  On product error: {:?}", config.fetch.on_product_error);

    println!("\nOutput:");
    println!("  State: {}", config.output.state_path);
    println!("  Results: {}", config.output.result_path);
    match config.output.cache_backend {
        CacheBackend::Filesystem => println!("  Page cache: {}", config.output.cache_dir),
        CacheBackend::Sqlite => println!("  Page cache: {} (sqlite)", config.output.state_path),
    }

    let saved = match open_existing_state(config)? {
        Some(storage) => storage.load()?,
        None => None,
    };
    let start = match &saved {
        Some(saved) => saved.cursor,
        None => config
            .cursor
            .as_ref()
            .map(Cursor::from_seed)
            .unwrap_or_default(),
    };

    println!("\n✓ Configuration is valid");
    if saved.is_some() {
        println!("✓ Would resume at {}", start);
    } else {
        println!("✓ Would start a new crawl at {}", start);
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the result file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use reef_crawler::output::{load_statistics, print_statistics};

    println!("Results: {}\n", config.output.result_path);

    let results = JsonResultStore::open(Path::new(&config.output.result_path))
        .with_context(|| format!("Failed to read {}", config.output.result_path))?;
    let stats = load_statistics(&results);

    let state = open_existing_state(config)?;
    let cursor = match &state {
        Some(storage) => storage.load()?,
        None => None,
    };

    print_statistics(&stats, cursor.as_ref(), &config.site.categories);

    if let (Some(storage), CacheBackend::Sqlite) = (&state, config.output.cache_backend) {
        println!("Cached pages: {}", storage.count_cached_pages()?);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring saved cursor)");
    } else {
        tracing::info!("Starting crawl (will resume if a saved cursor exists)");
    }

    tracing::info!(
        "Host: {}, categories: {}",
        config.site.host,
        config.site.categories.len()
    );

    match crawl(config, fresh).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl finished: {} recorded, {} already present, {} skipped, {} empty slots",
                summary.recorded,
                summary.already_recorded,
                summary.skipped,
                summary.empty_slots
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
