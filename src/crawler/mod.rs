//! Crawler module for walking the catalogue
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] seam
//! - The checkpointed crawl engine

mod engine;
mod fetcher;

pub use engine::{Engine, RunSummary, StepOutcome};
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher, HttpFetcher};

use crate::config::Config;
use crate::extract::CatalogExtractor;
use crate::storage::open_stores;
use crate::CrawlError;

/// Runs a crawl to completion against the live site
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the cursor store, page cache and result store
/// 2. Resume the saved cursor, or start from the configured seed
/// 3. Build the HTTP client
/// 4. Step through every product slot until the cursor is terminal
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Discard the saved cursor first
///
/// # Returns
///
/// * `Ok(RunSummary)` - Crawl completed
/// * `Err(CrawlError)` - Crawl stopped; a rerun resumes at the failing step
pub async fn crawl(config: &Config, fresh: bool) -> Result<RunSummary, CrawlError> {
    let stores = open_stores(&config.output)?;
    let client = build_http_client(&config.user_agent, &config.fetch)?;

    let mut engine = Engine::new(
        config,
        HttpFetcher::new(client),
        CatalogExtractor::new(),
        stores,
        fresh,
    )?;

    let summary = engine.run().await?;
    tracing::info!(
        "{} products in {}",
        engine.results().len(),
        config.output.result_path
    );
    Ok(summary)
}
