//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with optional retry
//! - Article and link extraction
//! - The batch pipeline that claims, fetches and persists

mod extractor;
mod fetcher;
mod pipeline;

pub use extractor::{ContentExtractor, ExtractedPage, SelectorExtractor};
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher};
pub use pipeline::{BatchReport, Pipeline, TaskOutcome};

pub use crate::output::CrawlSummary;

use crate::config::Config;
use crate::storage::{open_stores, seed_frontier, FrontierStore};
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the frontier and article stores
/// 2. Seed the frontier with the base URL and configured seeds
/// 3. Build the HTTP client and extractor
/// 4. Run generations until the frontier is exhausted
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed; nothing unvisited remains
/// * `Err(CrawlError)` - A store could not be opened or became unusable
///
/// # Example
///
/// ```no_run
/// use sitecrawl::config::load_config;
/// use sitecrawl::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sitecrawl.toml"))?;
/// let summary = crawl(&config).await?;
/// println!("{} articles saved", summary.articles_saved);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config) -> Result<CrawlSummary, CrawlError> {
    let (frontier, articles) = open_stores(&config.storage)?;
    seed_frontier(frontier.as_ref(), &config.seed_urls())?;

    tracing::info!(
        "Starting crawl of {} ({} URLs known, {} unvisited)",
        config.site.base_url,
        frontier.count_total()?,
        frontier.count_unvisited()?
    );

    let pipeline = Pipeline::from_config(config, frontier, articles)?;
    pipeline.run().await
}
