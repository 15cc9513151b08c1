//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - The URL frontier (discovery, claiming, scraped tracking)
//! - Append-only article persistence
//! - SQLite schema initialization

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{open_connection, SqliteArticles, SqliteFrontier};
pub use traits::{ArticleStore, FrontierStore, StorageError, StorageResult};

use crate::config::StorageConfig;
use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A known URL and its crawl state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    /// Set once the URL has been claimed by a batch; never cleared
    pub visited: bool,
    /// Set once an article for this URL has been persisted
    pub scraped: bool,
    pub discovered_at: Option<String>,
}

/// An extracted article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub date_published: String,
    pub content: String,
}

/// Outcome of claiming a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimReport {
    /// URLs now marked visited; only these may be processed
    pub claimed: Vec<String>,
    /// URLs whose update failed or matched no row
    pub failed: Vec<String>,
}

/// Opens both stores named in the configuration
///
/// Failure to open either one is fatal to the crawl.
///
/// # Returns
///
/// * `Ok((frontier, articles))` - Both stores ready for use
/// * `Err(CrawlError)` - A database could not be opened or initialized
pub fn open_stores(
    config: &StorageConfig,
) -> Result<(Arc<SqliteFrontier>, Arc<SqliteArticles>), CrawlError> {
    let frontier = SqliteFrontier::open(Path::new(&config.frontier_path))?;
    let articles = SqliteArticles::open(Path::new(&config.articles_path))?;
    Ok((Arc::new(frontier), Arc::new(articles)))
}

/// Inserts the seed URLs into the frontier if they are not already known
///
/// Returns the number of seeds that were new.
pub fn seed_frontier(frontier: &dyn FrontierStore, seeds: &[String]) -> Result<usize, CrawlError> {
    let inserted = frontier.discover(seeds)?;
    tracing::info!(
        "Seeded frontier: {} of {} seed URLs were new",
        inserted,
        seeds.len()
    );
    Ok(inserted)
}
