//! Statistics generation from the crawl databases
//!
//! This module provides functionality for extracting and displaying
//! frontier and article counts from the storage layer.

use crate::storage::{ArticleStore, FrontierStore};
use crate::CrawlError;

/// Crawl statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// URLs known to the frontier
    pub total_urls: u64,

    /// URLs already claimed
    pub visited_urls: u64,

    /// URLs waiting to be claimed
    pub unvisited_urls: u64,

    /// URLs whose article was persisted
    pub scraped_urls: u64,

    /// Rows in the article store
    pub articles: u64,
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(
    frontier: &dyn FrontierStore,
    articles: &dyn ArticleStore,
) -> Result<CrawlStatistics, CrawlError> {
    let total_urls = frontier.count_total()?;
    let unvisited_urls = frontier.count_unvisited()?;

    Ok(CrawlStatistics {
        total_urls,
        visited_urls: total_urls.saturating_sub(unvisited_urls),
        unvisited_urls,
        scraped_urls: frontier.count_scraped()?,
        articles: articles.count()?,
    })
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Frontier:");
    println!("  Known URLs: {}", stats.total_urls);
    println!(
        "  Visited: {} ({:.1}%)",
        stats.visited_urls,
        percentage(stats.visited_urls, stats.total_urls)
    );
    println!("  Unvisited: {}", stats.unvisited_urls);
    println!(
        "  Scraped: {} ({:.1}% of visited)",
        stats.scraped_urls,
        percentage(stats.scraped_urls, stats.visited_urls)
    );
    println!();

    println!("Articles stored: {}", stats.articles);

    if stats.unvisited_urls == 0 && stats.total_urls > 0 {
        println!("\nFrontier exhausted; a new run will exit immediately.");
    }
}
