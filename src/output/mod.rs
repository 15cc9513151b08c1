//! Output module for crawl reporting and exports
//!
//! This module handles:
//! - The summary returned by a finished crawl
//! - Frontier and article statistics
//! - Exporting stored articles as JSON Lines

mod jsonl;
pub mod stats;
mod summary;

pub use jsonl::{export_articles_jsonl, write_articles_jsonl};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use summary::CrawlSummary;
