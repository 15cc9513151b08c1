//! Crawl summary
//!
//! Totals accumulated across generations and reported when a crawl finishes.

use crate::crawler::BatchReport;
use std::time::Duration;

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Generations that claimed at least one URL
    pub generations: u64,

    /// URLs marked visited by this run
    pub urls_claimed: u64,

    /// URLs returned by `next_batch` that could not be claimed
    pub claim_failures: u64,

    /// Pages fetched and extracted
    pub pages_processed: u64,

    /// Fetches that failed (transport error, timeout, non-2xx)
    pub fetch_failures: u64,

    /// Tasks that panicked or were cancelled
    pub tasks_aborted: u64,

    /// Articles written to the article store
    pub articles_saved: u64,

    /// Articles rejected by the article store
    pub article_failures: u64,

    /// URLs newly added to the frontier
    pub urls_discovered: u64,

    /// Wall-clock time of the crawl
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one generation's results
    pub fn record_batch(&mut self, report: &BatchReport) {
        use crate::crawler::TaskOutcome;

        self.generations += 1;
        self.claim_failures += report.claim_failures as u64;

        for outcome in &report.outcomes {
            self.urls_claimed += 1;
            match outcome {
                TaskOutcome::Processed {
                    article_saved,
                    discovered,
                    ..
                } => {
                    self.pages_processed += 1;
                    self.urls_discovered += *discovered as u64;
                    if *article_saved {
                        self.articles_saved += 1;
                    } else {
                        self.article_failures += 1;
                    }
                }
                TaskOutcome::FetchFailed { .. } => self.fetch_failures += 1,
                TaskOutcome::Aborted { .. } => self.tasks_aborted += 1,
            }
        }
    }

    /// Returns the share of claimed URLs that were processed, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.urls_claimed == 0 {
            return 0.0;
        }
        (self.pages_processed as f64 / self.urls_claimed as f64) * 100.0
    }

    /// Returns the share of claimed URLs that failed, as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.urls_claimed == 0 {
            return 0.0;
        }
        ((self.fetch_failures + self.tasks_aborted) as f64 / self.urls_claimed as f64) * 100.0
    }

    /// Logs the summary at info level
    pub fn log(&self) {
        tracing::info!(
            "Crawl finished in {:?}: {} generations, {} URLs claimed, {} articles saved, {} fetch failures, {} new URLs",
            self.elapsed,
            self.generations,
            self.urls_claimed,
            self.articles_saved,
            self.fetch_failures,
            self.urls_discovered
        );
        tracing::info!(
            "Success rate: {:.1}%, error rate: {:.1}%",
            self.success_rate(),
            self.error_rate()
        );

        if self.article_failures > 0 || self.tasks_aborted > 0 || self.claim_failures > 0 {
            tracing::warn!(
                "{} articles rejected, {} tasks aborted, {} URLs unclaimable",
                self.article_failures,
                self.tasks_aborted,
                self.claim_failures
            );
        }
    }
}
