//! Batch crawl pipeline
//!
//! Each generation pulls a bounded batch from the frontier, claims the whole
//! batch, then processes every claimed URL in its own task and waits for all
//! of them before pausing and starting the next generation:
//!
//! ```text
//! next_batch -> claim -> spawn N tasks -> join all -> sleep -> repeat
//! ```
//!
//! Claiming before dispatch means a URL is processed at most once per
//! frontier, even when its fetch fails. Failed URLs are not retried by later
//! generations. A URL whose claim fails stays unvisited in the store but is
//! skipped for the rest of the run; a generation that claims nothing at all
//! aborts the crawl.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::{ContentExtractor, SelectorExtractor};
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::output::CrawlSummary;
use crate::storage::{ArticleStore, FrontierStore, StorageError};
use crate::CrawlError;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// What happened to a single claimed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The page was fetched and extracted
    Processed {
        url: String,
        /// False when the article store rejected the article
        article_saved: bool,
        links_found: usize,
        /// Links that were new to the frontier
        discovered: usize,
    },

    /// The fetch failed; nothing was persisted for this URL
    FetchFailed { url: String, reason: String },

    /// The task panicked or was cancelled
    Aborted { url: String, reason: String },
}

/// Results of one generation
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub generation: u64,
    /// URLs returned by `next_batch`
    pub batch_size: usize,
    /// URLs the claim could not mark visited; these were not processed
    pub claim_failures: usize,
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Processed { .. }))
            .count()
    }

    pub fn articles_saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    TaskOutcome::Processed {
                        article_saved: true,
                        ..
                    }
                )
            })
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.processed()
    }

    pub fn discovered(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                TaskOutcome::Processed { discovered, .. } => *discovered,
                _ => 0,
            })
            .sum()
    }
}

/// Shared handles cloned into every task
#[derive(Clone)]
struct Worker {
    frontier: Arc<dyn FrontierStore>,
    articles: Arc<dyn ArticleStore>,
    extractor: Arc<dyn ContentExtractor>,
    fetcher: Fetcher,
    limiter: Option<Arc<Semaphore>>,
}

impl Worker {
    /// Fetch, extract, persist and enqueue links for one claimed URL
    async fn process(self, url: String) -> TaskOutcome {
        let body = {
            let _permit = match &self.limiter {
                Some(limiter) => limiter.clone().acquire_owned().await.ok(),
                None => None,
            };

            match self.fetcher.fetch(&url).await {
                FetchResult::Success { final_url, body } => {
                    if final_url != url {
                        tracing::debug!("{} redirected to {}", url, final_url);
                    }
                    body
                }
                failure => {
                    let reason = failure.failure_reason().unwrap_or_default();
                    tracing::warn!("Error while requesting {}: {}", url, reason);
                    return TaskOutcome::FetchFailed { url, reason };
                }
            }
        };

        let page = self.extractor.extract(&url, &body);

        let article_saved = match self.articles.save(&page.article) {
            Ok(()) => {
                if let Err(e) = self.frontier.mark_scraped(&url) {
                    tracing::warn!("Failed to mark {} as scraped: {}", url, e);
                }
                true
            }
            Err(e) => {
                tracing::warn!("Failed to insert article for URL: {}: {}", url, e);
                false
            }
        };

        let discovered = match self.frontier.discover(&page.links) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Failed to record links found on {}: {}", url, e);
                0
            }
        };

        tracing::debug!(
            "Processed {}: {} links, {} new",
            url,
            page.links.len(),
            discovered
        );

        TaskOutcome::Processed {
            url,
            article_saved,
            links_found: page.links.len(),
            discovered,
        }
    }
}

/// Drives a crawl to completion
pub struct Pipeline {
    worker: Worker,
    batch_size: usize,
    batch_delay: Duration,
    /// URLs whose claim failed during this run
    unclaimable: Mutex<HashSet<String>>,
}

impl Pipeline {
    /// Creates a pipeline over already-opened stores
    ///
    /// # Arguments
    ///
    /// * `frontier` - The URL frontier
    /// * `articles` - Where extracted articles go
    /// * `extractor` - Site extraction policy
    /// * `fetcher` - HTTP client and retry policy
    /// * `settings` - Batch size, inter-batch delay and in-flight cap
    pub fn new(
        frontier: Arc<dyn FrontierStore>,
        articles: Arc<dyn ArticleStore>,
        extractor: Arc<dyn ContentExtractor>,
        fetcher: Fetcher,
        settings: &CrawlerConfig,
    ) -> Self {
        let limiter = (settings.max_in_flight > 0)
            .then(|| Arc::new(Semaphore::new(settings.max_in_flight as usize)));

        Self {
            worker: Worker {
                frontier,
                articles,
                extractor,
                fetcher,
                limiter,
            },
            batch_size: settings.batch_size as usize,
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            unclaimable: Mutex::new(HashSet::new()),
        }
    }

    /// Builds the HTTP client and extractor from configuration
    pub fn from_config(
        config: &Config,
        frontier: Arc<dyn FrontierStore>,
        articles: Arc<dyn ArticleStore>,
    ) -> Result<Self, CrawlError> {
        let extractor = SelectorExtractor::new(&config.site.base_url, &config.extract)?;
        let fetcher = Fetcher::from_config(&config.user_agent, &config.crawler)?;

        Ok(Self::new(
            frontier,
            articles,
            Arc::new(extractor),
            fetcher,
            &config.crawler,
        ))
    }

    /// Runs generations until the frontier has no unvisited URLs
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The frontier was exhausted
    /// * `Err(CrawlError)` - A store became unusable; the crawl stopped
    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        let start_time = Instant::now();
        let mut summary = CrawlSummary::new();

        loop {
            let generation = summary.generations + 1;
            let Some(report) = self.run_generation(generation).await? else {
                tracing::info!("No more URLs to process");
                break;
            };

            summary.record_batch(&report);
            tracing::info!(
                "Generation {}: {} processed, {} failed, {} new URLs ({} articles so far, {:.2} pages/sec)",
                generation,
                report.processed(),
                report.failures(),
                report.discovered(),
                summary.articles_saved,
                summary.urls_claimed as f64 / start_time.elapsed().as_secs_f64().max(0.001)
            );

            if !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        summary.elapsed = start_time.elapsed();
        Ok(summary)
    }

    fn unclaimable_urls(&self) -> MutexGuard<'_, HashSet<String>> {
        self.unclaimable.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the next batch, leaving out URLs that already failed to claim
    fn next_claimable_batch(&self) -> Result<Vec<String>, CrawlError> {
        let unclaimable = self.unclaimable_urls();
        let mut batch = self
            .worker
            .frontier
            .next_batch(self.batch_size + unclaimable.len())?;

        batch.retain(|url| !unclaimable.contains(url));
        batch.truncate(self.batch_size);
        Ok(batch)
    }

    /// Runs a single generation
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No claimable URL was left; nothing was claimed
    /// * `Ok(Some(BatchReport))` - A batch was claimed and fully processed
    /// * `Err(CrawlError)` - The batch could not be read, or no URL in it
    ///   could be claimed
    pub async fn run_generation(&self, generation: u64) -> Result<Option<BatchReport>, CrawlError> {
        let batch = self.next_claimable_batch()?;
        if batch.is_empty() {
            return Ok(None);
        }

        let claim = self
            .worker
            .frontier
            .claim(&batch)
            .map_err(|source| CrawlError::Claim {
                count: batch.len(),
                source,
            })?;

        if !claim.failed.is_empty() {
            tracing::warn!(
                "Generation {}: {} of {} URLs could not be claimed and were skipped",
                generation,
                claim.failed.len(),
                batch.len()
            );
            self.unclaimable_urls().extend(claim.failed.iter().cloned());
        }

        if claim.claimed.is_empty() {
            return Err(CrawlError::Claim {
                count: batch.len(),
                source: StorageError::NothingClaimed(batch.len()),
            });
        }

        tracing::debug!(
            "Generation {}: dispatching {} URLs",
            generation,
            claim.claimed.len()
        );

        let handles: Vec<_> = claim
            .claimed
            .iter()
            .map(|url| tokio::spawn(self.worker.clone().process(url.clone())))
            .collect();

        let results = join_all(handles).await;

        let outcomes = claim
            .claimed
            .into_iter()
            .zip(results)
            .map(|(url, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Task for {} did not complete: {}", url, e);
                    TaskOutcome::Aborted {
                        url,
                        reason: e.to_string(),
                    }
                }
            })
            .collect();

        Ok(Some(BatchReport {
            generation,
            batch_size: batch.len(),
            claim_failures: claim.failed.len(),
            outcomes,
        }))
    }
}
