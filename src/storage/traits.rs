//! Storage traits and error types
//!
//! The crawl pipeline only talks to these two traits. Both take `&self` and
//! must be safe to call from many tasks of the same generation at once;
//! implementations serialize conflicting writes internally.

use crate::storage::{Article, ClaimReport, UrlRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Article already stored for {0}")]
    DuplicateArticle(String),

    #[error("None of the {0} URLs in the batch could be claimed")]
    NothingClaimed(usize),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable queue of crawl candidates with claim semantics
pub trait FrontierStore: Send + Sync {
    /// Returns up to `limit` unvisited URLs in discovery order
    ///
    /// Repeated calls without an intervening [`claim`](Self::claim) return
    /// overlapping results. An empty result means nothing is left to crawl.
    fn next_batch(&self, limit: usize) -> StorageResult<Vec<String>>;

    /// Marks every given URL as visited in a single transaction
    ///
    /// A row that fails to update is logged and reported in the returned
    /// [`ClaimReport`] without aborting the rest. An `Err` means the
    /// transaction itself could not be committed and nothing was claimed.
    fn claim(&self, urls: &[String]) -> StorageResult<ClaimReport>;

    /// Inserts each URL unless it is already known, visited or not
    ///
    /// Returns the number of URLs that were new.
    fn discover(&self, urls: &[String]) -> StorageResult<usize>;

    /// Records that an article for `url` was persisted
    fn mark_scraped(&self, url: &str) -> StorageResult<()>;

    /// Looks up a single URL
    fn get(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Counts all known URLs
    fn count_total(&self) -> StorageResult<u64>;

    /// Counts URLs not yet claimed
    fn count_unvisited(&self) -> StorageResult<u64>;

    /// Counts URLs whose article was persisted
    fn count_scraped(&self) -> StorageResult<u64>;
}

/// Append-only sink for extracted articles
pub trait ArticleStore: Send + Sync {
    /// Appends an article
    ///
    /// Storing a second article for the same URL fails with
    /// [`StorageError::DuplicateArticle`].
    fn save(&self, article: &Article) -> StorageResult<()>;

    /// Reads back the article stored for `url`
    fn get(&self, url: &str) -> StorageResult<Option<Article>>;

    /// Counts stored articles
    fn count(&self) -> StorageResult<u64>;

    /// Returns all articles in the order they were stored
    fn list(&self) -> StorageResult<Vec<Article>>;
}
