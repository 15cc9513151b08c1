//! SQLite storage implementation
//!
//! Each store owns one long-lived connection guarded by a mutex. Every call
//! takes the lock for the duration of its statements (or transaction) and
//! releases it before returning, so sibling tasks see serialized writes.

use crate::storage::schema::{initialize_articles_schema, initialize_frontier_schema};
use crate::storage::traits::{ArticleStore, FrontierStore, StorageError, StorageResult};
use crate::storage::{Article, ClaimReport, UrlRecord};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Opens a database file configured for concurrent crawl writes
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
pub fn open_connection(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
        PRAGMA busy_timeout = 5000;
    ",
    )?;

    Ok(conn)
}

fn lock(conn: &Mutex<Connection>) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| StorageError::LockPoisoned)
}

fn count(conn: &Connection, sql: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

/// SQLite-backed URL frontier
pub struct SqliteFrontier {
    conn: Mutex<Connection>,
}

impl SqliteFrontier {
    /// Opens (or creates) the frontier database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        initialize_frontier_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory frontier
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_frontier_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl FrontierStore for SqliteFrontier {
    fn next_batch(&self, limit: usize) -> StorageResult<Vec<String>> {
        let conn = lock(&self.conn)?;
        let mut stmt =
            conn.prepare_cached("SELECT url FROM urls WHERE visited = 0 ORDER BY rowid LIMIT ?1")?;

        let urls = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    fn claim(&self, urls: &[String]) -> StorageResult<ClaimReport> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let mut report = ClaimReport::default();

        {
            let mut stmt = tx.prepare_cached("UPDATE urls SET visited = 1 WHERE url = ?1")?;
            for url in urls {
                match stmt.execute(params![url]) {
                    Ok(0) => {
                        tracing::warn!("Cannot claim unknown URL: {}", url);
                        report.failed.push(url.clone());
                    }
                    Ok(_) => report.claimed.push(url.clone()),
                    Err(e) => {
                        tracing::warn!("Failed to mark URL as visited: {}: {}", url, e);
                        report.failed.push(url.clone());
                    }
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn discover(&self, urls: &[String]) -> StorageResult<usize> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO urls (url, visited, scraped, discovered_at) VALUES (?1, 0, 0, ?2)",
            )?;
            for url in urls {
                match stmt.execute(params![url, now]) {
                    Ok(n) => inserted += n,
                    Err(e) => tracing::warn!("Failed to insert URL: {}: {}", url, e),
                }
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn mark_scraped(&self, url: &str) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute("UPDATE urls SET scraped = 1 WHERE url = ?1", params![url])?;
        Ok(())
    }

    fn get(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let conn = lock(&self.conn)?;
        let record = conn
            .query_row(
                "SELECT url, visited, scraped, discovered_at FROM urls WHERE url = ?1",
                params![url],
                |row| {
                    Ok(UrlRecord {
                        url: row.get(0)?,
                        visited: row.get(1)?,
                        scraped: row.get(2)?,
                        discovered_at: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let conn = lock(&self.conn)?;
        count(&conn, "SELECT COUNT(*) FROM urls")
    }

    fn count_unvisited(&self) -> StorageResult<u64> {
        let conn = lock(&self.conn)?;
        count(&conn, "SELECT COUNT(*) FROM urls WHERE visited = 0")
    }

    fn count_scraped(&self) -> StorageResult<u64> {
        let conn = lock(&self.conn)?;
        count(&conn, "SELECT COUNT(*) FROM urls WHERE scraped = 1")
    }
}

/// SQLite-backed article sink
pub struct SqliteArticles {
    conn: Mutex<Connection>,
}

impl SqliteArticles {
    /// Opens (or creates) the articles database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        initialize_articles_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory article store
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_articles_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ArticleStore for SqliteArticles {
    fn save(&self, article: &Article) -> StorageResult<()> {
        let conn = lock(&self.conn)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO articles (url, title, date_published, content, fetched_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                article.url,
                article.title,
                article.date_published,
                article.content,
                now
            ],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                StorageError::DuplicateArticle(article.url.clone())
            }
            _ => StorageError::Sqlite(e),
        })?;

        Ok(())
    }

    fn get(&self, url: &str) -> StorageResult<Option<Article>> {
        let conn = lock(&self.conn)?;
        let article = conn
            .query_row(
                "SELECT url, title, date_published, content FROM articles WHERE url = ?1",
                params![url],
                Article::from_row,
            )
            .optional()?;

        Ok(article)
    }

    fn count(&self) -> StorageResult<u64> {
        let conn = lock(&self.conn)?;
        count(&conn, "SELECT COUNT(*) FROM articles")
    }

    fn list(&self) -> StorageResult<Vec<Article>> {
        let conn = lock(&self.conn)?;
        let mut stmt =
            conn.prepare("SELECT url, title, date_published, content FROM articles ORDER BY id")?;

        let articles = stmt
            .query_map([], Article::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(articles)
    }
}

impl Article {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Article {
            url: row.get(0)?,
            title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            date_published: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        })
    }
}
