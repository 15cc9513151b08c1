//! Database schema definitions
//!
//! The frontier and the articles live in separate database files so either can
//! be inspected, copied or reset on its own.

use rusqlite::Connection;

/// SQL schema for the URL frontier
pub const FRONTIER_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    url TEXT PRIMARY KEY,
    visited BOOLEAN NOT NULL DEFAULT 0,
    scraped BOOLEAN NOT NULL DEFAULT 0,
    discovered_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_urls_visited ON urls(visited);
"#;

/// SQL schema for extracted articles
pub const ARTICLES_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT UNIQUE,
    title TEXT,
    date_published TEXT,
    content TEXT,
    fetched_at TEXT
);
"#;

/// Initializes the frontier schema
///
/// Databases created before `discovered_at` existed get the column added.
pub fn initialize_frontier_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(FRONTIER_SCHEMA_SQL)?;
    ensure_column(conn, "urls", "discovered_at", "TEXT")?;
    Ok(())
}

/// Initializes the articles schema
pub fn initialize_articles_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(ARTICLES_SCHEMA_SQL)?;
    ensure_column(conn, "articles", "fetched_at", "TEXT")?;
    Ok(())
}

/// Adds `column` to `table` if it is missing
fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .any(|name| name == column);

    if !exists {
        tracing::info!("Adding column {}.{}", table, column);
        conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column, decl
        ))?;
    }

    Ok(())
}
