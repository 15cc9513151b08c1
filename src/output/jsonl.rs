//! JSON Lines export
//!
//! Writes one JSON object per article per line with the keys `url`, `title`,
//! `date_published` and `content`.

use crate::storage::ArticleStore;
use crate::CrawlError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes every stored article to `writer`, one JSON object per line
///
/// Returns the number of articles written.
pub fn write_articles_jsonl<W: Write>(
    articles: &dyn ArticleStore,
    writer: &mut W,
) -> Result<usize, CrawlError> {
    let all = articles.list()?;

    for article in &all {
        serde_json::to_writer(&mut *writer, article)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(all.len())
}

/// Exports every stored article to a JSON Lines file at `output_path`
///
/// An existing file is overwritten.
pub fn export_articles_jsonl(
    articles: &dyn ArticleStore,
    output_path: &Path,
) -> Result<usize, CrawlError> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    let written = write_articles_jsonl(articles, &mut writer)?;
    tracing::info!("Exported {} articles to {}", written, output_path.display());
    Ok(written)
}
