//! Article and link extraction
//!
//! Extraction is a pluggable policy behind [`ContentExtractor`]. The stock
//! [`SelectorExtractor`] is driven entirely by CSS selectors from the
//! configuration. Missing elements never produce errors, only empty fields.

use crate::config::{is_within_base, ExtractConfig};
use crate::storage::Article;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Everything a crawl task needs from one fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub article: Article,
    /// Same-site outbound links, deduplicated, in document order
    pub links: Vec<String>,
}

/// Turns a fetched document into an article plus outbound links
pub trait ContentExtractor: Send + Sync {
    /// Extracts the article fields from a parsed document
    fn extract_article(&self, url: &str, document: &Html) -> Article;

    /// Returns the outbound links that stay on the crawled site
    fn extract_links(&self, document: &Html) -> Vec<String>;

    /// Parses `html` and runs both extractions
    ///
    /// The parsed document is dropped before returning so callers can hold
    /// the result across `.await` points.
    fn extract(&self, url: &str, html: &str) -> ExtractedPage {
        let document = Html::parse_document(html);
        ExtractedPage {
            article: self.extract_article(url, &document),
            links: self.extract_links(&document),
        }
    }
}

/// Selector-driven extractor for a single site
pub struct SelectorExtractor {
    base_url: String,
    scope: Selector,
    title: Selector,
    paragraph: Selector,
    date: Selector,
    anchor: Selector,
}

impl SelectorExtractor {
    /// Builds an extractor for the site rooted at `base_url`
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorExtractor)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector was rejected
    pub fn new(base_url: &str, config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: base_url.to_string(),
            scope: parse_selector("scope", &config.scope)?,
            title: parse_selector("title", &config.title)?,
            paragraph: parse_selector("paragraph", &config.paragraph)?,
            date: parse_selector("date", &config.date)?,
            anchor: parse_selector("anchor", "a[href]")?,
        })
    }

    /// Returns true if `href` points into the crawled site
    fn is_same_site(&self, href: &str) -> bool {
        is_within_base(&self.base_url, href)
    }
}

fn parse_selector(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(|element| element_text(element).trim().to_string())
        .unwrap_or_default()
}

impl ContentExtractor for SelectorExtractor {
    fn extract_article(&self, url: &str, document: &Html) -> Article {
        let Some(scope) = document.select(&self.scope).next() else {
            tracing::debug!("No article scope found on {}", url);
            return Article {
                url: url.to_string(),
                ..Article::default()
            };
        };

        let mut content = String::new();
        for paragraph in scope.select(&self.paragraph) {
            content.push_str(&element_text(paragraph));
            content.push_str("\n\n");
        }

        Article {
            url: url.to_string(),
            title: first_text(scope, &self.title),
            date_published: first_text(scope, &self.date),
            content,
        }
    }

    fn extract_links(&self, document: &Html) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&self.anchor) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();

            if self.is_same_site(href) && seen.insert(href) {
                links.push(href.to_string());
            }
        }

        links
    }
}
