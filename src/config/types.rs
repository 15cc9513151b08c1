use serde::Deserialize;

/// Main configuration structure for sitecrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl Config {
    /// Returns every URL that should be present in the frontier before crawling
    ///
    /// The base URL always comes first, followed by any configured seeds.
    pub fn seed_urls(&self) -> Vec<String> {
        let mut seeds = vec![self.site.base_url.clone()];
        for seed in &self.site.seeds {
            if !seeds.contains(seed) {
                seeds.push(seed.clone());
            }
        }
        seeds
    }
}

/// The site being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL; outbound links are followed only when they start with it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Additional seed URLs inserted alongside the base URL
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of URLs claimed and processed per generation
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Pause between generations (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Cap on concurrent HTTP requests; 0 means the batch size is the only bound
    #[serde(rename = "max-in-flight", default)]
    pub max_in_flight: u32,

    /// Total time allowed for a single fetch (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra fetch attempts after a retryable failure
    #[serde(rename = "fetch-retries", default)]
    pub fetch_retries: u32,

    /// Base backoff between fetch attempts, doubled per attempt (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_in_flight: 0,
            request_timeout_secs: default_request_timeout_secs(),
            fetch_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_batch_size() -> u32 {
    100
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the URL frontier
    #[serde(rename = "frontier-path")]
    pub frontier_path: String,

    /// Path to the SQLite database holding extracted articles
    #[serde(rename = "articles-path")]
    pub articles_path: String,
}

/// CSS selectors used to pull an article out of a page
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_paragraph")]
    pub paragraph: String,

    #[serde(default = "default_date")]
    pub date: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            title: default_title(),
            paragraph: default_paragraph(),
            date: default_date(),
        }
    }
}

fn default_scope() -> String {
    "div.fullstory, section.fullstory".to_string()
}

fn default_title() -> String {
    "h1".to_string()
}

fn default_paragraph() -> String {
    "p".to_string()
}

fn default_date() -> String {
    "div.pub-t".to_string()
}
