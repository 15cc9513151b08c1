//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests to fetch page content
//! - Optional retry with exponential backoff for transient failures
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Maximum redirect hops followed for a single fetch
const MAX_REDIRECTS: usize = 10;

/// Upper bound on the connect phase; never longer than the whole request
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the request ran out of time
        timeout: bool,
    },
}

impl FetchResult {
    /// Returns true if another attempt might succeed
    ///
    /// Transport errors, 5xx and 429 are retried. Other statuses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::HttpError { status_code } => {
                *status_code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status_code >= 500
            }
            Self::NetworkError { .. } => true,
        }
    }

    /// Short human-readable reason for a failed fetch
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::NetworkError { error, timeout } => Some(if *timeout {
                format!("Request timeout: {}", error)
            } else {
                error.clone()
            }),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Crawler settings supplying the request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitecrawl::config::{CrawlerConfig, UserAgentConfig};
/// use sitecrawl::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "sitecrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(crawler.request_timeout_secs);
    let connect_timeout = Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once and classifies the outcome
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().to_string();
    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            body,
        },
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: e.to_string(),
            timeout: true,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            timeout: false,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            timeout: false,
        }
    }
}

/// HTTP client plus retry policy, shared by every task of a crawl
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl Fetcher {
    /// Creates a fetcher that makes `retries` extra attempts on retryable
    /// failures, sleeping `backoff * 2^attempt` before each
    pub fn new(client: Client, retries: u32, backoff: Duration) -> Self {
        Self {
            client,
            retries,
            backoff,
        }
    }

    /// Builds the client and retry policy from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, crawler)?;
        Ok(Self::new(
            client,
            crawler.fetch_retries,
            Duration::from_millis(crawler.retry_backoff_ms),
        ))
    }

    /// Fetches `url`, retrying transient failures
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut attempt = 0;
        loop {
            let result = fetch_url(&self.client, url).await;
            if attempt >= self.retries || !result.is_retryable() {
                return result;
            }

            let delay = self.backoff.saturating_mul(1u32 << attempt.min(16));
            tracing::debug!(
                "Retrying {} in {:?} after attempt {} failed: {}",
                url,
                delay,
                attempt + 1,
                result.failure_reason().unwrap_or_default()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
