use crate::config::types::{
    Config, CrawlerConfig, ExtractConfig, SiteConfig, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on batch size; each batch spawns one task per URL
const MAX_BATCH_SIZE: u32 = 1000;

const MAX_FETCH_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

/// Validates the base URL and seeds
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    for seed in &config.seeds {
        validate_http_url("seed", seed)?;

        if !is_within_base(&config.base_url, seed) {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is outside base-url '{}'",
                seed, config.base_url
            )));
        }
    }

    Ok(())
}

/// Returns true if `url` lies under `base_url`
///
/// The URL must start with the base URL and, unless the base URL already
/// ends in `/`, continue with a path, query or fragment boundary, so that
/// `https://site.com.evil.net` does not match `https://site.com`.
pub fn is_within_base(base_url: &str, url: &str) -> bool {
    let Some(rest) = url.strip_prefix(base_url) else {
        return false;
    };

    base_url.ends_with('/')
        || rest.is_empty()
        || rest.starts_with('/')
        || rest.starts_with('?')
        || rest.starts_with('#')
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.fetch_retries > MAX_FETCH_RETRIES {
        return Err(ConfigError::Validation(format!(
            "fetch_retries must be <= {}, got {}",
            MAX_FETCH_RETRIES, config.fetch_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage paths
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.frontier_path.is_empty() {
        return Err(ConfigError::Validation(
            "frontier_path cannot be empty".to_string(),
        ));
    }

    if config.articles_path.is_empty() {
        return Err(ConfigError::Validation(
            "articles_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every extraction selector parses
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("scope", &config.scope),
        ("title", &config.title),
        ("paragraph", &config.paragraph),
        ("date", &config.date),
    ] {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                field,
                selector: selector.clone(),
            });
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
