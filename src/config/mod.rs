//! Configuration module for sitecrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitecrawl.toml")).unwrap();
//! println!("Crawling {} in batches of {}", config.site.base_url, config.crawler.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractConfig, SiteConfig, StorageConfig, UserAgentConfig,
};

pub use validation::is_within_base;

// Re-export parser functions
pub use parser::{load_config, load_config_with_hash, parse_config};
