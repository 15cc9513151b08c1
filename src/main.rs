//! sitecrawl main entry point
//!
//! This is the command-line interface for the sitecrawl article crawler.

use anyhow::Context;
use clap::Parser;
use sitecrawl::config::{load_config_with_hash, Config};
use sitecrawl::crawler::crawl;
use sitecrawl::output::{export_articles_jsonl, load_statistics, print_statistics};
use sitecrawl::storage::{open_stores, seed_frontier};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// sitecrawl: a single-site article crawler
///
/// Crawls one site in batches, following same-site links until no unvisited
/// URL remains, and stores every extracted article in SQLite. Re-running
/// after an interruption picks up where the frontier left off.
#[derive(Parser, Debug)]
#[command(name = "sitecrawl")]
#[command(version)]
#[command(about = "A single-site article crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_json", "init"])]
    dry_run: bool,

    /// Show frontier and article statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_json", "init"])]
    stats: bool,

    /// Write all stored articles to PATH as JSON Lines and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats", "init"])]
    export_json: Option<PathBuf>,

    /// Create the databases and insert seed URLs, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_json"])]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export_json {
        handle_export_json(&config, path)?;
    } else if cli.init {
        handle_init(&config)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitecrawl=info,warn"),
            1 => EnvFilter::new("sitecrawl=debug,info"),
            2 => EnvFilter::new("sitecrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== sitecrawl Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Seeds:");
    for seed in config.seed_urls() {
        println!("    * {}", seed);
    }

    println!("\nCrawler Configuration:");
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Inter-batch delay: {}ms", config.crawler.batch_delay_ms);
    if config.crawler.max_in_flight > 0 {
        println!("  Max in-flight requests: {}", config.crawler.max_in_flight);
    } else {
        println!("  Max in-flight requests: batch size");
    }
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );
    println!(
        "  Fetch retries: {} (backoff {}ms)",
        config.crawler.fetch_retries, config.crawler.retry_backoff_ms
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Frontier: {}", config.storage.frontier_path);
    println!("  Articles: {}", config.storage.articles_path);

    println!("\nExtraction Selectors:");
    println!("  Scope: {}", config.extract.scope);
    println!("  Title: {}", config.extract.title);
    println!("  Paragraph: {}", config.extract.paragraph);
    println!("  Date: {}", config.extract.date);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the databases
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let (frontier, articles) = open_stores(&config.storage)?;
    let stats = load_statistics(frontier.as_ref(), articles.as_ref())?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --export-json mode
fn handle_export_json(config: &Config, path: &Path) -> anyhow::Result<()> {
    let (_, articles) = open_stores(&config.storage)?;
    let written = export_articles_jsonl(articles.as_ref(), path)
        .with_context(|| format!("Failed to export articles to {}", path.display()))?;
    println!("✓ Exported {} articles to {}", written, path.display());
    Ok(())
}

/// Handles the --init mode: creates the schema and seeds the frontier
fn handle_init(config: &Config) -> anyhow::Result<()> {
    let (frontier, _) = open_stores(&config.storage)?;
    let inserted = seed_frontier(frontier.as_ref(), &config.seed_urls())?;
    println!(
        "✓ Databases ready; {} new seed URLs added to {}",
        inserted, config.storage.frontier_path
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    match crawl(config).await {
        Ok(summary) => {
            summary.log();
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
