//! Rent-Watch main entry point
//!
//! This is the command-line interface for the Rent-Watch listing crawler.

use anyhow::Context;
use clap::Parser;
use rent_watch::audit::{self, Severity};
use rent_watch::cache::open_cache;
use rent_watch::config::{load_config_with_hash, Config};
use rent_watch::crawler::{Coordinator, CrawlTarget};
use rent_watch::output::{load_statistics, print_pass_report, print_statistics};
use rent_watch::publish::build_publisher;
use rent_watch::storage::{open_shared_store, open_store};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Rent-Watch: incremental rental listing discovery
///
/// Rent-Watch walks the index pages of a listing site, fetches every linked
/// detail page, and publishes only the listings it has not seen within the
/// cache horizon.
#[derive(Parser, Debug)]
#[command(name = "rent-watch")]
#[command(version = "1.0.0")]
#[command(about = "Incremental rental listing discovery", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (environment variables override it)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Crawl one numbered index page (0 is the base URL)
    #[arg(long, conflicts_with_all = ["city", "pages"])]
    page: Option<u32>,

    /// Crawl the index page of one city
    #[arg(long, conflicts_with_all = ["page", "pages"])]
    city: Option<String>,

    /// Crawl an inclusive range of index pages, e.g. 1..5
    #[arg(long, value_parser = parse_page_range, conflicts_with_all = ["page", "city"])]
    pages: Option<(u32, u32)>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show cache and store statistics and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    fn target(&self) -> CrawlTarget {
        if let Some(city) = &self.city {
            CrawlTarget::City(city.clone())
        } else if let Some((first, last)) = self.pages {
            CrawlTarget::Pages { first, last }
        } else {
            CrawlTarget::Page(self.page.unwrap_or(0))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("Loading configuration from the environment"),
    }
    let (config, config_hash) = match load_config_with_hash(cli.config.as_deref()) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            audit::entry(Severity::Critical, "can not load configuration", &e.to_string());
            return Err(e.into());
        }
    };

    let target = cli.target();

    if cli.dry_run {
        handle_dry_run(&config, &config_hash, &target)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_watch(&config, &target).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rent_watch=info,warn"),
            1 => EnvFilter::new("rent_watch=debug,info"),
            2 => EnvFilter::new("rent_watch=trace,debug"),
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

/// Parses `A..B` (or a single page `A`) into an inclusive page range
fn parse_page_range(value: &str) -> Result<(u32, u32), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| format!("'{}' is not a page number: {}", s, e))
    };

    let (first, last) = match value.split_once("..") {
        Some((first, last)) => (parse(first)?, parse(last.trim_start_matches('='))?),
        None => {
            let page = parse(value)?;
            (page, page)
        }
    };

    if first > last {
        return Err(format!("page range {}..{} is empty", first, last));
    }
    Ok((first, last))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, config_hash: &str, target: &CrawlTarget) -> anyhow::Result<()> {
    println!("=== Rent-Watch Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  User agent: {}", config.site.user_agent);
    println!(
        "  Session cookie: {}",
        if config.site.cookie.is_some() { "set" } else { "not set" }
    );
    if config.site.allowed_domains.is_empty() {
        println!("  Allowed domains: (any)");
    } else {
        println!("  Allowed domains: {}", config.site.allowed_domains.join(", "));
    }

    println!("\nCrawler:");
    println!("  Parallelism: {}", config.crawler.parallelism);
    println!("  Random delay: up to {}ms", config.crawler.random_delay_ms);
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Address strategy: {:?}", config.extraction.address_strategy);

    println!("\nCache:");
    println!("  URL: {}", config.cache.url);
    println!("  Horizon: {} day(s)", config.cache.horizon_days);
    println!("  TTL policy: {:?}", config.cache.ttl_policy);

    println!("\nOutput:");
    println!("  Store: {}", config.output.store_path);
    println!("  Partitioning: {:?}", config.output.partitioning);
    match &config.output.publish_url {
        Some(url) => println!("  Publish to: {}", url),
        None => println!("  Publish to: local store"),
    }

    let index_urls = target
        .index_urls(&config.site.base_url)
        .context("target does not resolve to index URLs")?;

    println!("\nTarget: {}", target);
    for url in &index_urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid (hash {})", config_hash);
    println!("✓ Would crawl {} index page(s)", index_urls.len());

    Ok(())
}

/// Handles the --stats mode: shows cache and store statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let cache = open_cache(&config.cache).context("opening dedup cache")?;
    let store = open_store(Path::new(&config.output.store_path)).context("opening listing store")?;

    println!("Store: {}\n", config.output.store_path);

    let stats = load_statistics(cache.as_ref(), &store, 10)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main operation: one pass, then publish the new listings
async fn handle_watch(config: &Config, target: &CrawlTarget) -> anyhow::Result<()> {
    let cache = match open_cache(&config.cache) {
        Ok(cache) => cache,
        Err(e) => {
            audit::entry(Severity::Critical, "can not connect to dedup cache", &e.to_string());
            return Err(e.into());
        }
    };
    audit::entry(Severity::Info, "connected to dedup cache", &cache.describe());

    let store = open_shared_store(Path::new(&config.output.store_path))
        .context("opening listing store")?;
    let publisher = build_publisher(config, store.clone())?;

    let mut coordinator = Coordinator::from_config(config, cache)?.with_history(store, config);

    match coordinator.run_and_publish(target, publisher.as_ref()).await {
        Ok(report) => {
            print_pass_report(&report);
            audit::entry(Severity::Info, "disconnected from dedup cache", "");
            Ok(())
        }
        Err(e) => {
            audit::entry(Severity::Critical, "pass failed", &e.to_string());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_range() {
        assert_eq!(parse_page_range("1..5"), Ok((1, 5)));
        assert_eq!(parse_page_range("2..=3"), Ok((2, 3)));
        assert_eq!(parse_page_range("4"), Ok((4, 4)));
        assert!(parse_page_range("5..1").is_err());
        assert!(parse_page_range("a..b").is_err());
    }

    #[test]
    fn test_target_defaults_to_first_page() {
        let cli = Cli::parse_from(["rent-watch"]);
        assert_eq!(cli.target(), CrawlTarget::Page(0));
    }

    #[test]
    fn test_target_from_flags() {
        let cli = Cli::parse_from(["rent-watch", "--city", "utrecht"]);
        assert_eq!(cli.target(), CrawlTarget::City("utrecht".to_string()));

        let cli = Cli::parse_from(["rent-watch", "config.toml", "--pages", "1..3"]);
        assert_eq!(cli.target(), CrawlTarget::Pages { first: 1, last: 3 });
        assert_eq!(cli.config, Some(PathBuf::from("config.toml")));
    }

    #[test]
    fn test_conflicting_targets_rejected() {
        assert!(Cli::try_parse_from(["rent-watch", "--page", "1", "--city", "delft"]).is_err());
    }
}
