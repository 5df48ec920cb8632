//! Configuration module for Rent-Watch
//!
//! Configuration comes from an optional TOML file overlaid with environment
//! variables (a `.env` file is honored), then validated as a whole.
//!
//! # Example
//!
//! ```no_run
//! use rent_watch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("rent-watch.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.site.base_url, config.crawler.parallelism);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AddressStrategy, CacheConfig, Config, CrawlerConfig, ExtractionConfig, OutputConfig,
    SelectorConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, load_from_env,
};
pub use validation::validate;
pub(crate) use validation::compile_selector;
