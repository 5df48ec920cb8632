use crate::cache::TtlPolicy;
use crate::storage::Partitioning;
use serde::{Deserialize, Serialize};

/// Main configuration structure for Rent-Watch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub selectors: SelectorConfig,
    pub extraction: ExtractionConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

/// Target site and request identity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Listing URL that page numbers and city names are appended to
    pub base_url: String,

    /// Hosts the crawler may visit; empty allows every host
    pub allowed_domains: Vec<String>,

    /// Sent verbatim as the User-Agent header
    pub user_agent: String,

    /// Sent verbatim as the Cookie header on index and detail requests
    pub cookie: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of detail workers, and the per-domain in-flight limit
    pub parallelism: u32,

    /// Upper bound of the random pause a worker takes before each request (milliseconds)
    pub random_delay_ms: u64,

    /// Capacity of the queue between the index crawl and the detail workers
    pub queue_capacity: usize,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            random_delay_ms: 0,
            queue_capacity: 64,
            request_timeout_secs: 30,
        }
    }
}

/// CSS selectors for index and detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub index_anchor: String,
    pub detail_root: String,
    pub price: String,
    pub address: String,
    pub area: String,
    pub offer_date: String,
    pub interior: String,
    pub breadcrumb: String,
    pub zip_code: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            index_anchor: "h2.listing-search-item__title > a[href]".to_string(),
            detail_root: "main.page__main".to_string(),
            price: ".listing-features__description--for_rent_price > span".to_string(),
            address: ".listing-detail-summary__location".to_string(),
            area: ".listing-features__description--surface_area > span".to_string(),
            offer_date: ".listing-features__description--offered_since > span".to_string(),
            interior: ".listing-features__description--interior > span".to_string(),
            breadcrumb: "ul.breadcrumbs > li".to_string(),
            zip_code: ".listing-detail-summary__location".to_string(),
        }
    }
}

/// Which address layout the detail pages use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressStrategy {
    /// One label such as `1012 AB Amsterdam (Centrum)`
    #[default]
    Composite,

    /// Breadcrumb trail plus a separate zip-code label
    Breadcrumb,
}

/// Extraction behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    pub address_strategy: AddressStrategy,
}

/// Dedup cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// `memory://`, `sqlite://<path>` or a bare SQLite path
    pub url: String,

    /// Days until the whole id set expires
    pub horizon_days: u32,

    pub ttl_policy: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://rent_watch_cache.db".to_string(),
            horizon_days: 5,
            ttl_policy: TtlPolicy::SetOnce,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite listing store
    pub store_path: String,

    pub partitioning: Partitioning,

    /// When set, new listings are POSTed here instead of stored locally
    pub publish_url: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_path: "rent_watch.db".to_string(),
            partitioning: Partitioning::ByCity,
            publish_url: None,
        }
    }
}
