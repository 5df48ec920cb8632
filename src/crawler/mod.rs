//! Crawler module for listing discovery
//!
//! This module contains the crawl pipeline, including:
//! - HTTP fetching with the site identity headers
//! - Index-page anchor discovery
//! - Per-domain concurrency limiting and random request delays
//! - The two-stage index → detail fetch pipeline
//! - Pass coordination against the dedup cache

mod coordinator;
mod fetcher;
mod parser;
mod pipeline;
mod scheduler;

pub use coordinator::{Coordinator, PassReport};
pub use fetcher::{build_http_client, fetch_page, FetchError};
pub use parser::extract_anchors;
pub use pipeline::{CrawlTarget, FetchRun, FetchStats, Fetcher};
pub use scheduler::{FetchSlot, Progress, Scheduler};
