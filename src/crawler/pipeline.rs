//! Two-stage fetch pipeline
//!
//! The index stage fetches the index pages of a [`CrawlTarget`], discovers
//! detail links and pushes them onto a bounded work queue. A fixed pool of
//! workers drains the queue and sends every fetched detail page onto a
//! results channel. The results channel closes once the index stage is done
//! and every worker has exited, which is the end-of-pass barrier.
//!
//! Failed fetches are logged and dropped; they never end the pass.

use crate::audit::{self, Severity};
use crate::config::{compile_selector, Config};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError};
use crate::crawler::parser::extract_anchors;
use crate::crawler::scheduler::Scheduler;
use crate::listing::DetailPage;
use crate::url::{dedup_key, extract_domain, is_allowed_host, named_url, page_url};
use crate::{UrlResult, WatchError};
use reqwest::Client;
use scraper::Selector;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use url::Url;

/// What one pass crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlTarget {
    /// One numbered index page; page 0 is the base URL itself
    Page(u32),

    /// A named region appended to the base URL
    City(String),

    /// An inclusive range of numbered index pages
    Pages { first: u32, last: u32 },
}

impl CrawlTarget {
    /// Resolves the index URLs of this target against the base URL
    pub fn index_urls(&self, base_url: &str) -> UrlResult<Vec<Url>> {
        match self {
            Self::Page(page) => Ok(vec![page_url(base_url, *page)?]),
            Self::City(name) => Ok(vec![named_url(base_url, name)?]),
            Self::Pages { first, last } => (*first..=*last)
                .map(|page| page_url(base_url, page))
                .collect(),
        }
    }

    /// City name carried onto extracted listings
    pub fn city(&self) -> Option<&str> {
        match self {
            Self::City(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(page) => write!(f, "page {}", page),
            Self::City(name) => write!(f, "city {}", name),
            Self::Pages { first, last } => write!(f, "pages {}..{}", first, last),
        }
    }
}

/// Counters for one fetch pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub index_pages: usize,
    pub anchors: usize,
    pub scheduled: usize,
    pub fetched: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Settings copied into the spawned tasks
#[derive(Debug, Clone)]
struct PipelineSettings {
    base_url: String,
    allowed_domains: Vec<String>,
    workers: usize,
    queue_capacity: usize,
}

/// Fetches the detail pages linked from a target's index pages
pub struct Fetcher {
    client: Client,
    anchor_selector: Selector,
    settings: PipelineSettings,
    scheduler: Arc<Scheduler>,
}

/// A running fetch pass
///
/// Pages arrive on [`FetchRun::next_page`] in completion order. Once it
/// returns None every scheduled fetch has finished.
pub struct FetchRun {
    pages: mpsc::UnboundedReceiver<DetailPage>,
    handle: JoinHandle<FetchStats>,
}

impl FetchRun {
    pub async fn next_page(&mut self) -> Option<DetailPage> {
        self.pages.recv().await
    }

    /// Waits for the pass to end and returns its counters
    pub async fn finish(mut self) -> FetchStats {
        while self.pages.recv().await.is_some() {}

        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                audit::entry(Severity::Critical, "fetch pipeline task failed", &e.to_string());
                FetchStats::default()
            }
        }
    }
}

impl Fetcher {
    /// Creates a fetcher from the site, crawler and selector configuration
    pub fn new(config: &Config) -> Result<Self, WatchError> {
        let client = build_http_client(&config.site, &config.crawler).map_err(|e| match e {
            FetchError::Client(source) => WatchError::Reqwest(source),
            other => WatchError::Config(crate::ConfigError::Validation(other.to_string())),
        })?;
        Self::with_client(client, config)
    }

    /// Creates a fetcher around an existing HTTP client
    pub fn with_client(client: Client, config: &Config) -> Result<Self, WatchError> {
        let workers = config.crawler.parallelism.max(1) as usize;

        Ok(Self {
            client,
            anchor_selector: compile_selector(&config.selectors.index_anchor)?,
            settings: PipelineSettings {
                base_url: config.site.base_url.clone(),
                allowed_domains: config.site.allowed_domains.clone(),
                workers,
                queue_capacity: config.crawler.queue_capacity.max(1),
            },
            scheduler: Arc::new(Scheduler::new(
                workers,
                Duration::from_millis(config.crawler.random_delay_ms),
            )),
        })
    }

    /// The scheduler shared by all passes of this fetcher
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Starts a pass and returns immediately
    ///
    /// Fails only if the target does not resolve to valid index URLs.
    pub fn spawn(&self, target: &CrawlTarget) -> Result<FetchRun, WatchError> {
        let index_urls = target.index_urls(&self.settings.base_url)?;

        let (work_tx, work_rx) = mpsc::channel::<Url>(self.settings.queue_capacity);
        let (page_tx, page_rx) = mpsc::unbounded_channel::<DetailPage>();
        let work_rx = Arc::new(Mutex::new(work_rx));

        let producer = tokio::spawn(run_index_stage(
            self.client.clone(),
            self.anchor_selector.clone(),
            self.settings.clone(),
            Arc::clone(&self.scheduler),
            index_urls,
            work_tx,
        ));

        let workers: Vec<JoinHandle<(usize, usize)>> = (0..self.settings.workers)
            .map(|worker_id| {
                tokio::spawn(run_detail_worker(
                    worker_id,
                    self.client.clone(),
                    Arc::clone(&self.scheduler),
                    Arc::clone(&work_rx),
                    page_tx.clone(),
                ))
            })
            .collect();
        drop(page_tx);

        let scheduler = Arc::clone(&self.scheduler);
        let handle = tokio::spawn(async move {
            let mut stats = match producer.await {
                Ok(stats) => stats,
                Err(e) => {
                    audit::entry(Severity::Critical, "index stage failed", &e.to_string());
                    FetchStats::default()
                }
            };

            for worker in workers {
                match worker.await {
                    Ok((fetched, failed)) => {
                        stats.fetched += fetched;
                        stats.failed += failed;
                    }
                    Err(e) => {
                        audit::entry(Severity::Critical, "detail worker failed", &e.to_string())
                    }
                }
            }

            let progress = scheduler.progress();
            if !progress.is_drained() {
                tracing::warn!(
                    "Pass ended with {} outstanding fetch(es)",
                    progress.outstanding()
                );
            }

            stats
        });

        Ok(FetchRun {
            pages: page_rx,
            handle,
        })
    }

    /// Runs a pass to completion and collects every fetched detail page
    pub async fn fetch_all(&self, target: &CrawlTarget) -> Result<Vec<DetailPage>, WatchError> {
        let mut run = self.spawn(target)?;
        let mut pages = Vec::new();

        while let Some(page) = run.next_page().await {
            pages.push(page);
        }

        let stats = run.finish().await;
        tracing::debug!("Fetch pass stats: {:?}", stats);

        Ok(pages)
    }
}

/// Fetches each index page and queues its detail links
///
/// Dropping `work_tx` on return closes the queue, which lets the workers
/// exit once it is empty.
async fn run_index_stage(
    client: Client,
    anchor_selector: Selector,
    settings: PipelineSettings,
    scheduler: Arc<Scheduler>,
    index_urls: Vec<Url>,
    work_tx: mpsc::Sender<Url>,
) -> FetchStats {
    let mut stats = FetchStats::default();
    let mut seen: HashSet<String> = HashSet::new();

    for index_url in index_urls {
        if !is_allowed_host(&index_url, &settings.allowed_domains) {
            tracing::debug!("Skipping index page outside allowed domains: {}", index_url);
            stats.skipped += 1;
            continue;
        }

        let page = {
            let domain = extract_domain(&index_url).unwrap_or_default();
            let _slot = scheduler.acquire(&domain).await;
            fetch_page(&client, &index_url).await
        };

        let page = match page {
            Ok(page) => page,
            Err(e) => {
                audit::entry(Severity::Error, "can not fetch index page", &e.to_string());
                continue;
            }
        };
        stats.index_pages += 1;

        let anchors = extract_anchors(&page.body, &page.url, &anchor_selector);
        tracing::info!("Found {} listing link(s) on {}", anchors.len(), page.url);
        stats.anchors += anchors.len();

        for detail_url in anchors {
            if !is_allowed_host(&detail_url, &settings.allowed_domains) {
                tracing::debug!("Skipping link outside allowed domains: {}", detail_url);
                stats.skipped += 1;
                continue;
            }

            if !seen.insert(dedup_key(&detail_url)) {
                tracing::debug!("Already scheduled this pass: {}", detail_url);
                continue;
            }

            scheduler.progress().scheduled();
            stats.scheduled += 1;

            if work_tx.send(detail_url).await.is_err() {
                tracing::warn!("Detail workers stopped; abandoning index stage");
                return stats;
            }
        }
    }

    stats
}

/// Drains the work queue, fetching each detail page
///
/// Returns `(fetched, failed)` counts.
async fn run_detail_worker(
    worker_id: usize,
    client: Client,
    scheduler: Arc<Scheduler>,
    work_rx: Arc<Mutex<mpsc::Receiver<Url>>>,
    page_tx: mpsc::UnboundedSender<DetailPage>,
) -> (usize, usize) {
    let mut fetched = 0;
    let mut failed = 0;

    loop {
        let next = { work_rx.lock().await.recv().await };
        let Some(url) = next else {
            break;
        };

        scheduler.pause().await;

        let result = {
            let domain = extract_domain(&url).unwrap_or_default();
            let _slot = scheduler.acquire(&domain).await;
            tracing::debug!(worker = worker_id, "Fetching {}", url);
            fetch_page(&client, &url).await
        };

        match result {
            Ok(page) => {
                fetched += 1;
                if page_tx.send(page).is_err() {
                    tracing::debug!(worker = worker_id, "Results receiver dropped");
                }
            }
            Err(e) => {
                failed += 1;
                audit::entry(Severity::Error, "can not fetch detail page", &e.to_string());
            }
        }

        scheduler.progress().completed();
    }

    (fetched, failed)
}
