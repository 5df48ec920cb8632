//! Pass coordinator
//!
//! One pass fetches the detail pages of a target, extracts listings as the
//! pages arrive, diffs the listing ids against the dedup cache and keeps only
//! the listings the cache has not seen. Every id seen in the pass is then
//! written back to the cache, whether it was new or not.
//!
//! The cache read and write are not one transaction. Two passes racing on the
//! same cache can both decide a listing is new, which at worst publishes it
//! twice.

use crate::audit::{self, Severity};
use crate::cache::DedupCache;
use crate::config::{compute_config_hash, Config};
use crate::crawler::pipeline::{CrawlTarget, Fetcher};
use crate::extract::{ExtractError, Extractor};
use crate::listing::Listing;
use crate::publish::Publisher;
use crate::storage::{ListingStore, PassCounts, SharedStore};
use crate::Result;
use std::collections::{HashMap, HashSet};

/// Outcome of one pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub target: String,

    /// Detail pages fetched successfully
    pub fetched: usize,

    /// Distinct listings extracted
    pub extracted: usize,

    /// Pages that did not yield a listing
    pub failed: usize,

    /// Extracted listings the cache already knew
    pub known: usize,

    /// Extracted listings the cache did not know
    pub new: usize,

    /// The new listings, ordered by id
    pub fresh_listings: Vec<Listing>,

    /// True if the cache could not be read and every listing counted as new
    pub cache_degraded: bool,

    /// Publisher acknowledgement, when the new listings were published
    pub ack: Option<String>,
}

impl PassReport {
    fn counts(&self) -> PassCounts {
        PassCounts {
            fetched: self.fetched,
            extracted: self.extracted,
            failed: self.failed,
            known: self.known,
            new: self.new,
        }
    }
}

/// Runs passes against one cache
pub struct Coordinator {
    fetcher: Fetcher,
    extractor: Extractor,
    cache: Box<dyn DedupCache>,
    history: Option<(SharedStore, String)>,
}

impl Coordinator {
    pub fn new(fetcher: Fetcher, extractor: Extractor, cache: Box<dyn DedupCache>) -> Self {
        Self {
            fetcher,
            extractor,
            cache,
            history: None,
        }
    }

    /// Builds the fetcher and extractor from the configuration
    pub fn from_config(config: &Config, cache: Box<dyn DedupCache>) -> Result<Self> {
        Ok(Self::new(
            Fetcher::new(config)?,
            Extractor::from_config(config)?,
            cache,
        ))
    }

    /// Records every pass in the store's pass history
    pub fn with_history(mut self, store: SharedStore, config: &Config) -> Self {
        self.history = Some((store, compute_config_hash(config)));
        self
    }

    pub fn cache(&self) -> &dyn DedupCache {
        self.cache.as_ref()
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Runs one pass and returns the listings not seen before
    ///
    /// Fetch and extraction failures are logged and counted. A failed cache
    /// read makes every listing count as new; a failed cache write is logged.
    /// Only an unresolvable target is an error.
    pub async fn run_pass(&mut self, target: &CrawlTarget) -> Result<PassReport> {
        audit::entry(Severity::Info, "starting pass", &target.to_string());
        let pass_id = self.begin_history(target).await;

        let mut run = self.fetcher.spawn(target)?;

        let mut listings: HashMap<String, Listing> = HashMap::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut report = PassReport {
            target: target.to_string(),
            ..Default::default()
        };

        while let Some(page) = run.next_page().await {
            report.fetched += 1;

            match self.extractor.extract(&page, target.city()) {
                Ok(listing) => {
                    seen_ids.insert(listing.id.clone());
                    listings.insert(listing.id.clone(), listing);
                }
                Err(failure) => {
                    report.failed += 1;
                    if let Some(id) = &failure.id {
                        seen_ids.insert(id.clone());
                    }
                    match failure.error {
                        ExtractError::NotAListing => {
                            tracing::warn!("No listing section on {}", failure.url)
                        }
                        ExtractError::Field(_) => audit::entry(
                            Severity::Error,
                            "can not build listing from page",
                            &failure.to_string(),
                        ),
                    }
                }
            }
        }

        let stats = run.finish().await;
        tracing::debug!("Fetch stats for {}: {:?}", target, stats);

        let known_ids = match self.cache.members() {
            Ok(members) => members,
            Err(e) => {
                audit::entry(Severity::Error, "can not read dedup cache", &e.to_string());
                report.cache_degraded = true;
                HashSet::new()
            }
        };

        report.extracted = listings.len();

        let mut fresh: Vec<Listing> = listings
            .into_values()
            .filter(|listing| !known_ids.contains(&listing.id))
            .collect();
        fresh.sort_by(|a, b| a.id.cmp(&b.id));

        report.new = fresh.len();
        report.known = report.extracted - report.new;
        report.fresh_listings = fresh;

        let mut ids: Vec<String> = seen_ids.into_iter().collect();
        ids.sort();
        if let Err(e) = self.cache.add_all(&ids) {
            audit::entry(Severity::Error, "can not update dedup cache", &e.to_string());
        }

        audit::entry(
            Severity::Info,
            "pass finished",
            &format!(
                "{}: {} fetched, {} extracted, {} failed, {} new",
                target, report.fetched, report.extracted, report.failed, report.new
            ),
        );

        self.finish_history(pass_id, &report).await;

        Ok(report)
    }

    /// Runs one pass and hands the new listings to the publisher
    ///
    /// An empty batch is not published. A publish failure is logged and the
    /// report is still returned; the ids stay in the cache either way.
    pub async fn run_and_publish(
        &mut self,
        target: &CrawlTarget,
        publisher: &dyn Publisher,
    ) -> Result<PassReport> {
        let mut report = self.run_pass(target).await?;

        if report.fresh_listings.is_empty() {
            audit::entry(Severity::Info, "no new listings to publish", &report.target);
            return Ok(report);
        }

        match publisher.publish(&report.fresh_listings).await {
            Ok(ack) => {
                audit::entry(
                    Severity::Notice,
                    "published new listings",
                    &format!(
                        "{} listing(s) via {}, ack {}",
                        report.new,
                        publisher.name(),
                        ack
                    ),
                );
                report.ack = Some(ack);
            }
            Err(e) => {
                audit::entry(Severity::Error, "can not publish new listings", &e.to_string());
            }
        }

        Ok(report)
    }

    async fn begin_history(&self, target: &CrawlTarget) -> Option<i64> {
        let (store, config_hash) = self.history.as_ref()?;
        let mut store = store.lock().await;

        match store.begin_pass(&target.to_string(), config_hash) {
            Ok(id) => Some(id),
            Err(e) => {
                audit::entry(Severity::Error, "can not record pass start", &e.to_string());
                None
            }
        }
    }

    async fn finish_history(&self, pass_id: Option<i64>, report: &PassReport) {
        let (Some(pass_id), Some((store, _))) = (pass_id, self.history.as_ref()) else {
            return;
        };
        let mut store = store.lock().await;

        if let Err(e) = store.finish_pass(pass_id, &report.counts()) {
            audit::entry(Severity::Error, "can not record pass end", &e.to_string());
        }
    }
}
