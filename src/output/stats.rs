//! Statistics from the dedup cache and the listing store
//!
//! This module provides functionality for extracting and displaying the
//! `--stats` report and the per-pass summary.

use crate::cache::DedupCache;
use crate::crawler::PassReport;
use crate::storage::{ListingStore, PassRecord};
use crate::Result;
use chrono::{DateTime, Utc};

/// Snapshot of the cache and store
#[derive(Debug, Clone)]
pub struct WatchStatistics {
    /// Backend description of the dedup cache
    pub cache_backend: String,

    /// Ids currently remembered (zero once the set has expired)
    pub cached_ids: usize,

    /// When the remembered id set expires
    pub cache_expires_at: Option<DateTime<Utc>>,

    /// Total number of stored listings
    pub stored_listings: u64,

    /// Stored listings per partition
    pub partitions: Vec<(String, u64)>,

    /// Most recent passes, newest first
    pub recent_passes: Vec<PassRecord>,
}

/// Loads statistics from the cache and the store
///
/// # Arguments
///
/// * `cache` - The dedup cache to inspect
/// * `store` - The listing store to query
/// * `recent` - How many recent passes to include
pub fn load_statistics(
    cache: &dyn DedupCache,
    store: &dyn ListingStore,
    recent: usize,
) -> Result<WatchStatistics> {
    Ok(WatchStatistics {
        cache_backend: cache.describe(),
        cached_ids: cache.members()?.len(),
        cache_expires_at: cache.expires_at()?,
        stored_listings: store.count_listings()?,
        partitions: store.count_by_partition()?,
        recent_passes: store.recent_passes(recent)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &WatchStatistics) {
    println!("=== Rent-Watch Statistics ===\n");

    println!("Dedup Cache ({}):", stats.cache_backend);
    println!("  Remembered ids: {}", stats.cached_ids);
    match stats.cache_expires_at {
        Some(at) => println!("  Expires at: {}", at.to_rfc3339()),
        None => println!("  Expires at: (no expiry set)"),
    }
    println!();

    println!("Listing Store:");
    println!("  Total listings: {}", stats.stored_listings);
    for (partition, count) in &stats.partitions {
        println!("  {}: {}", partition, count);
    }
    println!();

    if stats.recent_passes.is_empty() {
        println!("No passes recorded yet.");
        return;
    }

    println!("Recent Passes:");
    for pass in &stats.recent_passes {
        let finished = pass.finished_at.as_deref().unwrap_or("(unfinished)");
        println!(
            "  #{} {} [{} → {}] fetched {}, extracted {}, failed {}, new {}",
            pass.id,
            pass.target,
            pass.started_at,
            finished,
            pass.counts.fetched,
            pass.counts.extracted,
            pass.counts.failed,
            pass.counts.new
        );
    }
}

/// Prints the summary of one pass
pub fn print_pass_report(report: &PassReport) {
    println!("\n=== Pass Summary: {} ===", report.target);
    println!("Detail pages fetched: {}", report.fetched);
    println!("Listings extracted: {}", report.extracted);
    println!("Pages without a listing: {}", report.failed);
    println!("Already known: {}", report.known);
    println!("New: {}", report.new);

    if report.cache_degraded {
        println!("Warning: dedup cache unavailable, every listing counted as new");
    }
    if let Some(ack) = &report.ack {
        println!("Published, ack {}", ack);
    }

    for listing in &report.fresh_listings {
        println!(
            "  {} €{} {}m² {}",
            listing.id, listing.price, listing.area, listing.source_url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ExpiryRule, MemoryCache, TtlPolicy};
    use crate::storage::SqliteListingStore;

    #[test]
    fn test_load_statistics_empty() {
        let cache = MemoryCache::new(ExpiryRule::new(TtlPolicy::SetOnce, 5));
        let store = SqliteListingStore::new_in_memory().unwrap();

        let stats = load_statistics(&cache, &store, 5).unwrap();

        assert_eq!(stats.cache_backend, "memory");
        assert_eq!(stats.cached_ids, 0);
        assert_eq!(stats.cache_expires_at, None);
        assert_eq!(stats.stored_listings, 0);
        assert!(stats.recent_passes.is_empty());
    }

    #[test]
    fn test_load_statistics_counts() {
        let mut cache = MemoryCache::new(ExpiryRule::new(TtlPolicy::SetOnce, 5));
        cache.add_all(&["a".to_string(), "b".to_string()]).unwrap();

        let mut store = SqliteListingStore::new_in_memory().unwrap();
        let pass = store.begin_pass("page 0", "hash").unwrap();
        store.finish_pass(pass, &Default::default()).unwrap();

        let stats = load_statistics(&cache, &store, 5).unwrap();

        assert_eq!(stats.cached_ids, 2);
        assert!(stats.cache_expires_at.is_some());
        assert_eq!(stats.recent_passes.len(), 1);
        assert_eq!(stats.recent_passes[0].target, "page 0");
    }
}
