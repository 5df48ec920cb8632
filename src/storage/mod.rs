//! Storage module for persisting listings
//!
//! This module handles the local listing store, including:
//! - SQLite database initialization and schema management
//! - Batched upserts keyed by listing id, grouped into partitions
//! - Pass history for the `--stats` report

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteListingStore;
pub use traits::{ListingStore, StorageError, StorageResult};

use crate::listing::Listing;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Partition name used by the flat layout, and for listings without a city
pub const DEFAULT_PARTITION: &str = "listings";

/// A store shared between the publisher and the pass history
pub type SharedStore = Arc<Mutex<SqliteListingStore>>;

/// Initializes or opens the listing store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_store(path: &Path) -> StorageResult<SqliteListingStore> {
    SqliteListingStore::new(path)
}

/// Opens the listing store behind a shared lock
pub fn open_shared_store(path: &Path) -> StorageResult<SharedStore> {
    Ok(Arc::new(Mutex::new(open_store(path)?)))
}

/// How listings are grouped in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Partitioning {
    /// One partition per `address.city`
    #[default]
    ByCity,

    /// Everything in one partition
    Flat,
}

impl Partitioning {
    /// Partition a listing belongs to
    pub fn partition_for(&self, listing: &Listing) -> String {
        match self {
            Self::ByCity if !listing.city().trim().is_empty() => listing.city().trim().to_string(),
            _ => DEFAULT_PARTITION.to_string(),
        }
    }

    /// Groups listings by partition
    pub fn group<'a>(&self, listings: &'a [Listing]) -> BTreeMap<String, Vec<&'a Listing>> {
        let mut groups: BTreeMap<String, Vec<&'a Listing>> = BTreeMap::new();
        for listing in listings {
            groups
                .entry(self.partition_for(listing))
                .or_default()
                .push(listing);
        }
        groups
    }
}

/// Counters written when a pass ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub fetched: usize,
    pub extracted: usize,
    pub failed: usize,
    pub known: usize,
    pub new: usize,
}

/// Represents a recorded pass
#[derive(Debug, Clone)]
pub struct PassRecord {
    pub id: i64,
    pub target: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub counts: PassCounts,
}
