//! Storage traits and error types
//!
//! This module defines the trait interface for listing stores and the
//! associated error types.

use crate::listing::Listing;
use crate::storage::{PassCounts, PassRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Pass not found: {0}")]
    PassNotFound(i64),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for listing store implementations
pub trait ListingStore: Send {
    // ===== Listings =====

    /// Inserts or replaces listings in one partition, keyed by id
    ///
    /// Listings with an empty id are skipped without error.
    ///
    /// # Returns
    ///
    /// The number of listings written
    fn upsert_batch(&mut self, partition: &str, listings: &[Listing]) -> StorageResult<usize>;

    /// Gets one listing from a partition
    fn get_listing(&self, partition: &str, id: &str) -> StorageResult<Option<Listing>>;

    /// Counts all stored listings
    fn count_listings(&self) -> StorageResult<u64>;

    /// Counts listings per partition, sorted by partition name
    fn count_by_partition(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Pass History =====

    /// Records the start of a pass
    ///
    /// # Returns
    ///
    /// The ID of the new pass record
    fn begin_pass(&mut self, target: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records the end of a pass with its counters
    fn finish_pass(&mut self, pass_id: i64, counts: &PassCounts) -> StorageResult<()>;

    /// Gets a pass by ID
    fn get_pass(&self, pass_id: i64) -> StorageResult<PassRecord>;

    /// Gets the most recent passes, newest first
    fn recent_passes(&self, limit: usize) -> StorageResult<Vec<PassRecord>>;
}
