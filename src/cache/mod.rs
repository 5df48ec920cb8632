//! Dedup cache of already-seen listing ids
//!
//! The cache is one set of ids with a single expiry for the whole set. Adding
//! is always a union. Under [`TtlPolicy::SetOnce`] the expiry is fixed when
//! the set goes from empty to non-empty and never moved afterwards, so the
//! whole set lapses together one horizon after it was started. An expired set
//! reads as empty and is purged before the next write.
//!
//! Backends:
//! - [`MemoryCache`] for tests and `memory://`
//! - [`SqliteCache`] for `sqlite://<path>` or a bare path

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::config::CacheConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Scheme selecting the in-memory backend
pub const MEMORY_URL: &str = "memory://";

/// Scheme prefix selecting the SQLite backend
pub const SQLITE_SCHEME: &str = "sqlite://";

/// Errors from the dedup cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be opened at start-up
    #[error("Cannot connect to dedup cache at {url}: {reason}")]
    Connect { url: String, reason: String },

    /// A read or write failed after start-up
    #[error("Dedup cache operation failed: {0}")]
    Operation(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Operation(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// When the expiry of the id set is (re)computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TtlPolicy {
    /// Expiry is set only when the set goes from empty to non-empty
    #[default]
    SetOnce,

    /// Expiry is pushed to one horizon from now on every non-empty add
    Sliding,
}

/// Expiry arithmetic shared by the backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryRule {
    pub policy: TtlPolicy,
    pub horizon: Duration,
}

impl ExpiryRule {
    pub fn new(policy: TtlPolicy, horizon_days: u32) -> Self {
        Self {
            policy,
            horizon: Duration::days(i64::from(horizon_days)),
        }
    }

    /// Whether a set carrying `expiry` has lapsed at `now`
    pub fn is_expired(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        matches!(expiry, Some(at) if at <= now)
    }

    /// The expiry after a non-empty add at `now`
    ///
    /// `was_empty` is the state of the set after any purge and before the add.
    pub fn next_expiry(
        &self,
        current: Option<DateTime<Utc>>,
        was_empty: bool,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match self.policy {
            TtlPolicy::SetOnce if !was_empty => current,
            _ => Some(now + self.horizon),
        }
    }
}

/// A set of seen ids with one expiry for the whole set
///
/// The `_at` methods take the current time explicitly; the plain methods use
/// the wall clock.
pub trait DedupCache: Send {
    /// Current membership, empty if the set has expired
    fn members_at(&self, now: DateTime<Utc>) -> CacheResult<HashSet<String>>;

    /// Unions `ids` into the set, applying the expiry policy
    fn add_all_at(&mut self, ids: &[String], now: DateTime<Utc>) -> CacheResult<()>;

    /// The stored expiry, if the set has one
    fn expires_at(&self) -> CacheResult<Option<DateTime<Utc>>>;

    /// Backend description for log lines
    fn describe(&self) -> String;

    fn members(&self) -> CacheResult<HashSet<String>> {
        self.members_at(Utc::now())
    }

    fn contains(&self, id: &str) -> CacheResult<bool> {
        Ok(self.members()?.contains(id))
    }

    fn add_all(&mut self, ids: &[String]) -> CacheResult<()> {
        self.add_all_at(ids, Utc::now())
    }
}

/// Opens the backend named by the cache URL
///
/// Any failure here is a [`CacheError::Connect`] and should end the process.
pub fn open_cache(config: &CacheConfig) -> CacheResult<Box<dyn DedupCache>> {
    let rule = ExpiryRule::new(config.ttl_policy, config.horizon_days);
    let url = config.url.trim();

    if url == MEMORY_URL {
        return Ok(Box::new(MemoryCache::new(rule)));
    }

    let path = match url.strip_prefix(SQLITE_SCHEME) {
        Some(path) => path,
        None if url.contains("://") => {
            return Err(CacheError::Connect {
                url: url.to_string(),
                reason: "unsupported cache backend".to_string(),
            })
        }
        None => url,
    };

    let cache = SqliteCache::open(Path::new(path), rule).map_err(|e| CacheError::Connect {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(Box::new(cache))
}
