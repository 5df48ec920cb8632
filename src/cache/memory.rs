//! In-memory dedup cache for tests and one-off runs

use super::{CacheResult, DedupCache, ExpiryRule};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Process-local dedup cache
#[derive(Debug, Clone)]
pub struct MemoryCache {
    ids: HashSet<String>,
    expiry: Option<DateTime<Utc>>,
    rule: ExpiryRule,
}

impl MemoryCache {
    pub fn new(rule: ExpiryRule) -> Self {
        Self {
            ids: HashSet::new(),
            expiry: None,
            rule,
        }
    }

    fn purge_if_expired(&mut self, now: DateTime<Utc>) {
        if ExpiryRule::is_expired(self.expiry, now) {
            self.ids.clear();
            self.expiry = None;
        }
    }
}

impl DedupCache for MemoryCache {
    fn members_at(&self, now: DateTime<Utc>) -> CacheResult<HashSet<String>> {
        if ExpiryRule::is_expired(self.expiry, now) {
            return Ok(HashSet::new());
        }
        Ok(self.ids.clone())
    }

    fn add_all_at(&mut self, ids: &[String], now: DateTime<Utc>) -> CacheResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        self.purge_if_expired(now);
        let was_empty = self.ids.is_empty();

        self.ids.extend(ids.iter().cloned());
        self.expiry = self.rule.next_expiry(self.expiry, was_empty, now);

        Ok(())
    }

    fn expires_at(&self) -> CacheResult<Option<DateTime<Utc>>> {
        Ok(self.expiry)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
