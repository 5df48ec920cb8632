//! SQLite-backed dedup cache
//!
//! The id set lives in `seen_ids`; the single expiry of the set is one row
//! in `cache_meta`.

use super::{CacheError, CacheResult, DedupCache, ExpiryRule};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

const CACHE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seen_ids (
    id TEXT PRIMARY KEY,
    added_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cache_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const EXPIRY_KEY: &str = "expires_at";

/// Dedup cache persisted in a SQLite file
pub struct SqliteCache {
    conn: Connection,
    label: String,
    rule: ExpiryRule,
}

impl SqliteCache {
    /// Opens or creates the cache database and checks it answers
    pub fn open(path: &Path, rule: ExpiryRule) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::init(conn, path.display().to_string(), rule)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(rule: ExpiryRule) -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open_in_memory()?, ":memory:".to_string(), rule)
    }

    fn init(conn: Connection, label: String, rule: ExpiryRule) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(CACHE_SCHEMA_SQL)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(Self { conn, label, rule })
    }

    fn read_expiry(conn: &Connection) -> CacheResult<Option<DateTime<Utc>>> {
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = ?1",
                params![EXPIRY_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                DateTime::parse_from_rfc3339(&v)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| CacheError::Operation(format!("bad stored expiry '{}': {}", v, e)))
            })
            .transpose()
    }
}

impl DedupCache for SqliteCache {
    fn members_at(&self, now: DateTime<Utc>) -> CacheResult<HashSet<String>> {
        if ExpiryRule::is_expired(Self::read_expiry(&self.conn)?, now) {
            return Ok(HashSet::new());
        }

        let mut stmt = self.conn.prepare("SELECT id FROM seen_ids")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(ids)
    }

    fn add_all_at(&mut self, ids: &[String], now: DateTime<Utc>) -> CacheResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;

        let mut expiry = Self::read_expiry(&tx)?;
        if ExpiryRule::is_expired(expiry, now) {
            tx.execute("DELETE FROM seen_ids", [])?;
            tx.execute("DELETE FROM cache_meta WHERE key = ?1", params![EXPIRY_KEY])?;
            expiry = None;
        }

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM seen_ids", [], |row| row.get(0))?;
        let was_empty = count == 0;

        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO seen_ids (id, added_at) VALUES (?1, ?2)")?;
            let added_at = now.to_rfc3339();
            for id in ids {
                stmt.execute(params![id, added_at])?;
            }
        }

        if let Some(next) = self.rule.next_expiry(expiry, was_empty, now) {
            if Some(next) != expiry {
                tx.execute(
                    "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?1, ?2)",
                    params![EXPIRY_KEY, next.to_rfc3339()],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn expires_at(&self) -> CacheResult<Option<DateTime<Utc>>> {
        Self::read_expiry(&self.conn)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.label)
    }
}
