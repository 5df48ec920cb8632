//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ListingStore trait.

use crate::listing::{Address, Listing};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ListingStore, StorageError, StorageResult};
use crate::storage::{PassCounts, PassRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite listing store
pub struct SqliteListingStore {
    conn: Connection,
}

impl SqliteListingStore {
    /// Creates a new SqliteListingStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteListingStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

const LISTING_COLUMNS: &str = "id, url, price, area, city, province, district, street, \
                               zip_code, interior, offered_at, crawled_at";

const PASS_COLUMNS: &str = "id, target, started_at, finished_at, config_hash, \
                            fetched, extracted, failed, known, new_count";

fn parse_time(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("timestamp '{}': {}", value, e)))
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<(Listing, String, String)> {
    let listing = Listing {
        id: row.get(0)?,
        source_url: row.get(1)?,
        price: row.get::<_, i64>(2)? as u64,
        area: row.get::<_, i64>(3)? as u64,
        address: Address {
            city: row.get(4)?,
            province: row.get(5)?,
            district: row.get(6)?,
            street: row.get(7)?,
            zip_code: row.get(8)?,
        },
        interior: row.get(9)?,
        offered_at: DateTime::<Utc>::MIN_UTC,
        crawled_at: DateTime::<Utc>::MIN_UTC,
    };
    Ok((listing, row.get(10)?, row.get(11)?))
}

fn pass_from_row(row: &Row<'_>) -> rusqlite::Result<PassRecord> {
    Ok(PassRecord {
        id: row.get(0)?,
        target: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        counts: PassCounts {
            fetched: row.get::<_, i64>(5)? as usize,
            extracted: row.get::<_, i64>(6)? as usize,
            failed: row.get::<_, i64>(7)? as usize,
            known: row.get::<_, i64>(8)? as usize,
            new: row.get::<_, i64>(9)? as usize,
        },
    })
}

impl ListingStore for SqliteListingStore {
    // ===== Listings =====

    fn upsert_batch(&mut self, partition: &str, listings: &[Listing]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO listings (partition, id, url, price, area, city, province, district,
                                       street, zip_code, interior, offered_at, crawled_at,
                                       first_stored_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
                 ON CONFLICT(partition, id) DO UPDATE SET
                    url = excluded.url,
                    price = excluded.price,
                    area = excluded.area,
                    city = excluded.city,
                    province = excluded.province,
                    district = excluded.district,
                    street = excluded.street,
                    zip_code = excluded.zip_code,
                    interior = excluded.interior,
                    offered_at = excluded.offered_at,
                    crawled_at = excluded.crawled_at,
                    updated_at = excluded.updated_at",
            )?;

            for listing in listings.iter().filter(|l| !l.id.is_empty()) {
                stmt.execute(params![
                    partition,
                    listing.id,
                    listing.source_url,
                    listing.price as i64,
                    listing.area as i64,
                    listing.address.city,
                    listing.address.province,
                    listing.address.district,
                    listing.address.street,
                    listing.address.zip_code,
                    listing.interior,
                    listing.offered_at.to_rfc3339(),
                    listing.crawled_at.to_rfc3339(),
                    now,
                ])?;
                written += 1;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    fn get_listing(&self, partition: &str, id: &str) -> StorageResult<Option<Listing>> {
        let sql = format!(
            "SELECT {} FROM listings WHERE partition = ?1 AND id = ?2",
            LISTING_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![partition, id], listing_from_row)
            .optional()?;

        match row {
            Some((mut listing, offered_at, crawled_at)) => {
                listing.offered_at = parse_time(&offered_at)?;
                listing.crawled_at = parse_time(&crawled_at)?;
                Ok(Some(listing))
            }
            None => Ok(None),
        }
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_partition(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT partition, COUNT(*) FROM listings GROUP BY partition ORDER BY partition",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    // ===== Pass History =====

    fn begin_pass(&mut self, target: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO passes (target, started_at, config_hash) VALUES (?1, ?2, ?3)",
            params![target, now, config_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_pass(&mut self, pass_id: i64, counts: &PassCounts) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE passes
             SET finished_at = ?1, fetched = ?2, extracted = ?3, failed = ?4, known = ?5,
                 new_count = ?6
             WHERE id = ?7",
            params![
                now,
                counts.fetched as i64,
                counts.extracted as i64,
                counts.failed as i64,
                counts.known as i64,
                counts.new as i64,
                pass_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::PassNotFound(pass_id));
        }
        Ok(())
    }

    fn get_pass(&self, pass_id: i64) -> StorageResult<PassRecord> {
        let sql = format!("SELECT {} FROM passes WHERE id = ?1", PASS_COLUMNS);
        self.conn
            .query_row(&sql, params![pass_id], pass_from_row)
            .optional()?
            .ok_or(StorageError::PassNotFound(pass_id))
    }

    fn recent_passes(&self, limit: usize) -> StorageResult<Vec<PassRecord>> {
        let sql = format!(
            "SELECT {} FROM passes ORDER BY id DESC LIMIT ?1",
            PASS_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let passes = stmt
            .query_map(params![limit as i64], pass_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(passes)
    }
}
