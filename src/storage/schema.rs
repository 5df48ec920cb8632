//! Database schema definitions
//!
//! This module contains the SQL schema for the Rent-Watch listing store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Latest known state of every listing, one row per partition and id
CREATE TABLE IF NOT EXISTS listings (
    partition TEXT NOT NULL,
    id TEXT NOT NULL,
    url TEXT NOT NULL,
    price INTEGER NOT NULL,
    area INTEGER NOT NULL,
    city TEXT,
    province TEXT,
    district TEXT,
    street TEXT,
    zip_code TEXT NOT NULL,
    interior TEXT,
    offered_at TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    first_stored_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (partition, id)
);

CREATE INDEX IF NOT EXISTS idx_listings_id ON listings(id);

-- One row per pass
CREATE TABLE IF NOT EXISTS passes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    fetched INTEGER NOT NULL DEFAULT 0,
    extracted INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    known INTEGER NOT NULL DEFAULT 0,
    new_count INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
