use std::time::Duration;

use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
    ",
    )?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS pending_changes (
    rowid INTEGER PRIMARY KEY,
    change_id BLOB NOT NULL UNIQUE CHECK (length(change_id) = 16),
    kind TEXT NOT NULL,
    submitted_by TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    decided_at INTEGER,
    decided_by TEXT,
    reason TEXT
);
CREATE INDEX IF NOT EXISTS idx_pending_changes_status
    ON pending_changes (status, created_at, rowid);

CREATE TABLE IF NOT EXISTS companies (
    company_id BLOB PRIMARY KEY CHECK (length(company_id) = 16),
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email TEXT,
    phone TEXT,
    address TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wells (
    well_id BLOB PRIMARY KEY CHECK (length(well_id) = 16),
    api TEXT UNIQUE,
    company_id BLOB REFERENCES companies (company_id),
    company_man_name TEXT,
    company_man_number TEXT,
    company_man_email TEXT,
    company_man_cell TEXT,
    previous_anchor_company TEXT,
    last_test_date TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS anchors (
    well_id BLOB NOT NULL REFERENCES wells (well_id),
    quadrant TEXT NOT NULL CHECK (quadrant IN ('NE', 'NW', 'SE', 'SW')),
    lat REAL NOT NULL CHECK (lat BETWEEN -90 AND 90),
    lng REAL NOT NULL CHECK (lng BETWEEN -180 AND 180),
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (well_id, quadrant)
);

CREATE TABLE IF NOT EXISTS well_history (
    rowid INTEGER PRIMARY KEY,
    well_id BLOB NOT NULL REFERENCES wells (well_id),
    change_id BLOB NOT NULL UNIQUE REFERENCES pending_changes (change_id),
    snapshot TEXT NOT NULL,
    checksum BLOB NOT NULL CHECK (length(checksum) = 32),
    recorded_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_well_history_well ON well_history (well_id, rowid);

CREATE TRIGGER IF NOT EXISTS well_history_no_update
BEFORE UPDATE ON well_history
BEGIN
    SELECT RAISE(ABORT, 'well_history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS well_history_no_delete
BEFORE DELETE ON well_history
BEGIN
    SELECT RAISE(ABORT, 'well_history is append-only');
END;
";
