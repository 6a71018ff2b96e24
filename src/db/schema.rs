//! Database schema definitions and creation
//!
//! One row per visited path, keyed by the path itself so a second walk over
//! the same tree inserts nothing new.

use crate::error::ExportResult;
use rusqlite::Connection;
use std::collections::HashSet;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Main table name
pub const FILES_TABLE: &str = "files";

/// Timestamps are Unix seconds; `path` is the primary key.
const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    path_hash TEXT NOT NULL,
    kind TEXT NOT NULL,           -- file, directory, symlink, other
    size INTEGER,
    modified_time INTEGER,
    accessed_time INTEGER,
    created_time INTEGER,
    content_hash TEXT,
    depth INTEGER NOT NULL,
    error TEXT
)
"#;

const CREATE_WALK_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS walk_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// Created after the walk for better insert throughput
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_files_kind ON files(kind)",
    "CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash) WHERE content_hash IS NOT NULL",
    "CREATE INDEX IF NOT EXISTS idx_files_path_hash ON files(path_hash)",
];

const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;      -- 64MB cache
PRAGMA temp_store = MEMORY;
PRAGMA wal_autocheckpoint = 10000;
"#;

const READ_PRAGMAS: &str = r#"
PRAGMA synchronous = FULL;
"#;

/// Create and configure a database for writing
pub fn create_database(conn: &Connection) -> ExportResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;
    conn.execute(CREATE_FILES_TABLE, [])?;
    conn.execute(CREATE_WALK_INFO_TABLE, [])?;
    Ok(())
}

/// Create indexes (called after the walk)
pub fn create_indexes(conn: &Connection) -> ExportResult<()> {
    for sql in CREATE_INDEXES {
        conn.execute(sql, [])?;
    }
    Ok(())
}

/// Apply read-optimized settings and refresh planner statistics
pub fn optimize_for_reads(conn: &Connection) -> ExportResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;
    conn.execute("ANALYZE", [])?;
    Ok(())
}

/// Store walk metadata
pub fn set_walk_info(conn: &Connection, key: &str, value: &str) -> ExportResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO walk_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get walk metadata
pub fn get_walk_info(conn: &Connection, key: &str) -> ExportResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM walk_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Every path already stored
pub fn load_known_paths(conn: &Connection) -> ExportResult<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT path FROM files")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut known = HashSet::new();
    for path in rows {
        known.insert(path?);
    }
    Ok(known)
}

/// Number of stored rows
pub fn count_files(conn: &Connection) -> ExportResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Metadata keys used by the walker
pub mod keys {
    /// Root directory that was walked
    pub const ROOT: &str = "root";

    /// Timestamp when walk started (RFC 3339)
    pub const START_TIME: &str = "start_time";

    /// Timestamp when walk finished (RFC 3339)
    pub const END_TIME: &str = "end_time";

    /// Total duration in seconds
    pub const DURATION_SECS: &str = "duration_secs";

    /// Number of worker threads used
    pub const WORKER_COUNT: &str = "worker_count";

    /// Records emitted by this walk
    pub const TOTAL_RECORDS: &str = "total_records";

    /// Records newly inserted by this walk
    pub const RECORDS_INSERTED: &str = "records_inserted";

    /// Number of errors encountered
    pub const ERROR_COUNT: &str = "error_count";

    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Walker version
    pub const WALKER_VERSION: &str = "walker_version";

    /// Walk status: "running", "completed", "interrupted"
    pub const STATUS: &str = "status";
}
