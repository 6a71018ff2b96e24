//! SQLite export
//!
//! Inserts use `INSERT OR IGNORE` on the `path` primary key, so exporting
//! the same tree twice adds nothing the second time.

use super::RecordSink;
use crate::db::schema::{self, keys};
use crate::error::{ExportError, ExportResult};
use crate::fs::PathRecord;
use crate::walker::WalkResult;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

const INSERT_SQL: &str = "INSERT OR IGNORE INTO files \
    (path, path_hash, kind, size, modified_time, accessed_time, created_time, content_hash, depth, error) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

pub struct SqliteExporter {
    conn: Connection,
    path: Option<PathBuf>,
    inserted: u64,
}

impl SqliteExporter {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: &Path) -> ExportResult<Self> {
        let conn = Connection::open(path).map_err(|e| ExportError::CreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> ExportResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> ExportResult<Self> {
        schema::create_database(&conn)?;
        schema::set_walk_info(&conn, keys::SCHEMA_VERSION, &schema::SCHEMA_VERSION.to_string())?;
        schema::set_walk_info(&conn, keys::WALKER_VERSION, env!("CARGO_PKG_VERSION"))?;
        schema::set_walk_info(&conn, keys::STATUS, "running")?;

        Ok(Self {
            conn,
            path,
            inserted: 0,
        })
    }

    /// Paths already stored from earlier walks
    pub fn known_paths(&self) -> ExportResult<HashSet<String>> {
        schema::load_known_paths(&self.conn)
    }

    /// Rows newly inserted through this exporter
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn row_count(&self) -> ExportResult<u64> {
        schema::count_files(&self.conn)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn unix_secs(time: Option<DateTime<Utc>>) -> Option<i64> {
    time.map(|t| t.timestamp())
}

impl RecordSink for SqliteExporter {
    fn write_batch(&mut self, batch: &[PathRecord]) -> ExportResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_SQL)?;
            for record in batch {
                inserted += stmt.execute(params![
                    record.path,
                    record.path_hash,
                    record.kind.as_str(),
                    record.size.map(|s| s as i64),
                    unix_secs(record.modified),
                    unix_secs(record.accessed),
                    unix_secs(record.created),
                    record.content_hash,
                    record.depth,
                    record.error,
                ])?;
            }
        }
        tx.commit()?;

        self.inserted += inserted as u64;
        Ok(inserted)
    }

    fn record_summary(&mut self, result: &WalkResult) -> ExportResult<()> {
        let conn = &self.conn;
        let status = if result.completed { "completed" } else { "interrupted" };
        let end = result.started_at
            + chrono::Duration::from_std(result.duration).unwrap_or_else(|_| chrono::Duration::zero());

        schema::set_walk_info(conn, keys::ROOT, &result.root.to_string_lossy())?;
        schema::set_walk_info(
            conn,
            keys::START_TIME,
            &result.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        schema::set_walk_info(conn, keys::END_TIME, &end.to_rfc3339_opts(SecondsFormat::Secs, true))?;
        schema::set_walk_info(
            conn,
            keys::DURATION_SECS,
            &format!("{:.3}", result.duration.as_secs_f64()),
        )?;
        schema::set_walk_info(conn, keys::WORKER_COUNT, &result.worker_count.to_string())?;
        schema::set_walk_info(conn, keys::TOTAL_RECORDS, &result.records_emitted.to_string())?;
        schema::set_walk_info(conn, keys::RECORDS_INSERTED, &result.records_written.to_string())?;
        schema::set_walk_info(conn, keys::ERROR_COUNT, &result.errors.to_string())?;
        schema::set_walk_info(conn, keys::STATUS, status)?;
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<()> {
        debug!(inserted = self.inserted, "Finalizing database");
        schema::create_indexes(&self.conn)?;
        schema::optimize_for_reads(&self.conn)?;
        Ok(())
    }
}
