//! Record sinks: in-memory result sets, CSV files, and SQLite tables
//!
//! Workers never touch a sink directly. Records travel over a channel to
//! the batched writer thread (`db::writer`), which hands them to the sink
//! one batch at a time:
//!
//! ```text
//! Worker 1 ─┐
//! Worker 2 ─┼──► WriterHandle ──► BatchedWriter thread ──► RecordSink
//! Worker N ─┘     (channel)        (buffer, batch)          ResultSet | CSV | SQLite
//! ```

pub mod csv;
pub mod result_set;
pub mod sqlite;

pub use self::csv::CsvExporter;
pub use result_set::{ResultSet, Table};
pub use sqlite::SqliteExporter;

use crate::error::ExportResult;
use crate::fs::PathRecord;
use crate::walker::WalkResult;

/// Destination for walk records
pub trait RecordSink: Send + 'static {
    /// Persist a batch, returning how many records were newly stored
    ///
    /// Records rejected as duplicates are not errors; they are simply not
    /// counted.
    fn write_batch(&mut self, batch: &[PathRecord]) -> ExportResult<usize>;

    /// Store walk-level metadata, if the sink keeps any
    fn record_summary(&mut self, _result: &WalkResult) -> ExportResult<()> {
        Ok(())
    }

    /// Flush and finalize
    fn finish(&mut self) -> ExportResult<()> {
        Ok(())
    }
}

/// Write an already-collected result set to a sink in batches
pub fn export_result_set<S: RecordSink>(
    records: &ResultSet,
    sink: &mut S,
    batch_size: usize,
) -> ExportResult<usize> {
    let mut written = 0;
    for batch in records.records().chunks(batch_size.max(1)) {
        written += sink.write_batch(batch)?;
    }
    sink.finish()?;
    Ok(written)
}
