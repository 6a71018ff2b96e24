//! examinator - concurrent filesystem walker
//!
//! Walks a local directory tree with a pool of worker threads, records
//! `lstat` metadata and an MD5 content hash for every entry, and exports the
//! records to CSV, SQLite, or an in-memory table.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │       Work Queue         │
//!                    │  (crossbeam channel +    │
//!                    │   pending counter)       │
//!                    └────────────┬─────────────┘
//!                                 │ PathTask
//!   ┌─────────────────────────────┼─────────────────────────────┐
//!   │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐│
//!   │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N ││
//!   │  │ lstat   │  │ lstat   │  │ lstat   │         │ lstat   ││
//!   │  │ md5     │  │ md5     │  │ md5     │         │ md5     ││
//!   │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘│
//!   └───────┼────────────┼────────────┼───────────────────┼─────┘
//!           └────────────┴─────┬──────┴───────────────────┘
//!                              ▼ PathRecord
//!                 ┌──────────────────────────┐
//!                 │    Batched Writer        │
//!                 └────────────┬─────────────┘
//!                              ▼
//!              ResultSet  |  CSV file  |  SQLite (files, walk_info)
//! ```
//!
//! # Example
//!
//! ```bash
//! # Hash everything under /data into SQLite
//! examinator /data -o data.db
//!
//! # CSV, directories included, no hashing
//! examinator /data -o data.csv --dirs --no-hash
//!
//! # Find duplicate content afterwards
//! sqlite3 data.db "SELECT content_hash, COUNT(*) FROM files GROUP BY 1 HAVING COUNT(*) > 1"
//! ```
//!
//! The `net` and `text` modules hold the small URL, DNS, and string helpers
//! behind the `ubrl` binary.

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod export;
pub mod fs;
pub mod net;
pub mod progress;
pub mod text;
pub mod walker;

pub use config::{CliArgs, OutputFormat, WalkConfig};
pub use error::{Result, WalkerError};
pub use export::{CsvExporter, RecordSink, ResultSet, SqliteExporter, Table};
pub use fs::{EntryKind, PathRecord};
pub use walker::{walk, walk_with, WalkCoordinator, WalkResult};
