//! Concurrent tree walker
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │     WalkCoordinator     │
//!                     │  - seeds the root       │
//!                     │  - waits for drain      │
//!                     └───────────┬─────────────┘
//!                                 │ WorkQueue (pending counter)
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │  lstat    │             │  lstat    │             │  lstat    │
//! │  readdir  │             │  readdir  │             │  readdir  │
//! │  md5      │             │  md5      │             │  md5      │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                          BatchedWriter → RecordSink
//! ```
//!
//! A task is registered before it is published and completed only after
//! all of its children are registered, so the pending count reaches zero
//! exactly once: when nothing is queued and no worker holds a task.

pub mod coordinator;
pub mod queue;
pub mod worker;

pub use coordinator::{WalkCoordinator, WalkProgress, WalkResult};
pub use queue::{PathTask, WorkQueue};

use crate::config::WalkConfig;
use crate::error::Result;
use crate::export::ResultSet;
use std::path::PathBuf;

/// Walk `root` with default settings and collect every record
pub fn walk(root: impl Into<PathBuf>) -> Result<ResultSet> {
    walk_with(WalkConfig::new(root)).map(|(_, records)| records)
}

/// Walk with explicit settings and collect every record
pub fn walk_with(config: WalkConfig) -> Result<(WalkResult, ResultSet)> {
    WalkCoordinator::new(config)?.run(ResultSet::new())
}
