//! Worker thread logic for parallel tree walking
//!
//! Each worker:
//! - Pulls path tasks from the work queue
//! - `lstat`s the path and builds a record
//! - Lists directories and pushes their children back to the queue
//! - Hashes regular files
//! - Sends records to the batched writer
//!
//! When the bounded queue is full, children are kept on a worker-local stack
//! and processed inline instead of blocking.

use crate::config::WalkConfig;
use crate::content::hash_file;
use crate::db::WriterHandle;
use crate::error::{WalkOutcome, WorkerError};
use crate::fs::{path_text, EntryKind, PathRecord};
use crate::walker::queue::{Next, PathTask, WorkGuard, WorkQueueReceiver, WorkQueueSender};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// How long to wait on an empty queue before rechecking shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories listed
    pub dirs_processed: AtomicU64,

    /// Regular files found
    pub files_found: AtomicU64,

    /// Bytes found (sum of file sizes)
    pub bytes_found: AtomicU64,

    /// Records sent to the writer
    pub records_emitted: AtomicU64,

    /// Errors encountered (each also lands on a record)
    pub errors: AtomicU64,

    /// Paths excluded or already known
    pub skipped: AtomicU64,
}

impl WorkerStats {
    fn record_dir(&self) {
        self.dirs_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_file(&self, bytes: u64) {
        self.files_found.fetch_add(1, Ordering::Relaxed);
        self.bytes_found.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_emit(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything a worker thread shares with the rest of the walk
pub struct WorkerContext {
    pub config: Arc<WalkConfig>,
    pub queue_tx: WorkQueueSender,
    pub writer: WriterHandle,
    /// Paths to skip emitting (already stored by an earlier walk)
    pub known: Option<Arc<HashSet<String>>>,
}

/// A worker thread that processes path tasks
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<Result<(), WorkerError>>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        ctx: WorkerContext,
        queue_rx: WorkQueueReceiver,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || worker_loop(id, ctx, queue_rx, shutdown, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Check whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "Worker thread panicked".into());
                    Err(WorkerError::Panicked {
                        id: self.id,
                        message,
                    })
                }
            }
        } else {
            Ok(())
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    ctx: WorkerContext,
    queue_rx: WorkQueueReceiver,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) -> Result<(), WorkerError> {
    debug!(worker = id, "Worker starting");

    // Tasks the queue had no room for
    let mut local: Vec<PathTask> = Vec::new();

    while !shutdown.load(Ordering::Relaxed) {
        let task = match local.pop() {
            Some(task) => {
                ctx.queue_tx.record_inline();
                task
            }
            None => match queue_rx.next(POLL_INTERVAL) {
                Next::Task(task) => task,
                Next::Idle => continue,
                Next::Drained => break,
            },
        };

        // Completes the task on drop, after every child is registered
        let _guard = WorkGuard::new(&queue_rx);

        let outcome = process_path(id, &task, &ctx, &stats, &mut local)?;

        match &outcome {
            WalkOutcome::Success { path, children } => {
                trace!(worker = id, path = %path, children = children, "Path processed");
            }
            WalkOutcome::Skipped { path, reason } => {
                debug!(worker = id, path = %path, reason = %reason, "Path skipped");
            }
            WalkOutcome::Partial { path, error } => {
                warn!(worker = id, path = %path, error = %error, "Partial record");
            }
        }
    }

    debug!(
        worker = id,
        dirs = stats.dirs_processed.load(Ordering::Relaxed),
        files = stats.files_found.load(Ordering::Relaxed),
        "Worker shutting down"
    );

    Ok(())
}

/// Process a single path
///
/// Only a closed record channel or work queue is fatal; every filesystem
/// error is folded into the record.
fn process_path(
    worker_id: usize,
    task: &PathTask,
    ctx: &WorkerContext,
    stats: &WorkerStats,
    local: &mut Vec<PathTask>,
) -> Result<WalkOutcome, WorkerError> {
    let metadata = match fs::symlink_metadata(&task.path) {
        Ok(m) => m,
        Err(e) => {
            stats.record_error();
            let error = format!("stat failed: {}", e);
            let record = PathRecord::partial(&task.path, task.depth, error.clone());
            let path = record.path.clone();
            emit(worker_id, ctx, stats, record)?;
            return Ok(WalkOutcome::Partial { path, error });
        }
    };

    let mut record = PathRecord::from_metadata(&task.path, &metadata, task.depth);
    let mut children = 0;

    match record.kind {
        EntryKind::Directory => {
            stats.record_dir();
            if ctx.config.within_depth(task.depth + 1) {
                children = queue_children(task, ctx, stats, local, &mut record)?;
            }
        }
        EntryKind::File => stats.record_file(record.size.unwrap_or(0)),
        EntryKind::Symlink | EntryKind::Other => {}
    }

    // The root itself is not reported; directories only on request
    let wanted = match record.kind {
        EntryKind::Directory => task.depth > 0 && ctx.config.include_dirs,
        _ => true,
    };
    if !wanted {
        if let Some(error) = record.error {
            return Ok(WalkOutcome::Partial {
                path: record.path,
                error,
            });
        }
        return Ok(WalkOutcome::Success {
            path: record.path,
            children,
        });
    }

    if ctx
        .known
        .as_ref()
        .is_some_and(|known| known.contains(&record.path))
    {
        stats.record_skip();
        return Ok(WalkOutcome::Skipped {
            path: record.path,
            reason: "Already stored".into(),
        });
    }

    if record.kind.is_file() && ctx.config.hash_content {
        match hash_file(&task.path, ctx.config.block_size) {
            Ok(digest) => record.content_hash = Some(digest),
            Err(e) => {
                stats.record_error();
                record.push_error(e.to_string());
            }
        }
    }

    let path = record.path.clone();
    let error = record.error.clone();
    emit(worker_id, ctx, stats, record)?;

    Ok(match error {
        Some(error) => WalkOutcome::Partial { path, error },
        None => WalkOutcome::Success { path, children },
    })
}

/// List a directory and register each child; returns how many were queued
fn queue_children(
    task: &PathTask,
    ctx: &WorkerContext,
    stats: &WorkerStats,
    local: &mut Vec<PathTask>,
    record: &mut PathRecord,
) -> Result<usize, WorkerError> {
    let entries = match fs::read_dir(&task.path) {
        Ok(entries) => entries,
        Err(e) => {
            stats.record_error();
            record.push_error(format!("read_dir failed: {}", e));
            return Ok(0);
        }
    };

    let mut queued = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                stats.record_error();
                record.push_error(format!("read_dir entry failed: {}", e));
                continue;
            }
        };

        let child = entry.path();
        if ctx.config.is_excluded(&path_text(&child).0) {
            stats.record_skip();
            continue;
        }

        if let Some(task) = ctx.queue_tx.offer(PathTask::new(child, task.depth + 1))? {
            local.push(task);
        }
        queued += 1;
    }

    Ok(queued)
}

fn emit(
    worker_id: usize,
    ctx: &WorkerContext,
    stats: &WorkerStats,
    record: PathRecord,
) -> Result<(), WorkerError> {
    ctx.writer.send_record(record).map_err(|e| {
        error!(worker = worker_id, error = %e, "Failed to send record to writer");
        WorkerError::ResultChannelClosed { id: worker_id }
    })?;
    stats.record_emit();
    Ok(())
}

/// Totals across all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsTotals {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub records: u64,
    pub errors: u64,
    pub skipped: u64,
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> StatsTotals {
    let mut totals = StatsTotals::default();

    for worker in workers {
        totals.dirs += worker.stats.dirs_processed.load(Ordering::Relaxed);
        totals.files += worker.stats.files_found.load(Ordering::Relaxed);
        totals.bytes += worker.stats.bytes_found.load(Ordering::Relaxed);
        totals.records += worker.stats.records_emitted.load(Ordering::Relaxed);
        totals.errors += worker.stats.errors.load(Ordering::Relaxed);
        totals.skipped += worker.stats.skipped.load(Ordering::Relaxed);
    }

    totals
}
