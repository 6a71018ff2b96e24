//! Walk coordinator - orchestrates the parallel tree walk
//!
//! The coordinator is responsible for:
//! - Setting up the work queue, writer and workers
//! - Waiting for the queue to drain (or a shutdown signal)
//! - Progress reporting
//! - Final statistics and sink finalization

use crate::config::WalkConfig;
use crate::db::BatchedWriter;
use crate::error::{ConfigError, ExportResult, Result};
use crate::export::RecordSink;
use crate::progress::ProgressReporter;
use crate::walker::queue::WorkQueue;
use crate::walker::worker::{aggregate_stats, StatsTotals, Worker, WorkerContext};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a finished walk
#[derive(Debug, Clone)]
pub struct WalkResult {
    /// Canonical root that was walked
    pub root: PathBuf,

    /// Directories listed
    pub total_dirs: u64,

    /// Regular files found
    pub total_files: u64,

    /// Total bytes (sum of file sizes)
    pub total_bytes: u64,

    /// Records sent to the sink
    pub records_emitted: u64,

    /// Records the sink newly stored
    pub records_written: u64,

    /// Records the sink already had
    pub records_ignored: u64,

    /// Number of errors encountered
    pub errors: u64,

    /// Paths excluded or already known
    pub skipped: u64,

    /// Number of worker threads
    pub worker_count: usize,

    /// Wall-clock start
    pub started_at: DateTime<Utc>,

    /// Time taken for the walk
    pub duration: Duration,

    /// Whether the queue drained (vs was interrupted)
    pub completed: bool,

    /// Whether every worker exited cleanly
    pub success: bool,
}

/// Coordinates the parallel tree walk
pub struct WalkCoordinator {
    config: Arc<WalkConfig>,
    queue: WorkQueue,
    workers: Vec<Worker>,
    shutdown: Arc<AtomicBool>,
    known: Option<Arc<HashSet<String>>>,
    progress: Option<ProgressReporter>,
}

impl WalkCoordinator {
    /// Create a new walk coordinator
    pub fn new(config: WalkConfig) -> Result<Self> {
        config.validate()?;
        let queue = WorkQueue::new(config.queue_size);

        Ok(Self {
            config: Arc::new(config),
            queue,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            known: None,
            progress: None,
        })
    }

    /// Skip emitting these paths (still descend into them)
    pub fn with_known_paths(mut self, known: HashSet<String>) -> Self {
        debug!(count = known.len(), "Loaded known paths");
        self.known = Some(Arc::new(known));
        self
    }

    /// Drive a progress display while waiting
    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Snapshot of the walk so far
    pub fn progress(&self, elapsed: Duration) -> WalkProgress {
        let totals = aggregate_stats(&self.workers);
        WalkProgress {
            dirs: totals.dirs,
            files: totals.files,
            bytes: totals.bytes,
            queue_size: self.queue.len(),
            active_workers: self.queue.active_workers(),
            total_workers: self.workers.len(),
            errors: totals.errors,
            elapsed,
        }
    }

    /// Run the walk, feeding every record to `sink`
    ///
    /// The sink is handed back after `record_summary` and `finish` have run.
    pub fn run<S: RecordSink>(mut self, sink: S) -> Result<(WalkResult, S)> {
        let root = self
            .config
            .root
            .canonicalize()
            .map_err(|e| ConfigError::InvalidRoot {
                path: self.config.root.clone(),
                reason: e.to_string(),
            })?;

        let start_time = Instant::now();
        let started_at = Utc::now();

        info!(
            root = %root.display(),
            workers = self.config.worker_count,
            "Starting walk"
        );

        let writer = BatchedWriter::new(
            sink,
            self.config.batch_size,
            self.config.batch_size * 2, // Channel size = 2x batch size
        )?;

        let writer_stats = writer.shared_stats();

        self.queue.seed(root.clone())?;
        if let Err(e) = self.spawn_workers(&writer) {
            if let Err(writer_err) = self.abort_start(writer) {
                warn!(error = %writer_err, "Writer failed during aborted start");
            }
            return Err(e);
        }

        let completed = self.wait_for_completion(start_time);

        // Idle workers exit on the drained signal; this stops the rest
        self.shutdown.store(true, Ordering::SeqCst);

        let (totals, success) = self.join_workers();

        // The last partial batch is only flushed by finish
        let mut sink = writer.finish()?;
        let duration = start_time.elapsed();

        let result = WalkResult {
            root,
            total_dirs: totals.dirs,
            total_files: totals.files,
            total_bytes: totals.bytes,
            records_emitted: totals.records,
            records_written: writer_stats.records_written(),
            records_ignored: writer_stats.records_ignored(),
            errors: totals.errors,
            skipped: totals.skipped,
            worker_count: self.config.worker_count,
            started_at,
            duration,
            completed,
            success,
        };

        sink.record_summary(&result)?;
        sink.finish()?;

        if let Some(p) = &self.progress {
            p.finish(if completed {
                "Walk completed"
            } else {
                "Walk interrupted"
            });
        }

        info!(
            dirs = result.total_dirs,
            files = result.total_files,
            records = result.records_emitted,
            errors = result.errors,
            duration_secs = duration.as_secs(),
            "Walk finished"
        );

        Ok((result, sink))
    }

    fn spawn_workers<S: RecordSink>(&mut self, writer: &BatchedWriter<S>) -> Result<()> {
        for id in 0..self.config.worker_count {
            let ctx = WorkerContext {
                config: Arc::clone(&self.config),
                queue_tx: self.queue.sender(),
                writer: writer.handle(),
                known: self.known.clone(),
            };
            let worker = Worker::spawn(id, ctx, self.queue.receiver(), Arc::clone(&self.shutdown))?;
            self.workers.push(worker);
        }

        debug!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Stop and join whatever was started before a failed start
    fn abort_start<S: RecordSink>(&mut self, writer: BatchedWriter<S>) -> ExportResult<S> {
        self.shutdown.store(true, Ordering::SeqCst);
        let (_, success) = self.join_workers();
        debug!(success, "Workers stopped after failed start");
        writer.finish()
    }

    /// Wait for the queue to drain; false if interrupted
    fn wait_for_completion(&self, start_time: Instant) -> bool {
        loop {
            if self.queue.wait_drained(CHECK_INTERVAL) {
                return true;
            }

            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown signal received");
                if let Some(p) = &self.progress {
                    p.set_status("Stopping workers...");
                }
                return false;
            }

            // A worker that died early leaves its task pending forever
            if self.workers.iter().any(Worker::is_finished) {
                if self.queue.is_drained() {
                    return true;
                }
                warn!("Worker exited before the walk drained");
                return false;
            }

            if let Some(p) = &self.progress {
                p.update(&self.progress(start_time.elapsed()));
            }
        }
    }

    /// Join all workers; the flag is the AND of their exit status
    fn join_workers(&mut self) -> (StatsTotals, bool) {
        // Stats must be read before the workers are consumed
        let totals = aggregate_stats(&self.workers);

        let mut success = true;
        for worker in std::mem::take(&mut self.workers) {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = id, error = %e, "Worker failed");
                success = false;
            }
        }

        (totals, success)
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct WalkProgress {
    /// Directories listed
    pub dirs: u64,

    /// Files found
    pub files: u64,

    /// Bytes found
    pub bytes: u64,

    /// Current queue length
    pub queue_size: usize,

    /// Workers holding a task
    pub active_workers: usize,

    /// Total workers
    pub total_workers: usize,

    /// Errors encountered
    pub errors: u64,

    /// Elapsed time
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }

    /// Calculate dirs per second rate
    pub fn dirs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dirs as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{self, keys};
    use crate::error::{ExportError, WalkerError};
    use crate::export::{ResultSet, SqliteExporter};
    use crate::fs::PathRecord;
    use std::fs;
    use tempfile::tempdir;

    /// Sink that refuses every batch
    struct RejectingSink;

    impl RecordSink for RejectingSink {
        fn write_batch(&mut self, _batch: &[PathRecord]) -> ExportResult<usize> {
            Err(ExportError::Schema("read-only".into()))
        }
    }

    #[test]
    fn test_walk_progress_rates() {
        let progress = WalkProgress {
            dirs: 1000,
            files: 10000,
            bytes: 1024 * 1024 * 100,
            queue_size: 500,
            active_workers: 4,
            total_workers: 8,
            errors: 5,
            elapsed: Duration::from_secs(10),
        };

        assert!((progress.files_per_second() - 1000.0).abs() < 0.1);
        assert!((progress.dirs_per_second() - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_zero_elapsed_rates() {
        let progress = WalkProgress {
            dirs: 1,
            files: 1,
            bytes: 0,
            queue_size: 0,
            active_workers: 0,
            total_workers: 1,
            errors: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.files_per_second(), 0.0);
    }

    #[test]
    fn test_run_reports_totals() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/one"), b"1").unwrap();
        fs::write(dir.path().join("a/b/two"), b"22").unwrap();

        let mut config = WalkConfig::new(dir.path());
        config.worker_count = 3;

        let (result, set) = WalkCoordinator::new(config)
            .unwrap()
            .run(ResultSet::new())
            .unwrap();

        assert!(result.completed);
        assert!(result.success);
        assert_eq!(result.total_files, 2);
        assert_eq!(result.total_bytes, 3);
        assert_eq!(result.total_dirs, 3);
        assert_eq!(result.records_emitted, 2);
        assert_eq!(result.records_written, 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_known_paths_are_not_emitted() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/old"), b"").unwrap();
        fs::write(dir.path().join("sub/new"), b"").unwrap();

        let old = dir.path().canonicalize().unwrap().join("sub/old");
        let known: HashSet<String> = [old.to_string_lossy().into_owned()].into();

        let (result, set) = WalkCoordinator::new(WalkConfig::new(dir.path()))
            .unwrap()
            .with_known_paths(known)
            .run(ResultSet::new())
            .unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.records()[0].path.ends_with("new"));
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_missing_root_rejected() {
        let dir = tempdir().unwrap();
        let err = WalkCoordinator::new(WalkConfig::new(dir.path().join("nope")))
            .err()
            .unwrap();
        assert!(matches!(err, WalkerError::Config(ConfigError::InvalidRoot { .. })));
    }

    #[test]
    fn test_preset_shutdown_interrupts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), b"").unwrap();

        let coordinator = WalkCoordinator::new(WalkConfig::new(dir.path())).unwrap();
        coordinator.shutdown_flag().store(true, Ordering::SeqCst);
        let (result, _) = coordinator.run(ResultSet::new()).unwrap();

        // Workers see the flag before taking any task
        assert!(result.success);
        assert!(!result.completed);
        assert_eq!(result.records_emitted, 0);
    }

    #[test]
    fn test_write_counts_include_final_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one"), b"1").unwrap();
        fs::write(dir.path().join("two"), b"2").unwrap();

        // Two records never fill a batch, so only finish flushes them
        let sink = SqliteExporter::open_in_memory().unwrap();
        let (result, sink) = WalkCoordinator::new(WalkConfig::new(dir.path()))
            .unwrap()
            .run(sink)
            .unwrap();

        assert_eq!(result.records_emitted, 2);
        assert_eq!(result.records_written, 2);
        assert_eq!(result.records_ignored, 0);
        assert_eq!(sink.inserted(), 2);
        assert_eq!(
            schema::get_walk_info(sink.connection(), keys::RECORDS_INSERTED)
                .unwrap()
                .as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_lost_record_channel_fails_the_pool() {
        let dir = tempdir().unwrap();
        for i in 0..200 {
            fs::write(dir.path().join(format!("f{}", i)), b"x").unwrap();
        }

        let mut config = WalkConfig::new(dir.path());
        config.worker_count = 2;
        config.hash_content = false;
        let mut coordinator = WalkCoordinator::new(config).unwrap();

        // The writer thread exits on the first batch, dropping the channel
        let writer = BatchedWriter::new(RejectingSink, 1, 1).unwrap();
        coordinator
            .queue
            .seed(dir.path().canonicalize().unwrap())
            .unwrap();
        coordinator.spawn_workers(&writer).unwrap();

        let completed = coordinator.wait_for_completion(Instant::now());
        coordinator.shutdown.store(true, Ordering::SeqCst);
        let (_, success) = coordinator.join_workers();

        assert!(!completed);
        assert!(!success);
        assert!(matches!(writer.finish(), Err(ExportError::Schema(_))));
    }

    #[test]
    fn test_aborted_start_joins_workers_and_writer() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/f"), b"x").unwrap();

        let mut config = WalkConfig::new(dir.path());
        config.worker_count = 3;
        let mut coordinator = WalkCoordinator::new(config).unwrap();

        let writer = BatchedWriter::new(ResultSet::new(), 10, 20).unwrap();
        let handle = writer.handle();
        coordinator
            .queue
            .seed(dir.path().canonicalize().unwrap())
            .unwrap();
        coordinator.spawn_workers(&writer).unwrap();

        let set = coordinator.abort_start(writer).unwrap();

        assert!(coordinator.workers.is_empty());
        assert!(coordinator.shutdown.load(Ordering::SeqCst));
        assert!(set.len() <= 1);
        // The writer thread is gone, so its channel is closed
        assert!(handle.send_record(PathRecord::partial(dir.path(), 0, "late")).is_err());
    }

    #[test]
    fn test_failing_sink_fails_the_run() {
        let dir = tempdir().unwrap();
        for i in 0..50 {
            fs::write(dir.path().join(format!("f{}", i)), b"x").unwrap();
        }

        let mut config = WalkConfig::new(dir.path());
        config.batch_size = 1;
        let err = WalkCoordinator::new(config)
            .unwrap()
            .run(RejectingSink)
            .err()
            .unwrap();

        assert!(matches!(err, WalkerError::Export(ExportError::Schema(_))));
    }
}
