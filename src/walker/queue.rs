//! Work queue with quiescence tracking
//!
//! Pending paths flow through a crossbeam channel (bounded only when an
//! explicit size is configured). Completion is tracked with a pending
//! counter rather than by polling the queue length:
//!
//! - a task is registered *before* it is published
//! - it is completed only after it has been processed, which includes
//!   registering all of its children
//!
//! The counter therefore reaches zero exactly once, when the queue is empty
//! and no worker holds a task. On that transition the drained signal fires
//! (the `done` sender is dropped) and every blocked receiver wakes up.
//!
//! When a bounded queue is full the task is handed back to the caller,
//! which keeps it on a local stack and processes it inline.

use crate::error::WorkerError;
use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A path waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTask {
    /// Absolute path
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,
}

impl PathTask {
    /// Create a new task
    pub fn new(path: PathBuf, depth: u32) -> Self {
        Self { path, depth }
    }

    /// Create the root task
    pub fn root(path: PathBuf) -> Self {
        Self { path, depth: 0 }
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,

    /// Tasks processed inline because the queue was full
    pub inline_processed: AtomicU64,

    /// Number of times a full queue refused a task
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (dequeued tasks)
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get number of inline-processed tasks
    pub fn inline_count(&self) -> u64 {
        self.inline_processed.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

/// Pending-task counter with a one-shot drained signal
#[derive(Debug)]
struct Quiescence {
    pending: AtomicUsize,
    done: Mutex<Option<Sender<()>>>,
}

impl Quiescence {
    fn register(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn complete(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Dropping the sender disconnects every drained receiver
            self.done.lock().take();
        }
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Result of waiting on the queue
#[derive(Debug)]
pub enum Next {
    /// A task to process
    Task(PathTask),
    /// All work is finished
    Drained,
    /// Nothing arrived within the timeout
    Idle,
}

/// Work queue with completion tracking
pub struct WorkQueue {
    /// Sender for adding tasks
    sender: Sender<PathTask>,

    /// Receiver for getting tasks
    receiver: Receiver<PathTask>,

    /// Disconnects when the walk drains
    done_rx: Receiver<()>,

    /// Queue capacity (None = unbounded)
    capacity: Option<usize>,

    /// Number of workers holding a task
    active_workers: Arc<AtomicUsize>,

    /// Pending counter
    tracker: Arc<Quiescence>,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new work queue, bounded when `capacity` is set
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let (done_tx, done_rx) = bounded(0);

        Self {
            sender,
            receiver,
            done_rx,
            capacity,
            active_workers: Arc::new(AtomicUsize::new(0)),
            tracker: Arc::new(Quiescence {
                pending: AtomicUsize::new(0),
                done: Mutex::new(Some(done_tx)),
            }),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender for this queue (clone for each worker)
    pub fn sender(&self) -> WorkQueueSender {
        WorkQueueSender {
            sender: self.sender.clone(),
            tracker: Arc::clone(&self.tracker),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> WorkQueueReceiver {
        WorkQueueReceiver {
            receiver: self.receiver.clone(),
            done_rx: self.done_rx.clone(),
            active_workers: Arc::clone(&self.active_workers),
            tracker: Arc::clone(&self.tracker),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Get queue capacity
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Tasks registered but not yet completed
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    /// Workers currently holding a task
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Seed the queue with the root path
    pub fn seed(&self, root: PathBuf) -> Result<(), WorkerError> {
        self.tracker.register();
        self.sender.try_send(PathTask::root(root)).map_err(|_| {
            self.tracker.complete();
            WorkerError::QueueSendFailed
        })?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Check if all work is complete (drained signal has fired)
    pub fn is_drained(&self) -> bool {
        matches!(
            self.done_rx.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }

    /// Block up to `timeout` for the drained signal
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        matches!(
            self.done_rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Handle for sending tasks to the queue
#[derive(Clone)]
pub struct WorkQueueSender {
    sender: Sender<PathTask>,
    tracker: Arc<Quiescence>,
    stats: Arc<QueueStats>,
}

impl WorkQueueSender {
    /// Register and publish a task
    ///
    /// Returns `Ok(None)` if queued, `Ok(Some(task))` if the bounded queue
    /// is full: the task stays registered and the caller must process it.
    pub fn offer(&self, task: PathTask) -> Result<Option<PathTask>, WorkerError> {
        self.tracker.register();
        match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(TrySendError::Full(task)) => {
                self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);
                Ok(Some(task))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.tracker.complete();
                Err(WorkerError::QueueSendFailed)
            }
        }
    }

    /// Record that a task was processed inline (for stats)
    pub fn record_inline(&self) {
        self.stats.inline_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle for receiving tasks from the queue
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<PathTask>,
    done_rx: Receiver<()>,
    active_workers: Arc<AtomicUsize>,
    tracker: Arc<Quiescence>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Wait for a task, the drained signal, or the timeout
    pub fn next(&self, timeout: Duration) -> Next {
        select! {
            recv(self.receiver) -> msg => match msg {
                Ok(task) => {
                    self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                    Next::Task(task)
                }
                Err(_) => Next::Drained,
            },
            recv(self.done_rx) -> _ => Next::Drained,
            default(timeout) => Next::Idle,
        }
    }

    /// Try to receive a task without blocking
    pub fn try_recv(&self) -> Option<PathTask> {
        match self.receiver.try_recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Mark this worker as active
    fn begin_work(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark this worker as idle and complete the held task
    fn end_work(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
        self.tracker.complete();
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// RAII guard for a held task
///
/// Dropping the guard completes the task, so it must outlive the
/// registration of every child.
pub struct WorkGuard<'a> {
    receiver: &'a WorkQueueReceiver,
}

impl<'a> WorkGuard<'a> {
    /// Create a new work guard (marks worker as active)
    pub fn new(receiver: &'a WorkQueueReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl<'a> Drop for WorkGuard<'a> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}
