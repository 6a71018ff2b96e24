//! Batched record writer
//!
//! Runs in a dedicated thread, receives records from workers over a bounded
//! channel, and hands them to a `RecordSink` in batches. A single writer
//! means sinks never need to be thread-safe.

use crate::error::{ExportError, ExportResult};
use crate::export::RecordSink;
use crate::fs::PathRecord;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Flush whatever is buffered after this long without a message
const IDLE_FLUSH: Duration = Duration::from_millis(100);

/// Message types sent to the writer thread
#[derive(Debug)]
pub enum WriterMessage {
    /// Store a record
    Record(PathRecord),

    /// Flush pending writes
    Flush,

    /// Flush and stop
    Shutdown,
}

/// Statistics about write operations
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Records received from workers
    pub records_received: AtomicU64,

    /// Records the sink reported as newly stored
    pub records_written: AtomicU64,

    /// Records the sink already had
    pub records_ignored: AtomicU64,

    /// Batches handed to the sink
    pub batches_committed: AtomicU64,
}

impl WriterStats {
    pub fn records_received(&self) -> u64 {
        self.records_received.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn records_ignored(&self) -> u64 {
        self.records_ignored.load(Ordering::Relaxed)
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }
}

/// Handle for sending messages to the writer
#[derive(Clone)]
pub struct WriterHandle {
    sender: Sender<WriterMessage>,
    stats: Arc<WriterStats>,
}

impl WriterHandle {
    /// Send a record to be written (blocks while the channel is full)
    pub fn send_record(&self, record: PathRecord) -> ExportResult<()> {
        self.sender
            .send(WriterMessage::Record(record))
            .map_err(|_| ExportError::ChannelClosed)
    }

    /// Request a flush of pending writes
    pub fn flush(&self) -> ExportResult<()> {
        self.sender
            .send(WriterMessage::Flush)
            .map_err(|_| ExportError::ChannelClosed)
    }

    fn shutdown(&self) -> ExportResult<()> {
        self.sender
            .send(WriterMessage::Shutdown)
            .map_err(|_| ExportError::ChannelClosed)
    }

    /// Get writer statistics
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}

/// Batched writer that owns a sink on its own thread
pub struct BatchedWriter<S: RecordSink> {
    handle: Option<JoinHandle<ExportResult<S>>>,
    writer_handle: WriterHandle,
}

impl<S: RecordSink> BatchedWriter<S> {
    /// Spawn the writer thread
    pub fn new(sink: S, batch_size: usize, channel_size: usize) -> ExportResult<Self> {
        let (sender, receiver) = bounded(channel_size.max(1));
        let stats = Arc::new(WriterStats::default());

        let writer_handle = WriterHandle {
            sender,
            stats: Arc::clone(&stats),
        };

        let batch_size = batch_size.max(1);
        let handle = thread::Builder::new()
            .name("record-writer".into())
            .spawn(move || writer_thread(sink, receiver, stats, batch_size))?;

        Ok(Self {
            handle: Some(handle),
            writer_handle,
        })
    }

    /// Get a handle for sending messages to the writer
    pub fn handle(&self) -> WriterHandle {
        self.writer_handle.clone()
    }

    /// Get writer statistics
    pub fn stats(&self) -> &WriterStats {
        self.writer_handle.stats()
    }

    /// Shared statistics, still readable after `finish` consumes the writer
    pub fn shared_stats(&self) -> Arc<WriterStats> {
        Arc::clone(&self.writer_handle.stats)
    }

    /// Flush remaining records, stop the thread, and give the sink back
    pub fn finish(mut self) -> ExportResult<S> {
        // The thread may already have exited on a sink error
        let _ = self.writer_handle.shutdown();

        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ExportError::WriterPanicked)?,
            None => Err(ExportError::WriterPanicked),
        }
    }
}

fn writer_thread<S: RecordSink>(
    mut sink: S,
    receiver: Receiver<WriterMessage>,
    stats: Arc<WriterStats>,
    batch_size: usize,
) -> ExportResult<S> {
    let mut buffer: Vec<PathRecord> = Vec::with_capacity(batch_size);

    loop {
        match receiver.recv_timeout(IDLE_FLUSH) {
            Ok(WriterMessage::Record(record)) => {
                stats.records_received.fetch_add(1, Ordering::Relaxed);
                buffer.push(record);

                if buffer.len() >= batch_size {
                    flush_batch(&mut sink, &mut buffer, &stats)?;
                }
            }
            Ok(WriterMessage::Flush) => flush_batch(&mut sink, &mut buffer, &stats)?,
            Ok(WriterMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                flush_batch(&mut sink, &mut buffer, &stats)?;
                break;
            }
            Err(RecvTimeoutError::Timeout) => flush_batch(&mut sink, &mut buffer, &stats)?,
        }
    }

    debug!(
        received = stats.records_received(),
        written = stats.records_written(),
        ignored = stats.records_ignored(),
        batches = stats.batches_committed(),
        "Writer finished"
    );

    Ok(sink)
}

fn flush_batch<S: RecordSink>(
    sink: &mut S,
    buffer: &mut Vec<PathRecord>,
    stats: &WriterStats,
) -> ExportResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    let inserted = sink.write_batch(buffer)?;
    let ignored = buffer.len().saturating_sub(inserted);

    stats
        .records_written
        .fetch_add(inserted as u64, Ordering::Relaxed);
    stats
        .records_ignored
        .fetch_add(ignored as u64, Ordering::Relaxed);
    stats.batches_committed.fetch_add(1, Ordering::Relaxed);

    trace!(batch = buffer.len(), inserted, "Batch committed");
    buffer.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ResultSet;
    use std::path::Path;

    fn record(path: &str) -> PathRecord {
        let mut r = PathRecord::partial(Path::new(path), 1, "");
        r.error = None;
        r
    }

    #[test]
    fn test_writer_batches_and_returns_sink() {
        let writer = BatchedWriter::new(ResultSet::new(), 10, 100).unwrap();
        let handle = writer.handle();

        for i in 0..25 {
            handle.send_record(record(&format!("/f{}", i))).unwrap();
        }

        let set = writer.finish().unwrap();
        assert_eq!(set.len(), 25);
    }

    #[test]
    fn test_writer_stats() {
        let writer = BatchedWriter::new(ResultSet::new(), 4, 16).unwrap();
        let handle = writer.handle();

        for i in 0..10 {
            handle.send_record(record(&format!("/f{}", i))).unwrap();
        }
        handle.flush().unwrap();

        let stats = writer.shared_stats();
        let set = writer.finish().unwrap();

        assert_eq!(set.len(), 10);
        assert_eq!(stats.records_received(), 10);
        assert_eq!(stats.records_written(), 10);
        assert_eq!(stats.records_ignored(), 0);
        assert!(stats.batches_committed() >= 3);
    }

    #[test]
    fn test_final_batch_counted_after_finish() {
        // Nothing reaches the sink until shutdown flushes the partial batch
        let writer = BatchedWriter::new(ResultSet::new(), 1000, 2000).unwrap();
        let handle = writer.handle();
        handle.send_record(record("/a")).unwrap();
        handle.send_record(record("/b")).unwrap();

        let stats = writer.shared_stats();
        let set = writer.finish().unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(stats.records_written(), 2);
        assert!(stats.batches_committed() >= 1);
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn write_batch(&mut self, _batch: &[PathRecord]) -> ExportResult<usize> {
            Err(ExportError::Schema("disk gone".into()))
        }
    }

    #[test]
    fn test_sink_error_surfaces_on_finish() {
        let writer = BatchedWriter::new(FailingSink, 1, 4).unwrap();
        let handle = writer.handle();
        handle.send_record(record("/x")).unwrap();

        let err = writer.finish().err().unwrap();
        assert!(matches!(err, ExportError::Schema(_)));
    }
}
