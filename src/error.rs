//! Error types for examinator
//!
//! This module defines the error hierarchy for:
//! - Walk configuration and CLI errors
//! - Worker thread errors
//! - Content hashing errors
//! - CSV and SQLite export errors
//! - Network probe errors (ubrl)
//!
//! Per-path failures during a walk are not errors at this level: they are
//! folded into partial `PathRecord`s and the walk continues.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the examinator library
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Export errors (CSV, SQLite)
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Hashing errors
    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    /// Network probe errors
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by signal
    #[error("Operation interrupted by signal")]
    Interrupted,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Walk root missing or unreadable
    #[error("Invalid root path '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue bound
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Invalid hash block size
    #[error("Invalid block size {size}: must be between {min} and {max} bytes")]
    InvalidBlockSize { size: usize, min: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Option combination that cannot work
    #[error("Conflicting options: {0}")]
    Conflict(String),
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Work queue send failed
    #[error("Failed to send work item: queue closed")]
    QueueSendFailed,

    /// Record channel closed (writer thread gone)
    #[error("Worker {id} lost its record channel")]
    ResultChannelClosed { id: usize },

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// Content hashing errors
#[derive(Error, Debug)]
pub enum HashError {
    /// Directories carry no content digest
    #[error("'{path}' is a directory and will not be hashed")]
    IsDirectory { path: PathBuf },

    /// Open or read failure
    #[error("Failed to hash '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Export errors for CSV and SQLite sinks
#[derive(Error, Debug)]
pub enum ExportError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create the output
    #[error("Failed to create output at '{path}': {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// Schema error
    #[error("Database schema error: {0}")]
    Schema(String),

    /// Writer channel closed unexpectedly
    #[error("Writer channel closed unexpectedly")]
    ChannelClosed,

    /// Writer thread panicked
    #[error("Writer thread panicked")]
    WriterPanicked,
}

/// Network probe errors (DNS, URL parsing)
#[derive(Error, Debug)]
pub enum ProbeError {
    /// DNS lookup returned nothing usable
    #[error("No address found for '{target}'")]
    NoAddress { target: String },

    /// URL could not be parsed
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// System ping could not be run
    #[error("Failed to run ping: {0}")]
    Ping(String),
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Result type alias for ExportError
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Result type alias for HashError
pub type HashResult<T> = std::result::Result<T, HashError>;

/// Result type alias for ProbeError
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Represents the outcome of processing a single path
#[derive(Debug)]
pub enum WalkOutcome {
    /// Entry processed; `children` subpaths were queued
    Success { path: String, children: usize },

    /// Skipped by filter or because it is already known
    Skipped { path: String, reason: String },

    /// Processed with an error folded into a partial record
    Partial { path: String, error: String },
}

impl WalkOutcome {
    /// Returns true if this outcome represents success
    pub fn is_success(&self) -> bool {
        matches!(self, WalkOutcome::Success { .. })
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &str {
        match self {
            WalkOutcome::Success { path, .. } => path,
            WalkOutcome::Skipped { path, .. } => path,
            WalkOutcome::Partial { path, .. } => path,
        }
    }
}
