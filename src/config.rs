//! Configuration types for examinator
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Output format selection

use crate::content::DEFAULT_BLOCK_SIZE;
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Minimum explicit queue bound
const MIN_QUEUE_SIZE: usize = 1;

/// Batch size limits
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 100_000;

/// Hash block size limits
const MIN_BLOCK_SIZE: usize = 4 * 1024;
const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Default export batch size
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Walk a directory tree, hash files, and export the results
#[derive(Parser, Debug, Clone)]
#[command(
    name = "examinator",
    version,
    about = "Walk a directory tree concurrently, hash files, export to CSV or SQLite",
    after_help = "EXAMPLES:\n    \
        examinator ~/code -o files.db\n    \
        examinator /data -o files.csv --no-hash -w 16\n    \
        examinator . --format table --dirs -d 2\n    \
        examinator /data -o files.db --skip-known  # only new paths"
)]
pub struct CliArgs {
    /// Root directory (or file) to walk
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Output file (.csv for CSV, anything else for SQLite)
    #[arg(short, long, default_value = "examinator.db", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format (inferred from the output extension when omitted)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Bound on the pending-path queue (unbounded if not set)
    #[arg(long, value_name = "NUM")]
    pub queue_size: Option<usize>,

    /// Records per export batch
    #[arg(short = 'b', long, default_value_t = DEFAULT_BATCH_SIZE, value_name = "NUM")]
    pub batch_size: usize,

    /// Maximum directory depth (unlimited if not set)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Skip MD5 content hashing
    #[arg(long)]
    pub no_hash: bool,

    /// Read block size for hashing, in bytes
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, value_name = "BYTES")]
    pub block_size: usize,

    /// Also record directories
    #[arg(long)]
    pub dirs: bool,

    /// Exclude paths matching regex (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Skip paths already present in the output database (SQLite only)
    #[arg(long)]
    pub skip_known: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Output format for walk results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// SQLite database, one `files` table keyed by path
    Sqlite,
    /// CSV file with a header row
    Csv,
    /// Aligned table printed to stdout
    Table,
}

impl OutputFormat {
    /// Infer from the output file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
            _ => OutputFormat::Sqlite,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Sqlite => "SQLite",
            OutputFormat::Csv => "CSV",
            OutputFormat::Table => "table",
        }
    }
}

fn default_workers() -> usize {
    // Stat and read calls block on I/O, so oversubscribe
    num_cpus::get() * 2
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Walk root
    pub root: PathBuf,

    /// Output path (ignored for table output)
    pub output_path: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// Number of worker threads
    pub worker_count: usize,

    /// Optional bound on queued paths
    pub queue_size: Option<usize>,

    /// Export batch size
    pub batch_size: usize,

    /// Maximum traversal depth
    pub max_depth: Option<usize>,

    /// Hash file content
    pub hash_content: bool,

    /// Hash read block size
    pub block_size: usize,

    /// Emit directory records
    pub include_dirs: bool,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Skip paths already exported
    pub skip_known: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl WalkConfig {
    /// Library defaults for walking `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_path: PathBuf::from("examinator.db"),
            output_format: OutputFormat::Sqlite,
            worker_count: num_cpus::get().max(1),
            queue_size: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_depth: None,
            hash_content: true,
            block_size: DEFAULT_BLOCK_SIZE,
            include_dirs: false,
            exclude_patterns: Vec::new(),
            skip_known: false,
            show_progress: false,
            verbose: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output_format = args
            .format
            .unwrap_or_else(|| OutputFormat::from_path(&args.output));

        if output_format != OutputFormat::Table {
            if let Some(parent) = args.output.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidOutputPath {
                        path: args.output.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        let config = Self {
            root: args.root,
            output_path: args.output,
            output_format,
            worker_count: args.workers,
            queue_size: args.queue_size,
            batch_size: args.batch_size,
            max_depth: args.max_depth,
            hash_content: !args.no_hash,
            block_size: args.block_size,
            include_dirs: args.dirs,
            exclude_patterns,
            skip_known: args.skip_known,
            show_progress: !args.quiet && output_format != OutputFormat::Table,
            verbose: args.verbose,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and option combinations
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.exists() {
            return Err(ConfigError::InvalidRoot {
                path: self.root.clone(),
                reason: "Path does not exist".into(),
            });
        }

        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.worker_count,
                max: MAX_WORKERS,
            });
        }

        if let Some(size) = self.queue_size {
            if size < MIN_QUEUE_SIZE {
                return Err(ConfigError::InvalidQueueSize {
                    size,
                    min: MIN_QUEUE_SIZE,
                });
            }
        }

        if self.batch_size < MIN_BATCH_SIZE || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                size: self.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidBlockSize {
                size: self.block_size,
                min: MIN_BLOCK_SIZE,
                max: MAX_BLOCK_SIZE,
            });
        }

        if self.skip_known && self.output_format != OutputFormat::Sqlite {
            return Err(ConfigError::Conflict(
                "--skip-known requires SQLite output".into(),
            ));
        }

        Ok(())
    }

    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }

    /// Whether children at `depth` are within the depth limit
    pub fn within_depth(&self, depth: u32) -> bool {
        self.max_depth.map_or(true, |max| depth as usize <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(root: &Path) -> CliArgs {
        CliArgs::parse_from(["examinator", root.to_str().unwrap()])
    }

    #[test]
    fn test_defaults_from_args() {
        let dir = tempdir().unwrap();
        let config = WalkConfig::from_args(args(dir.path())).unwrap();

        assert_eq!(config.output_format, OutputFormat::Sqlite);
        assert!(config.hash_content);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.queue_size, None);
        assert!(!config.include_dirs);
        assert!(config.show_progress);
    }

    #[test]
    fn test_format_inferred_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("out.csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("out.CSV")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("out.db")), OutputFormat::Sqlite);
        assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Sqlite);
    }

    #[test]
    fn test_cli_flags() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let parsed = CliArgs::parse_from([
            "examinator",
            root,
            "--format",
            "table",
            "--no-hash",
            "--dirs",
            "-w",
            "3",
            "--queue-size",
            "50",
            "--exclude",
            r"\.git",
            "--exclude",
            "target",
        ]);
        let config = WalkConfig::from_args(parsed).unwrap();

        assert_eq!(config.output_format, OutputFormat::Table);
        assert!(!config.hash_content);
        assert!(config.include_dirs);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.queue_size, Some(50));
        assert!(!config.show_progress);
        assert!(config.is_excluded("/repo/.git/HEAD"));
        assert!(config.is_excluded("/repo/target/debug"));
        assert!(!config.is_excluded("/repo/src/main.rs"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();

        let mut config = WalkConfig::new(dir.path());
        config.worker_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));

        let mut config = WalkConfig::new(dir.path());
        config.queue_size = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQueueSize { .. })
        ));

        let mut config = WalkConfig::new(dir.path());
        config.block_size = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBlockSize { .. })
        ));

        let config = WalkConfig::new(dir.path().join("missing"));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRoot { .. })));
    }

    #[test]
    fn test_skip_known_needs_sqlite() {
        let dir = tempdir().unwrap();
        let mut config = WalkConfig::new(dir.path());
        config.skip_known = true;
        assert!(config.validate().is_ok());

        config.output_format = OutputFormat::Csv;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(_))));
    }

    #[test]
    fn test_bad_exclude_pattern() {
        let dir = tempdir().unwrap();
        let parsed = CliArgs::parse_from([
            "examinator",
            dir.path().to_str().unwrap(),
            "--exclude",
            "(unclosed",
        ]);
        assert!(matches!(
            WalkConfig::from_args(parsed),
            Err(ConfigError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_within_depth() {
        let dir = tempdir().unwrap();
        let mut config = WalkConfig::new(dir.path());
        assert!(config.within_depth(100));

        config.max_depth = Some(2);
        assert!(config.within_depth(2));
        assert!(!config.within_depth(3));
    }
}
