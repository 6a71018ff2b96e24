//! examinator - concurrent filesystem walker
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use examinator::config::{CliArgs, OutputFormat, WalkConfig};
use examinator::export::{CsvExporter, RecordSink, ResultSet, SqliteExporter};
use examinator::progress::{print_header, print_summary, ProgressReporter};
use examinator::walker::{WalkCoordinator, WalkResult};
use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the walk drained with every worker succeeding
fn run() -> Result<bool> {
    let args = CliArgs::parse();
    setup_logging(args.verbose)?;

    let config = WalkConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &config.root.display().to_string(),
            config.worker_count,
            &config.output_path.display().to_string(),
        );
    }

    let result = match config.output_format {
        OutputFormat::Sqlite => {
            let sink = SqliteExporter::open(&config.output_path)
                .context("Failed to open database")?;
            let known = if config.skip_known {
                let known = sink.known_paths().context("Failed to load known paths")?;
                info!(count = known.len(), "Skipping paths already stored");
                Some(known)
            } else {
                None
            };
            let (result, _) = run_walk(&config, sink, known)?;
            report(&config, &result);
            result
        }
        OutputFormat::Csv => {
            let sink = CsvExporter::create(&config.output_path)
                .context("Failed to create CSV file")?;
            let (result, _) = run_walk(&config, sink, None)?;
            report(&config, &result);
            result
        }
        OutputFormat::Table => {
            let (result, mut records) = run_walk(&config, ResultSet::new(), None)?;
            records.sort_by_path();
            print!("{}", records.to_table());
            result
        }
    };

    if !result.completed {
        warn!("Walk was interrupted before completion");
    }
    if result.errors > 0 {
        info!(errors = result.errors, "Walk finished with errors");
    }

    Ok(result.completed && result.success)
}

fn run_walk<S: RecordSink>(
    config: &WalkConfig,
    sink: S,
    known: Option<HashSet<String>>,
) -> Result<(WalkResult, S)> {
    let mut coordinator =
        WalkCoordinator::new(config.clone()).context("Failed to initialize walker")?;

    if let Some(known) = known {
        coordinator = coordinator.with_known_paths(known);
    }
    if config.show_progress {
        coordinator = coordinator.with_progress(ProgressReporter::new());
    }

    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    coordinator.run(sink).context("Walk failed")
}

fn report(config: &WalkConfig, result: &WalkResult) {
    if !config.show_progress {
        return;
    }
    let output_size = std::fs::metadata(&config.output_path).ok().map(|m| m.len());
    print_summary(
        result,
        &config.output_path.display().to_string(),
        output_size,
    );
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("examinator=debug,warn")
    } else {
        EnvFilter::new("examinator=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
