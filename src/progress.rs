//! Terminal output for the walker: a live spinner and the closing report

use crate::walker::{WalkProgress, WalkResult};
use console::{style, StyledObject};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Width the report labels are padded to
const LABEL_WIDTH: usize = 10;

/// Live spinner driven by the coordinator's wait loop
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {elapsed:>4} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    pub fn update(&self, progress: &WalkProgress) {
        let mut msg = format!(
            "{} files in {} dirs, {} ({:.0} files/s), queued {}, busy {}/{}",
            format_number(progress.files),
            format_number(progress.dirs),
            format_size(progress.bytes, BINARY),
            progress.files_per_second(),
            format_number(progress.queue_size as u64),
            progress.active_workers,
            progress.total_workers,
        );
        if progress.errors > 0 {
            msg.push_str(&format!(", {} errors", format_number(progress.errors)));
        }

        self.bar.set_message(msg);
    }

    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Group digits in threes: `1234567` -> `1,234,567`
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<width$} {}", style(label).dim(), value, width = LABEL_WIDTH);
}

fn rule() -> StyledObject<String> {
    style("=".repeat(40)).dim()
}

/// Lines of the closing report, without styling
fn summary_lines(
    result: &WalkResult,
    output: &str,
    output_size: Option<u64>,
) -> Vec<(&'static str, String)> {
    let secs = result.duration.as_secs_f64();
    let rate = if secs > 0.0 {
        result.total_files as f64 / secs
    } else {
        0.0
    };

    let mut lines = vec![
        ("root", result.root.display().to_string()),
        (
            "scanned",
            format!(
                "{} files, {} dirs, {}",
                format_number(result.total_files),
                format_number(result.total_dirs),
                format_size(result.total_bytes, BINARY)
            ),
        ),
        (
            "records",
            format!(
                "{} emitted, {} new, {} already stored",
                format_number(result.records_emitted),
                format_number(result.records_written),
                format_number(result.records_ignored)
            ),
        ),
    ];
    if result.skipped > 0 {
        lines.push(("skipped", format_number(result.skipped)));
    }
    if result.errors > 0 {
        lines.push(("errors", format_number(result.errors)));
    }
    lines.push((
        "elapsed",
        format!("{:.2}s, {:.0} files/s, {} workers", secs, rate, result.worker_count),
    ));
    lines.push((
        "output",
        match output_size {
            Some(size) => format!("{} ({})", output, format_size(size, BINARY)),
            None => output.to_string(),
        },
    ));
    lines
}

/// Print the closing report for a walk
pub fn print_summary(result: &WalkResult, output: &str, output_size: Option<u64>) {
    let status = match (result.completed, result.success) {
        (true, true) => style("done").green().bold(),
        (true, false) => style("done, with worker failures").red().bold(),
        (false, _) => style("interrupted").yellow().bold(),
    };

    println!();
    println!("{} {}", style("examinator").bold(), status);
    println!("{}", rule());
    for (label, value) in summary_lines(result, output, output_size) {
        field(label, value);
    }
    println!();
}

/// Print the run parameters before the walk starts
pub fn print_header(root: &str, workers: usize, output: &str) {
    println!(
        "{} {} {}",
        style("examinator").bold(),
        style(env!("CARGO_PKG_VERSION")).dim(),
        style(format!("[{} workers]", workers)).cyan()
    );
    println!("{}", rule());
    field("root", root);
    field("output", output);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn result() -> WalkResult {
        WalkResult {
            root: PathBuf::from("/data"),
            total_dirs: 12,
            total_files: 3400,
            total_bytes: 2048,
            records_emitted: 3400,
            records_written: 3000,
            records_ignored: 400,
            errors: 0,
            skipped: 0,
            worker_count: 8,
            started_at: Utc::now(),
            duration: Duration::from_secs(2),
            completed: true,
            success: true,
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary_lines(&result(), "out.db", Some(4096));
        let labels: Vec<&str> = lines.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["root", "scanned", "records", "elapsed", "output"]);
        assert_eq!(lines[2].1, "3,400 emitted, 3,000 new, 400 already stored");
        assert_eq!(lines[3].1, "2.00s, 1700 files/s, 8 workers");
        assert_eq!(lines[4].1, "out.db (4 KiB)");
    }

    #[test]
    fn test_summary_lists_errors_and_skips() {
        let mut r = result();
        r.errors = 3;
        r.skipped = 1200;
        let lines = summary_lines(&r, "out.csv", None);
        assert!(lines.contains(&("skipped", "1,200".to_string())));
        assert!(lines.contains(&("errors", "3".to_string())));
        assert_eq!(lines.last().unwrap().1, "out.csv");
    }
}
