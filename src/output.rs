//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Listing
//!
//! ```text
//! holiday (3 images)
//! 001 beach.jpg  1200×800  512 KB
//! 002 broken.jpg  (dimensions unavailable)  21 B
//! 003 trips/dunes.jpg  4000×3000  3.1 MB
//! ```
//!
//! ## Apply
//!
//! ```text
//! 001 crop beach.jpg
//!     → out/beach.jpg-3f2a9c0d1e4b5a69.jpg
//! 002 pick missing.jpg
//!     failed: source file not found: photos/missing.jpg
//! 003 pick dunes.jpg
//!     cancelled
//!
//! Applied 1 of 3 operations (1 failed, 1 cancelled)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! do no I/O.

use crate::apply::{BatchReport, OperationStatus};
use crate::listing::Directory;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte size.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a directory listing, one line per image.
pub fn format_listing(dir: &Directory) -> Vec<String> {
    let mut lines = vec![format!("{} ({} images)", dir.name, dir.files.len())];
    for (i, file) in dir.files.iter().enumerate() {
        let dims = match file.image {
            Some(d) => format!("{}\u{00d7}{}", d.width, d.height),
            None => "(dimensions unavailable)".to_string(),
        };
        lines.push(format!(
            "{} {}  {}  {}",
            format_index(i + 1),
            file.name,
            dims,
            format_size(file.size_bytes)
        ));
    }
    lines
}

/// Print a directory listing to stdout.
pub fn print_listing(dir: &Directory) {
    for line in format_listing(dir) {
        println!("{}", line);
    }
}

/// Format a batch report: one entry per operation plus a summary line.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in &report.outcomes {
        lines.push(format!(
            "{} {} {}",
            format_index(outcome.index + 1),
            outcome.kind,
            outcome.filename
        ));
        let detail = match &outcome.status {
            OperationStatus::Succeeded { output } => format!("\u{2192} {}", output.display()),
            OperationStatus::Failed { error } => format!("failed: {}", error),
            OperationStatus::Cancelled => "cancelled".to_string(),
        };
        lines.push(format!("    {}", detail));
    }

    let total = report.outcomes.len();
    let (failed, cancelled) = (report.failed(), report.cancelled());
    let mut summary = format!("Applied {} of {} operations", report.succeeded(), total);
    if failed > 0 || cancelled > 0 {
        summary.push_str(&format!(" ({} failed, {} cancelled)", failed, cancelled));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(summary);
    lines
}

/// Print a batch report to stdout.
pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}
