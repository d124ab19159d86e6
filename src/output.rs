//! CLI narration and run summaries.
//!
//! Verbosity is carried by an explicit [`Reporter`] value threaded through
//! every component — no globals, no environment sniffing. Two levels:
//!
//! - **verbose**: one line per directory, progress-oriented
//! - **debug**: per-entry classification, change-detection reasoning, and
//!   generator invocations (implies verbose)
//!
//! Summary formatting follows the format/print split: `format_*` functions
//! are pure (return `Vec<String>`, no I/O) so tests can assert on output;
//! `print_*` wrappers write to stdout.

use crate::config::Verbosity;
use crate::walk::WalkStats;

/// Narration sink for one run.
///
/// Copy-cheap and `Sync`, so preview workers can narrate from inside a
/// rayon fan-out without coordination (lines are written atomically per
/// `println!`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    verbosity: Verbosity,
}

impl Reporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Progress narration, shown at `--verbose` and above.
    pub fn verbose(&self, message: impl AsRef<str>) {
        if self.verbosity.is_verbose() {
            println!("{}", message.as_ref());
        }
    }

    /// Diagnostic narration, shown at `--debug` only.
    pub fn debug(&self, message: impl AsRef<str>) {
        if self.verbosity.is_debug() {
            println!("{}", message.as_ref());
        }
    }

    /// Non-fatal problem worth seeing at any verbosity (e.g. a symlink
    /// cycle). Goes to stderr so it survives stdout redirection.
    pub fn warn(&self, message: impl AsRef<str>) {
        eprintln!("warning: {}", message.as_ref());
    }
}

/// Format the end-of-run summary.
pub fn format_summary(stats: &WalkStats) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} directories visited, {} indexes written",
        stats.dirs_visited, stats.indexes_written
    ));
    lines.push(format!("Previews: {}", stats.previews));
    if stats.dirs_pruned > 0 {
        lines.push(format!("Pruned {} empty directories", stats.dirs_pruned));
    }
    if stats.cycles_skipped > 0 {
        lines.push(format!(
            "Skipped {} symlink cycles (see warnings)",
            stats.cycles_skipped
        ));
    }
    lines
}

/// Print the end-of-run summary to stdout.
pub fn print_summary(stats: &WalkStats) {
    for line in format_summary(stats) {
        println!("{line}");
    }
}
