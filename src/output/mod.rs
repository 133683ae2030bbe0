//! Operator-facing messages and the scan progress line.
//!
//! Everything here writes to stderr, leaving stdout for the report-style
//! output of `list` and `remind`. Routine messages are dimmed, problems are
//! bold, and `--quiet` suppresses everything that is not a warning or error.

mod progress;

use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

pub use progress::Progress;

/// How much the CLI says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet = 0,
    /// Default.
    Normal = 1,
    /// Adds per-file detail.
    Verbose = 2,
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);

pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

#[must_use]
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

fn quiet() -> bool {
    get_verbosity() == Verbosity::Quiet
}

/// Green, suppressed by `--quiet`.
pub fn success(message: &str) {
    if !quiet() {
        eprintln!("{}", message.green());
    }
}

/// Bold red, always shown.
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Bold yellow with a `warning:` prefix, always shown.
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

/// Dimmed, suppressed by `--quiet`.
pub fn info(message: &str) {
    if !quiet() {
        eprintln!("{}", message.dimmed());
    }
}

/// Only shown with `--verbose`.
pub fn verbose(message: &str) {
    if get_verbosity() == Verbosity::Verbose {
        eprintln!("{}", message.dimmed());
    }
}

/// `<verb> <message>` with the verb dimmed, e.g. `Copied a -> b`.
pub fn action(verb: &str, message: &str) {
    if !quiet() {
        eprintln!("{} {}", verb.dimmed().bold(), message);
    }
}

/// Progress line for scanning one repository.
#[must_use]
pub fn start_scan(repo: &str, total: usize) -> Progress {
    Progress::new(&format!("Scanning {repo}"), total, !quiet())
}
