//! Rendering the difference between two linked files.
//!
//! The older file is always the left-hand (`-`) side. Text files get a unified
//! line diff; if either side looks binary, a one-line notice is written instead.

/// Binary content detection
pub mod binary;
/// Unified line diff output
pub mod unified;

pub use binary::is_binary;
pub use unified::write_unified_diff;

use crate::config::{DiffAlgorithm, DiffConfig};
use anyhow::{Context, Result};
use similar::Algorithm;
use std::io::Write;
use std::path::Path;

/// Diff settings that apply to one rendering.
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    pub context_lines: usize,
    pub algorithm: Algorithm,
    pub colorize: bool,
}

impl DiffOptions {
    /// Options from the `[diff]` settings; colour additionally requires a
    /// destination that is a terminal.
    #[must_use]
    pub const fn from_config(config: &DiffConfig, terminal: bool) -> Self {
        Self {
            context_lines: config.context_lines,
            algorithm: algorithm(config.algorithm),
            colorize: config.color && terminal,
        }
    }

    /// The same options without colour, for writing to a file.
    #[must_use]
    pub const fn plain(self) -> Self {
        Self {
            colorize: false,
            ..self
        }
    }
}

#[must_use]
pub const fn algorithm(algo: DiffAlgorithm) -> Algorithm {
    match algo {
        DiffAlgorithm::Myers => Algorithm::Myers,
        DiffAlgorithm::Patience => Algorithm::Patience,
    }
}

/// Write the diff from `older` to `newer`, labelling the sides as given.
///
/// # Errors
///
/// Returns an error if either file cannot be read or the writer fails.
pub fn render(
    older: (&Path, &str),
    newer: (&Path, &str),
    options: &DiffOptions,
    writer: &mut dyn Write,
) -> Result<()> {
    let old = std::fs::read(older.0)
        .with_context(|| format!("Failed to read {}", older.0.display()))?;
    let new = std::fs::read(newer.0)
        .with_context(|| format!("Failed to read {}", newer.0.display()))?;

    if is_binary(&old) || is_binary(&new) {
        writeln!(writer, "Binary files {} and {} differ", older.1, newer.1)?;
        return Ok(());
    }

    write_unified_diff(
        &String::from_utf8_lossy(&old),
        &String::from_utf8_lossy(&new),
        older.1,
        newer.1,
        options,
        writer,
    )
}
