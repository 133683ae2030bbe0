pub mod check;
pub mod config;
pub mod list;
pub mod remind;
pub mod track;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// The working directory with symlinks resolved, so it compares equal to
/// canonicalized repository roots.
///
/// # Errors
///
/// Returns an error if the working directory is gone or unreadable.
pub fn current_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    cwd.canonicalize()
        .with_context(|| format!("Failed to resolve {}", cwd.display()))
}
