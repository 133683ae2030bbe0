use crate::SyncerContext;
use crate::history::ChangedPathsHistory;
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::io::{self, Write};
use std::time::Duration;

/// `syncer remind`: list the files changed by the most recent check.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn execute(ctx: &SyncerContext) -> Result<()> {
    let mut out = io::stdout().lock();
    write_reminder(&ctx.store.history, Utc::now(), &mut out)
}

/// Write generation 0 of `history`, or a note that nothing changed.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn write_reminder(
    history: &ChangedPathsHistory,
    now: DateTime<Utc>,
    out: &mut dyn Write,
) -> Result<()> {
    let Some(latest) = history.latest().filter(|g| !g.paths.is_empty()) else {
        writeln!(out, "Nothing changed in the last check.")?;
        return Ok(());
    };

    let age = (now - latest.committed_at)
        .to_std()
        .map(|d| Duration::from_secs(d.as_secs()))
        .unwrap_or_default();
    writeln!(
        out,
        "{} {}",
        "Remember to test the files changed".bold(),
        format!("{} ago:", humantime::format_duration(age)).dimmed()
    )?;
    for path in &latest.paths {
        writeln!(out, "  {}", path.display())?;
    }
    Ok(())
}
