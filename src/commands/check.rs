use crate::SyncerContext;
use crate::diff::DiffOptions;
use crate::output;
use crate::prompt::{KeySource, PipedKeys, Report, ResolutionLoop, TerminalKeys};
use crate::session::CheckSession;
use anyhow::{Context, Result};
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use tracing::debug;

/// `syncer check [--all]` against the real terminal.
///
/// Keys come from the keyboard when stdin is a terminal and from stdin itself
/// otherwise. Diffs are coloured only when stdout is a terminal.
///
/// # Errors
///
/// Returns an error if the working directory is outside every tracked
/// repository and `all` is not set, or if discovery, resolution or saving fails.
pub fn execute(ctx: &mut SyncerContext, all: bool) -> Result<()> {
    let cwd = super::current_dir()?;
    let stdout = io::stdout();
    let options = DiffOptions::from_config(&ctx.config.diff, stdout.is_terminal());
    let mut out = stdout.lock();

    let mut terminal;
    let mut piped;
    let keys: &mut dyn KeySource = if io::stdin().is_terminal() {
        terminal = TerminalKeys;
        &mut terminal
    } else {
        piped = PipedKeys::new(io::stdin().lock());
        &mut piped
    };

    run(ctx, all, &cwd, keys, &mut out, options)?;
    out.flush()?;
    Ok(())
}

/// Discover differences visible from `cwd` and resolve them interactively.
///
/// The store is saved once the prompts are over, however they ended: after a
/// quit, after an interrupt, or after a failure part-way through, so files
/// already overwritten reach the changed-paths history. The scan cache is
/// pruned of files that no longer exist before saving.
///
/// # Errors
///
/// Returns an error if `cwd` is outside every tracked repository and `all` is
/// not set, or if discovery, resolution or saving fails.
pub fn run(
    ctx: &mut SyncerContext,
    all: bool,
    cwd: &Path,
    keys: &mut dyn KeySource,
    out: &mut dyn Write,
    options: DiffOptions,
) -> Result<Report> {
    let local_root = if all {
        None
    } else {
        let repo = ctx.repo_containing(cwd).with_context(|| {
            format!(
                "{} is not inside a tracked repository (use --all to check everything)",
                cwd.display()
            )
        })?;
        debug!(repo = %repo.name, "Checking local repository");
        Some(repo.root.clone())
    };

    output::info("Checking for differences.");
    let mut session = CheckSession::new(&ctx.config.check, &ctx.store, local_root)?;
    session.discover(&mut ctx.store)?;

    let resolved = ResolutionLoop::new(&mut session.graph, &mut ctx.store.history, keys, out)
        .with_diff_options(options)
        .with_export_dir(cwd.to_path_buf())
        .run();

    let pruned = ctx.store.scan_cache.prune_missing();
    debug!(pruned, ok = resolved.is_ok(), "Pruned scan cache");
    let saved = ctx.save_store();
    let report = resolved?;
    saved?;
    Ok(report)
}
