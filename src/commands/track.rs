use crate::SyncerContext;
use crate::output;
use anyhow::{Result, bail};
use std::path::Path;

/// `syncer track <name>` or `syncer track <file1> <file2>`.
///
/// # Errors
///
/// Returns an error if the arguments are malformed, the registration is
/// rejected, or the store cannot be saved.
pub fn execute(ctx: &mut SyncerContext, items: &[String]) -> Result<()> {
    match items {
        [name] => repo(ctx, name, &super::current_dir()?),
        [first, second] => pair(ctx, Path::new(first), Path::new(second)),
        _ => bail!("track takes a repository name or two file paths"),
    }
}

/// Register `root` as repository `name`.
///
/// # Errors
///
/// Returns an error if the name is already tracked or invalid, or the store
/// cannot be saved.
pub fn repo(ctx: &mut SyncerContext, name: &str, root: &Path) -> Result<()> {
    let repo = ctx.store.track_repo(name, root)?;
    let message = format!(
        "Started tracking {} as repository '{}'",
        repo.root.display(),
        repo.name
    );
    ctx.save_store()?;
    output::success(&message);
    Ok(())
}

/// Register two files as a manual pair.
///
/// # Errors
///
/// Returns an error if either file is missing, the basenames differ, the pair
/// already exists, or the store cannot be saved.
pub fn pair(ctx: &mut SyncerContext, first: &Path, second: &Path) -> Result<()> {
    let pair = ctx.store.track_pair(first, second)?;
    let message = format!(
        "Started tracking the files:\n{}\n{}",
        pair.a.display(),
        pair.b.display()
    );
    ctx.save_store()?;
    output::success(&message);
    Ok(())
}
