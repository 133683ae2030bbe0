use crate::SyncerContext;
use crate::session::CheckSession;
use anyhow::Result;
use std::io::{self, Write};

/// `syncer list`: every home/copy link and manual pair, one per line.
///
/// Nothing is compared. The scan cache warmed by discovery is saved.
///
/// # Errors
///
/// Returns an error if discovery fails, stdout cannot be written, or the store
/// cannot be saved.
pub fn execute(ctx: &mut SyncerContext) -> Result<()> {
    let mut out = io::stdout().lock();
    write_links(ctx, &mut out)?;
    ctx.save_store()
}

/// Discover links and write them as `home <-> copy` lines, manual pairs last
/// and marked `(manual)`.
///
/// # Errors
///
/// Returns an error if discovery fails or `out` cannot be written.
pub fn write_links(ctx: &mut SyncerContext, out: &mut dyn Write) -> Result<()> {
    let mut session = CheckSession::new(&ctx.config.check, &ctx.store, None)?;
    let links = session.links(&mut ctx.store)?;
    let (discovered, manual) = links.split_at(links.len() - ctx.store.pairs.len());

    for link in discovered {
        writeln!(out, "{} <-> {}", link.home.display(), link.copy.display())?;
    }
    for link in manual {
        writeln!(
            out,
            "{} <-> {} (manual)",
            link.home.display(),
            link.copy.display()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lists_links_and_pairs() -> Result<()> {
        let temp = TempDir::new()?;
        let mut ctx = SyncerContext::new_explicit(
            temp.path().join("config.toml"),
            temp.path().join("state.toml"),
        )?;
        let lib = temp.path().join("lib");
        let app = temp.path().join("app");
        fs::create_dir_all(lib.join("util"))?;
        fs::create_dir_all(&app)?;
        ctx.store.track_repo("lib", &lib)?;
        ctx.store.track_repo("app", &app)?;
        fs::write(lib.join("util/foo.py"), "home\n")?;
        fs::write(app.join("foo.py"), "1\n2\n# lib in util\n")?;

        let a = temp.path().join("p/x.txt");
        let b = temp.path().join("q/x.txt");
        fs::create_dir_all(a.parent().unwrap())?;
        fs::create_dir_all(b.parent().unwrap())?;
        fs::write(&a, "one")?;
        fs::write(&b, "two")?;
        ctx.store.track_pair(&a, &b)?;

        let mut out = Vec::new();
        write_links(&mut ctx, &mut out)?;
        let text = String::from_utf8(out)?;

        let pair = &ctx.store.pairs[0];
        assert_eq!(
            text,
            format!(
                "{} <-> {}\n{} <-> {} (manual)\n",
                lib.join("util/foo.py").display(),
                app.join("foo.py").display(),
                pair.a.display(),
                pair.b.display()
            )
        );
        Ok(())
    }

    #[test]
    fn test_empty_store_lists_nothing() -> Result<()> {
        let temp = TempDir::new()?;
        let mut ctx = SyncerContext::new_explicit(
            temp.path().join("config.toml"),
            temp.path().join("state.toml"),
        )?;
        let mut out = Vec::new();
        write_links(&mut ctx, &mut out)?;
        assert!(out.is_empty());
        Ok(())
    }
}
