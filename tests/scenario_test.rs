//! End-to-end resolution scenarios driven through the library with scripted keys.

mod common;

use anyhow::Result;
use common::TestEnv;
use std::fs;
use syncer::commands::check;
use syncer::diff::DiffOptions;
use syncer::prompt::{Outcome, Report, ScriptedKeys};
use syncer::scanner::{ChangeSignature, HomeReference, ScanCacheEntry};
use syncer::session::CheckSession;
use syncer::{MAX_GENERATIONS, SyncerContext};

fn run_check(ctx: &mut SyncerContext, env: &TestEnv, keys: &str) -> Result<(Report, String)> {
    let mut keys = ScriptedKeys::new(keys);
    let mut out = Vec::new();
    let options = DiffOptions::from_config(&ctx.config.diff, false);
    let report = check::run(ctx, true, env.path(), &mut keys, &mut out, options)?;
    assert_eq!(keys.remaining(), 0);
    Ok((report, String::from_utf8(out)?))
}

#[test]
fn test_copy_surfaces_pair_in_same_session() -> Result<()> {
    let env = TestEnv::new()?;
    let mut ctx = env.context()?;
    let lib = env.mkdir("lib")?;
    let app = env.mkdir("app")?;
    ctx.store.track_repo("lib", &lib)?;
    ctx.store.track_repo("app", &app)?;

    env.write_at("lib/x.txt", "1\n2\n# canonical\nnew\n", 3_000)?;
    let b = env.write_at("app/x.txt", "1\n2\n# lib\nold\n", 1_000)?;
    let c = env.write_at("vendored/x.txt", "1\n2\n# kept in step with app\nold\n", 500)?;
    ctx.store.track_pair(&b, &c)?;

    let (report, text) = run_check(&mut ctx, &env, "1cc")?;
    assert_eq!(report.outcome, Outcome::Finished);
    assert_eq!(report.changed, vec![b.clone(), c.clone()]);
    assert_eq!(
        fs::read_to_string(&c)?,
        "1\n2\n# kept in step with app\nnew\n"
    );
    assert!(text.contains(&format!("older: {}", c.display())));
    Ok(())
}

#[test]
fn test_ambiguous_home_is_stable_across_runs() -> Result<()> {
    let env = TestEnv::new()?;
    let mut ctx = env.context()?;
    let lib = env.mkdir("lib")?;
    let app = env.mkdir("app")?;
    ctx.store.track_repo("lib", &lib)?;
    ctx.store.track_repo("app", &app)?;
    env.write("lib/b/util.py", "b\n")?;
    env.write("lib/a/util.py", "a\n")?;
    env.write("app/util.py", "x\ny\nfrom lib\n")?;

    for _ in 0..3 {
        let mut session = CheckSession::new(&ctx.config.check, &ctx.store, None)?;
        let links = session.links(&mut ctx.store)?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].home, lib.join("a/util.py"));
    }
    Ok(())
}

#[test]
fn test_matching_cache_entry_is_trusted() -> Result<()> {
    let env = TestEnv::new()?;
    let mut ctx = env.context()?;
    let lib = env.mkdir("lib")?;
    let app = env.mkdir("app")?;
    ctx.store.track_repo("lib", &lib)?;
    ctx.store.track_repo("app", &app)?;
    let home = env.write("lib/plain.txt", "home\n")?;
    let copy = env.write("app/plain.txt", "no header here\n")?;

    // Claim the copy references lib, under its real signature.
    ctx.store.scan_cache.insert(
        copy.clone(),
        ScanCacheEntry {
            home: Some(HomeReference {
                repo: "lib".to_string(),
                subdir: None,
            }),
            signature: ChangeSignature::of(&copy)?,
        },
    );

    let mut session = CheckSession::new(&ctx.config.check, &ctx.store, None)?;
    let links = session.links(&mut ctx.store)?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].home, home);
    assert_eq!(links[0].copy, copy);
    Ok(())
}

#[test]
fn test_stale_cache_entry_is_rescanned() -> Result<()> {
    let env = TestEnv::new()?;
    let mut ctx = env.context()?;
    let lib = env.mkdir("lib")?;
    let app = env.mkdir("app")?;
    ctx.store.track_repo("lib", &lib)?;
    ctx.store.track_repo("app", &app)?;
    env.write("lib/plain.txt", "home\n")?;
    let copy = env.write("app/plain.txt", "no header here\n")?;

    ctx.store.scan_cache.insert(
        copy.clone(),
        ScanCacheEntry {
            home: Some(HomeReference {
                repo: "lib".to_string(),
                subdir: None,
            }),
            signature: ChangeSignature::default(),
        },
    );

    let mut session = CheckSession::new(&ctx.config.check, &ctx.store, None)?;
    assert!(session.links(&mut ctx.store)?.is_empty());
    assert_eq!(ctx.store.scan_cache.get(&copy).map(|e| e.home.clone()), Some(None));
    Ok(())
}

#[test]
fn test_history_keeps_ten_generations() -> Result<()> {
    let env = TestEnv::new()?;
    let mut ctx = env.context()?;
    let lib = env.mkdir("lib")?;
    let app = env.mkdir("app")?;
    ctx.store.track_repo("lib", &lib)?;
    ctx.store.track_repo("app", &app)?;
    env.write("lib/x.txt", "a\nb\nlib\n")?;

    for round in 0..12 {
        env.write_at("app/x.txt", &format!("a\nb\nlib\n{round}\n"), 1_000)?;
        let (report, _) = run_check(&mut ctx, &env, "1c")?;
        assert_eq!(report.outcome, Outcome::Finished);
    }

    let saved = syncer::store::Store::load(&env.state_path())?;
    assert_eq!(saved.history.len(), MAX_GENERATIONS);
    assert_eq!(
        saved.history.latest().map(|g| g.paths.clone()),
        Some(vec![app.join("x.txt")])
    );
    Ok(())
}

#[test]
fn test_preserve_header_setting_keeps_copy_discoverable() -> Result<()> {
    let env = TestEnv::new()?;
    let mut ctx = env.context()?;
    ctx.config.set("check.preserve_header_line_on_copy", "true")?;
    let lib = env.mkdir("lib")?;
    let app = env.mkdir("app")?;
    ctx.store.track_repo("lib", &lib)?;
    ctx.store.track_repo("app", &app)?;
    env.write_at("lib/x.txt", "a\nb\n# home\nnew\n", 2_000)?;
    let copy = env.write_at("app/x.txt", "a\nb\n# from lib\nold\n", 1_000)?;

    let (report, _) = run_check(&mut ctx, &env, "1c")?;
    assert_eq!(report.changed, vec![copy.clone()]);
    assert_eq!(fs::read_to_string(&copy)?, "a\nb\n# from lib\nnew\n");

    let (again, _) = run_check(&mut ctx, &env, "")?;
    assert_eq!(again.outcome, Outcome::NoDifferences);

    let mut session = CheckSession::new(&ctx.config.check, &ctx.store, None)?;
    assert_eq!(session.links(&mut ctx.store)?.len(), 1);
    Ok(())
}
