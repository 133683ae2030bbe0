#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::path::{Path, PathBuf};
use syncer::SyncerContext;
use tempfile::TempDir;

/// An isolated home directory with its own state and settings files.
pub struct TestEnv {
    pub temp_dir: TempDir,
    root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().canonicalize()?;
        Ok(Self { temp_dir, root })
    }

    /// Canonical root of the environment.
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(".syncer")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(".config/syncer/config.toml")
    }

    /// The `syncer` binary, run from `cwd` with this environment.
    pub fn cmd(&self, cwd: &Path) -> Result<Command> {
        let mut cmd = Command::cargo_bin("syncer")?;
        cmd.current_dir(cwd)
            .env("HOME", &self.root)
            .env("SYNCER_STATE_PATH", self.state_path())
            .env("SYNCER_CONFIG_PATH", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Like [`TestEnv::write`], with a fixed modification time.
    pub fn write_at(&self, rel: &str, content: &str, mtime: i64) -> Result<PathBuf> {
        let path = self.write(rel, content)?;
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0))?;
        Ok(path)
    }

    pub fn mkdir(&self, rel: &str) -> Result<PathBuf> {
        let path = self.root.join(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Track `rel` as repository `name` through the binary.
    pub fn track(&self, name: &str, rel: &str) -> Result<PathBuf> {
        let root = self.mkdir(rel)?;
        self.cmd(&root)?.args(["track", name]).assert().success();
        Ok(root)
    }

    /// A library context over the same files the binary uses.
    pub fn context(&self) -> Result<SyncerContext> {
        SyncerContext::new_explicit(self.config_path(), self.state_path())
    }
}
