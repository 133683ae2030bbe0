#![warn(missing_docs)]
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # Syncer - keep copies in step with their homes
//!
//! Syncer tracks files that were copied out of a "home" location (a tracked
//! repository, or a manually paired file) and detects when a copy has drifted
//! from its home, or the home from the copy, so the operator can reconcile them.
//!
//! ## How a copy is recognised
//!
//! A copy names its home on its third line, e.g. `# Copied from myrepo in lib/util`.
//! The repository name must be one registered with `syncer track <name>`; the
//! optional ` in <subdir>` clause pins the home file's directory inside that
//! repository. Without it the whole repository is searched by basename.
//!
//! ## Architecture
//!
//! - [`store`]: persisted state (tracked repos, manual pairs, scan cache, history)
//! - [`config`]: user settings
//! - [`scanner`]: home-reference extraction with a change-signature cache
//! - [`resolver`]: turns a home reference into a concrete home path
//! - [`compare`]: content equality, optionally ignoring the header line
//! - [`graph`]: connection index plus the live set of differing links
//! - [`session`]: discovery for one `check` run
//! - [`prompt`]: the interactive resolution loop
//! - [`history`]: bounded ring of changed-path generations
//! - [`commands`]: command implementations
//!
//! ## Example Usage
//!
//! ```no_run
//! use syncer::SyncerContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut ctx = SyncerContext::new()?;
//! syncer::commands::track::repo(&mut ctx, "myrepo", "/repos/myrepo".as_ref())?;
//! syncer::commands::list::execute(&mut ctx)?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Command implementations.
pub mod commands;

/// Content comparison and copying between linked files.
pub mod compare;

/// User settings parsing and validation.
pub mod config;

/// Diff rendering (unified diff, binary detection).
pub mod diff;

/// Connection index and differing-link record.
pub mod graph;

/// Changed-paths history.
pub mod history;

/// Output formatting and progress display.
pub mod output;

/// Interactive resolution state machine and key input.
pub mod prompt;

/// Home-path resolution inside tracked repositories.
pub mod resolver;

/// Home-reference header scanning.
pub mod scanner;

/// Discovery state for a single `check` run.
pub mod session;

/// Persisted state store.
pub mod store;

/// Utility functions and helpers.
pub mod utils;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Current version of the syncer binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default state file path relative to the home directory.
pub const DEFAULT_STATE_PATH: &str = ".syncer";

/// Default settings file path relative to the home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/syncer/config.toml";

/// Number of leading bytes inspected for a home reference.
pub const HEADER_SCAN_BYTES: usize = 4096;

/// Zero-based index of the line carrying the home reference.
pub const HEADER_LINE_INDEX: usize = 2;

/// Hard cap on retained changed-path generations.
pub const MAX_GENERATIONS: usize = 10;

/// Central context for all syncer operations.
///
/// Owns the persisted parts of the program: the settings and the state store.
/// Ephemeral per-run structures live in [`session::CheckSession`].
#[derive(Debug, Clone)]
pub struct SyncerContext {
    /// Path to the settings file.
    pub config_path: PathBuf,

    /// Loaded settings.
    pub config: config::Config,

    /// Path to the state store.
    pub state_path: PathBuf,

    /// Loaded state store.
    pub store: store::Store,
}

impl SyncerContext {
    /// Creates a context from the default locations.
    ///
    /// `SYNCER_CONFIG_PATH` and `SYNCER_STATE_PATH` override the defaults.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if either
    /// file exists but cannot be parsed.
    pub fn new() -> Result<Self> {
        let config_path = if let Ok(path) = std::env::var("SYNCER_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        let state_path = if let Ok(path) = std::env::var("SYNCER_STATE_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_STATE_PATH)
        };

        Self::new_explicit(config_path, state_path)
    }

    /// Creates a context with explicit file locations.
    ///
    /// # Errors
    /// Returns an error if either file exists but cannot be parsed, or if the
    /// default settings file cannot be written.
    pub fn new_explicit(config_path: PathBuf, state_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path)?;
        let mut store = store::Store::load(&state_path)?;
        store.history.set_capacity(config.history.generations);

        Ok(Self {
            config_path,
            config,
            state_path,
            store,
        })
    }

    /// Writes the state store back to disk.
    ///
    /// # Errors
    /// Returns an error if the store cannot be serialized or written.
    pub fn save_store(&self) -> Result<()> {
        self.store.save(&self.state_path)
    }

    /// Finds the tracked repository whose root contains `path`.
    ///
    /// When roots are nested the deepest one wins.
    #[must_use]
    pub fn repo_containing(&self, path: &Path) -> Option<&store::TrackedRepo> {
        self.store
            .repos
            .iter()
            .filter(|repo| path.starts_with(&repo.root))
            .max_by_key(|repo| repo.root.components().count())
    }
}
