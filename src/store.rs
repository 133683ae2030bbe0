//! Persisted state store.
//!
//! The store holds what syncer has been told to track and what it has learned
//! between runs: tracked repositories, manual file pairs, the header-scan
//! cache, and the changed-paths history. It is a single TOML document with one
//! section per kind of record:
//!
//! ```toml
//! version = 1
//!
//! [[repos]]
//! name = "myrepo"
//! root = "/repos/myrepo"
//!
//! [[pairs]]
//! a = "/a/x.txt"
//! b = "/b/x.txt"
//!
//! [[history]]
//! committed_at = "2024-05-01T10:00:00Z"
//! paths = ["/b/x.txt"]
//!
//! [scan_cache."/other/copy/foo.py".signature]
//! ctime_ns = 1714557600000000000
//! mtime_ns = 1714557600000000000
//! ```

use crate::history::ChangedPathsHistory;
use crate::scanner::ScanCache;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory registered as the home of files copied elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRepo {
    /// Unique name, as written in copies' header lines
    pub name: String,
    /// Absolute root directory
    pub root: PathBuf,
}

/// Two files declared to stay in sync. Both share a basename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPair {
    /// First file; treated as the home side when recording differences
    pub a: PathBuf,
    /// Second file
    pub b: PathBuf,
}

/// Everything syncer persists between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// Format version for future compatibility
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub repos: Vec<TrackedRepo>,
    #[serde(default)]
    pub pairs: Vec<ManualPair>,
    #[serde(default)]
    pub history: ChangedPathsHistory,
    #[serde(default)]
    pub scan_cache: ScanCache,
}

const fn current_version() -> u32 {
    Store::CURRENT_VERSION
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            repos: Vec::new(),
            pairs: Vec::new(),
            history: ChangedPathsHistory::default(),
            scan_cache: ScanCache::default(),
        }
    }
}

impl Store {
    /// Current store format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Load the store, returning an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No state file yet, starting empty");
            return Ok(Self::default());
        }

        let store: Self = crate::config::parser::parse_toml_file(path)
            .with_context(|| format!("Failed to load state file: {}", path.display()))?;

        if store.version > Self::CURRENT_VERSION {
            anyhow::bail!(
                "State file {} has version {}, newer than supported version {}",
                path.display(),
                store.version,
                Self::CURRENT_VERSION
            );
        }

        Ok(store)
    }

    /// Atomically write the store to `path`.
    ///
    /// The document is written to a temporary file beside `path` and renamed
    /// over it, so an interrupted save never leaves a truncated store.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize state")?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        debug!(
            path = %path.display(),
            repos = self.repos.len(),
            pairs = self.pairs.len(),
            cached = self.scan_cache.len(),
            "State saved"
        );
        Ok(())
    }

    /// Look up a tracked repository by name.
    #[must_use]
    pub fn repo(&self, name: &str) -> Option<&TrackedRepo> {
        self.repos.iter().find(|r| r.name == name)
    }

    /// Register `root` as the home of repository `name`.
    ///
    /// Clears the scan cache: cached "no reference" results were computed
    /// against the previous set of names.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, contains whitespace, or is
    /// already tracked.
    pub fn track_repo(&mut self, name: &str, root: &Path) -> Result<&TrackedRepo> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            anyhow::bail!("Invalid repository name '{name}': names cannot be empty or contain whitespace");
        }
        if let Some(existing) = self.repo(name) {
            anyhow::bail!(
                "Repository name '{}' is already tracked at {}",
                name,
                existing.root.display()
            );
        }

        self.repos.push(TrackedRepo {
            name: name.to_string(),
            root: root.to_path_buf(),
        });
        self.scan_cache.clear();

        Ok(&self.repos[self.repos.len() - 1])
    }

    /// Register two files as a manual pair.
    ///
    /// Both paths are canonicalized before storing.
    ///
    /// # Errors
    ///
    /// Returns an error if either path is not an existing regular file, the
    /// basenames differ, both name the same file, or the pair is already tracked.
    pub fn track_pair(&mut self, first: &Path, second: &Path) -> Result<&ManualPair> {
        let a = canonical_file(first)?;
        let b = canonical_file(second)?;

        if a.file_name() != b.file_name() {
            anyhow::bail!(
                "Basenames differ: {} and {}",
                a.display(),
                b.display()
            );
        }
        if a == b {
            anyhow::bail!("Both paths refer to the same file: {}", a.display());
        }
        if self
            .pairs
            .iter()
            .any(|p| (p.a == a && p.b == b) || (p.a == b && p.b == a))
        {
            anyhow::bail!(
                "Files are already tracked as a pair: {} and {}",
                a.display(),
                b.display()
            );
        }

        self.pairs.push(ManualPair { a, b });
        Ok(&self.pairs[self.pairs.len() - 1])
    }
}

fn canonical_file(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        anyhow::bail!("Not an existing regular file: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{ChangeSignature, HomeReference, ScanCacheEntry};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::load(&dir.path().join("absent"))?;
        assert!(store.repos.is_empty());
        assert!(store.pairs.is_empty());
        assert!(store.history.is_empty());
        assert_eq!(store.version, Store::CURRENT_VERSION);
        Ok(())
    }

    #[test]
    fn test_save_and_reload_all_sections() -> Result<()> {
        let dir = tempdir()?;
        let state = dir.path().join(".syncer");
        let x1 = dir.path().join("a/x.txt");
        let x2 = dir.path().join("b/x.txt");
        fs::create_dir_all(x1.parent().unwrap())?;
        fs::create_dir_all(x2.parent().unwrap())?;
        fs::write(&x1, "one")?;
        fs::write(&x2, "two")?;

        let mut store = Store::default();
        store.track_repo("myrepo", Path::new("/repos/myrepo"))?;
        store.track_pair(&x1, &x2)?;
        store.history.begin_generation();
        store.history.record(&x2);
        store.scan_cache.insert(
            PathBuf::from("/repos/other/foo.py"),
            ScanCacheEntry {
                home: Some(HomeReference {
                    repo: "myrepo".to_string(),
                    subdir: Some(PathBuf::from("lib/foo")),
                }),
                signature: ChangeSignature {
                    ctime_ns: 10,
                    mtime_ns: 20,
                },
            },
        );
        store.scan_cache.insert(
            PathBuf::from("/repos/other/plain.txt"),
            ScanCacheEntry {
                home: None,
                signature: ChangeSignature {
                    ctime_ns: 1,
                    mtime_ns: 2,
                },
            },
        );
        store.save(&state)?;

        let loaded = Store::load(&state)?;
        assert_eq!(loaded.repos, store.repos);
        assert_eq!(loaded.pairs, store.pairs);
        assert_eq!(loaded.history, store.history);
        assert_eq!(loaded.scan_cache, store.scan_cache);

        Ok(())
    }

    #[test]
    fn test_duplicate_repo_name_rejected() {
        let mut store = Store::default();
        store.track_repo("dup", Path::new("/one")).unwrap();
        let err = store.track_repo("dup", Path::new("/two")).unwrap_err();
        assert!(err.to_string().contains("already tracked"));
        assert_eq!(store.repos.len(), 1);
    }

    #[test]
    fn test_repo_name_with_whitespace_rejected() {
        let mut store = Store::default();
        assert!(store.track_repo("my repo", Path::new("/one")).is_err());
        assert!(store.track_repo("", Path::new("/one")).is_err());
    }

    #[test]
    fn test_track_repo_clears_scan_cache() {
        let mut store = Store::default();
        store.scan_cache.insert(
            PathBuf::from("/f"),
            ScanCacheEntry {
                home: None,
                signature: ChangeSignature::default(),
            },
        );
        store.track_repo("fresh", Path::new("/fresh")).unwrap();
        assert_eq!(store.scan_cache.len(), 0);
    }

    #[test]
    fn test_pair_basename_mismatch_rejected() -> Result<()> {
        let dir = tempdir()?;
        let x = dir.path().join("x.txt");
        let y = dir.path().join("y.txt");
        fs::write(&x, "")?;
        fs::write(&y, "")?;

        let mut store = Store::default();
        let err = store.track_pair(&x, &y).unwrap_err();
        assert!(err.to_string().contains("Basenames differ"));
        Ok(())
    }

    #[test]
    fn test_pair_missing_file_rejected() -> Result<()> {
        let dir = tempdir()?;
        let x = dir.path().join("x.txt");
        fs::write(&x, "")?;

        let mut store = Store::default();
        let err = store
            .track_pair(&x, &dir.path().join("other/x.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("Not an existing regular file"));

        let err = store.track_pair(&x, dir.path()).unwrap_err();
        assert!(err.to_string().contains("Not an existing regular file"));
        Ok(())
    }

    #[test]
    fn test_pair_duplicate_in_either_order_rejected() -> Result<()> {
        let dir = tempdir()?;
        let x1 = dir.path().join("a/x.txt");
        let x2 = dir.path().join("b/x.txt");
        fs::create_dir_all(x1.parent().unwrap())?;
        fs::create_dir_all(x2.parent().unwrap())?;
        fs::write(&x1, "")?;
        fs::write(&x2, "")?;

        let mut store = Store::default();
        store.track_pair(&x1, &x2)?;
        assert!(store.track_pair(&x2, &x1).is_err());
        assert!(store.track_pair(&x1, &x1).is_err());
        Ok(())
    }

    #[test]
    fn test_newer_version_rejected() -> Result<()> {
        let dir = tempdir()?;
        let state = dir.path().join(".syncer");
        fs::write(&state, "version = 99\n")?;
        assert!(Store::load(&state).is_err());
        Ok(())
    }
}
