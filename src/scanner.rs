//! Home-reference header scanning.
//!
//! A copy names its home on its third line, e.g.
//! `# Copied from myrepo in lib/foo`. The scanner reads at most
//! [`crate::HEADER_SCAN_BYTES`] from the start of a file, looks at that line,
//! and matches it against every tracked repository name.
//!
//! Scanning every file of every repository on each `check` is the expensive
//! part of a run, so results are cached per path together with the file's
//! [`ChangeSignature`]. A cached entry is trusted only while the signature is
//! unchanged; any metadata touch forces a rescan.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{Level, debug, span, trace};

/// The `(repo, subdir?)` token a copy carries on its header line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HomeReference {
    /// Name of the tracked repository holding the home file
    pub repo: String,
    /// Directory of the home file, relative to the repository root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<PathBuf>,
}

/// `(ctime, mtime)` of a file in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSignature {
    pub ctime_ns: i64,
    pub mtime_ns: i64,
}

impl ChangeSignature {
    /// Read the current signature of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be read.
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;

        let mtime_ns = metadata.modified().map(system_time_ns).unwrap_or(0);

        #[cfg(unix)]
        let ctime_ns = {
            use std::os::unix::fs::MetadataExt;
            metadata
                .ctime()
                .saturating_mul(1_000_000_000)
                .saturating_add(metadata.ctime_nsec())
        };
        #[cfg(not(unix))]
        let ctime_ns = metadata.created().map(system_time_ns).unwrap_or(0);

        Ok(Self { ctime_ns, mtime_ns })
    }
}

fn system_time_ns(time: SystemTime) -> i64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |n| -n),
    }
}

/// Cached scan result for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCacheEntry {
    /// `None` when the file carries no recognised reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<HomeReference>,
    pub signature: ChangeSignature,
}

/// Persisted `path -> (reference, signature)` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCache {
    entries: BTreeMap<PathBuf, ScanCacheEntry>,
}

impl ScanCache {
    /// Cached reference for `path`, if the stored signature equals `signature`.
    #[must_use]
    pub fn lookup(&self, path: &Path, signature: ChangeSignature) -> Option<&Option<HomeReference>> {
        self.entries
            .get(path)
            .filter(|entry| entry.signature == signature)
            .map(|entry| &entry.home)
    }

    /// Store or overwrite the entry for `path`.
    ///
    /// Paths that are not valid UTF-8 cannot be written to the state file and
    /// are never cached; they are rescanned on every run.
    pub fn insert(&mut self, path: PathBuf, entry: ScanCacheEntry) {
        if path.to_str().is_none() {
            trace!(path = %path.display(), "Not caching non-UTF-8 path");
            return;
        }
        self.entries.insert(path, entry);
    }

    /// Raw entry for `path`, regardless of signature.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&ScanCacheEntry> {
        self.entries.get(path)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries for paths that are no longer regular files.
    ///
    /// Returns the number of entries removed.
    pub fn prune_missing(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| path.is_file());
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Matches header lines against the set of tracked repository names.
#[derive(Debug, Clone)]
pub struct HeaderScanner {
    /// `None` when no repositories are tracked
    pattern: Option<Regex>,
}

impl HeaderScanner {
    /// Build a scanner for the given repository names.
    ///
    /// Names are tried longest first, so a name that is a prefix of another
    /// never shadows it.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined pattern cannot be compiled.
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut names: Vec<&str> = names.into_iter().filter(|n| !n.is_empty()).collect();
        if names.is_empty() {
            return Ok(Self { pattern: None });
        }
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"({alternation})(?: in (\S+))?"))
            .context("Failed to compile header pattern")?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Extract a reference from decoded header text.
    ///
    /// Returns `None` if the text has fewer than three lines or the third line
    /// names no tracked repository.
    #[must_use]
    pub fn parse_header(&self, text: &str) -> Option<HomeReference> {
        let pattern = self.pattern.as_ref()?;
        let line = text.split('\n').nth(crate::HEADER_LINE_INDEX)?;
        let line = line.strip_suffix('\r').unwrap_or(line);

        let caps = pattern.captures(line)?;
        let repo = caps.get(1)?.as_str().to_string();
        let subdir = caps
            .get(2)
            .map(|m| m.as_str().trim_start_matches('/'))
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Some(HomeReference { repo, subdir })
    }

    /// Scan `path` without consulting any cache.
    ///
    /// Files whose header window is not valid UTF-8 are treated as binary and
    /// yield `None`. A multi-byte character cut by the window boundary does not
    /// count as invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn scan_uncached(&self, path: &Path) -> Result<Option<HomeReference>> {
        if self.pattern.is_none() {
            return Ok(None);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open file for scanning: {}", path.display()))?;
        let mut window = Vec::with_capacity(crate::HEADER_SCAN_BYTES);
        file.take(crate::HEADER_SCAN_BYTES as u64)
            .read_to_end(&mut window)
            .with_context(|| format!("Failed to read file header: {}", path.display()))?;

        let Some(text) = decode_window(&window) else {
            debug!(path = %path.display(), "Header is not UTF-8, treating as binary");
            return Ok(None);
        };

        Ok(self.parse_header(text))
    }

    /// Scan `path`, answering from `cache` when its signature still matches.
    ///
    /// A fresh scan overwrites any stale entry for the path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata or contents cannot be read.
    pub fn scan(&self, path: &Path, cache: &mut ScanCache) -> Result<Option<HomeReference>> {
        let span = span!(Level::TRACE, "header_scan", path = %path.display());
        let _guard = span.enter();

        let signature = ChangeSignature::of(path)?;
        if let Some(home) = cache.lookup(path, signature) {
            return Ok(home.clone());
        }

        let home = self.scan_uncached(path)?;
        debug!(path = %path.display(), found = home.is_some(), "Header scanned");
        cache.insert(
            path.to_path_buf(),
            ScanCacheEntry {
                home: home.clone(),
                signature,
            },
        );
        Ok(home)
    }
}

/// Decode a header window, tolerating a character split at the window end.
fn decode_window(window: &[u8]) -> Option<&str> {
    match simdutf8::compat::from_utf8(window) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() && window.len() == crate::HEADER_SCAN_BYTES => {
            simdutf8::basic::from_utf8(&window[..e.valid_up_to()]).ok()
        }
        Err(_) => None,
    }
}
