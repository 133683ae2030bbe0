//! Utility functions and helpers.
//!
//! - [`paths`]: path manipulation and the unique-suffix naming used in prompts
//! - [`list_files`]: the repository tree walk with directory exclusions
//! - [`FileListings`]: per-run memo of tree walks, one per root

/// Path manipulation and resolution utilities
pub mod paths;

use glob::Pattern;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory-name patterns to skip while walking a tree.
#[derive(Debug, Clone, Default)]
pub struct DirExclusions {
    patterns: Vec<Pattern>,
}

impl DirExclusions {
    /// Compile the given glob patterns; invalid ones are skipped with a warning.
    #[must_use]
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Whether a directory with this name should not be entered.
    #[must_use]
    pub fn excludes(&self, dir_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(dir_name))
    }
}

/// Lazily lists every regular file under `root`.
///
/// Directories whose name matches `exclusions` are not entered. Entries are
/// visited in file-name order within each directory, so the sequence is
/// deterministic for a fixed tree. Unreadable entries are skipped.
pub fn list_files<'a>(
    root: &Path,
    exclusions: &'a DirExclusions,
    follow_symlinks: bool,
) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !exclusions.excludes(&e.file_name().to_string_lossy())
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
}

/// Memoized tree listings, walked at most once per root per run.
#[derive(Debug, Default)]
pub struct FileListings {
    exclusions: DirExclusions,
    follow_symlinks: bool,
    by_root: HashMap<PathBuf, Vec<PathBuf>>,
}

impl FileListings {
    #[must_use]
    pub fn new(exclusions: DirExclusions, follow_symlinks: bool) -> Self {
        Self {
            exclusions,
            follow_symlinks,
            by_root: HashMap::new(),
        }
    }

    /// Every file under `root`, walking the tree on first request only.
    pub fn files(&mut self, root: &Path) -> &[PathBuf] {
        let exclusions = &self.exclusions;
        let follow = self.follow_symlinks;
        self.by_root.entry(root.to_path_buf()).or_insert_with(|| {
            let files: Vec<PathBuf> = list_files(root, exclusions, follow).collect();
            debug!(root = %root.display(), files = files.len(), "Listed tree");
            files
        })
    }

    /// Number of roots walked so far.
    #[must_use]
    pub fn walked(&self) -> usize {
        self.by_root.len()
    }
}
