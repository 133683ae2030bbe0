use anyhow::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Makes a path absolute, resolving relative paths from current directory
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir()?;
        Ok(current_dir.join(path))
    }
}

/// Returns the parts of two paths that tell them apart.
///
/// Leading and trailing components shared by both paths are stripped, so for
/// paths of the form `A/B/C` and `A/D/C` this returns `(B, D)`. When stripping
/// would leave one side empty (`A/B/C` vs `A/C`), one shared trailing component
/// is kept on both sides (`B/C` vs `C`) so each side stays non-empty.
///
/// Expects the paths to differ.
#[must_use]
pub fn unique_subpaths(first: &Path, second: &Path) -> (PathBuf, PathBuf) {
    let c1: Vec<&OsStr> = first.components().map(|c| c.as_os_str()).collect();
    let c2: Vec<&OsStr> = second.components().map(|c| c.as_os_str()).collect();
    let shortest = c1.len().min(c2.len());

    let mut pre = 0;
    while pre < shortest && c1[pre] == c2[pre] {
        pre += 1;
    }

    let mut post = 0;
    while post < shortest - pre && c1[c1.len() - 1 - post] == c2[c2.len() - 1 - post] {
        post += 1;
    }

    if pre + post == c1.len() || pre + post == c2.len() {
        if post > 0 {
            post -= 1;
        } else if pre > 0 {
            pre -= 1;
        }
    }

    let uniq1 = c1[pre..c1.len() - post].iter().collect();
    let uniq2 = c2[pre..c2.len() - post].iter().collect();
    (uniq1, uniq2)
}

/// Short display names for two same-basename paths, as `uniq:basename`.
#[must_use]
pub fn short_names(first: &Path, second: &Path) -> (String, String) {
    let (uniq1, uniq2) = unique_subpaths(first, second);
    (
        format!("{}:{}", uniq1.display(), basename(first)),
        format!("{}:{}", uniq2.display(), basename(second)),
    )
}

/// Final component of `path` as a display string (empty for `/`).
#[must_use]
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
