//! Home-path resolution.
//!
//! Turns a [`HomeReference`] found in a copy's header into the concrete path of
//! the home file inside the referenced repository:
//!
//! - with a subdir, the home is `root/subdir/<copy basename>` and must exist;
//! - without one, the whole repository is searched by basename. The search uses
//!   a basename index built by a single walk of the repository per run.
//!
//! Successful resolutions are memoized per `(repo, subdir, basename)`.

use crate::scanner::HomeReference;
use crate::store::TrackedRepo;
use crate::utils::FileListings;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, span};

/// Why a home reference could not be turned into a home path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The reference named a subdir, but the home file is not there
    MissingTarget {
        /// The copy carrying the reference
        copy: PathBuf,
        /// Where the home file was expected
        target: PathBuf,
    },
    /// No file with the copy's basename exists in the repository
    NoCandidates {
        /// The copy carrying the reference
        copy: PathBuf,
        /// Repository that was searched
        repo: String,
    },
    /// The reference names a repository that is not tracked
    UnknownRepo {
        /// The copy carrying the reference
        copy: PathBuf,
        /// The unrecognised name
        repo: String,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTarget { copy, target } => write!(
                f,
                "{} pointed to home version {}, but it doesn't exist",
                copy.display(),
                target.display()
            ),
            Self::NoCandidates { copy, repo } => write!(
                f,
                "{} names repository '{}', but no file there has its basename",
                copy.display(),
                repo
            ),
            Self::UnknownRepo { copy, repo } => write!(
                f,
                "{} names repository '{}', which is not tracked",
                copy.display(),
                repo
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// A resolved home path, plus the ambiguity seen while finding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The chosen home file
    pub home: PathBuf,
    /// Set when the basename search matched several files; holds the first two
    pub ambiguous: Option<(PathBuf, PathBuf)>,
}

type ResolutionKey = (String, Option<PathBuf>, OsString);

/// Resolves home references for one run.
#[derive(Debug, Default)]
pub struct HomeResolver {
    /// `repo name -> basename -> files in traversal order`
    basename_index: HashMap<String, HashMap<OsString, Vec<PathBuf>>>,
    resolved: HashMap<ResolutionKey, PathBuf>,
}

impl HomeResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `home` for the copy at `copy`.
    ///
    /// A fresh ambiguous match is reported once through
    /// [`Resolution::ambiguous`]; memoized answers never repeat it.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] if the referenced repository is unknown, the
    /// subdir target does not exist, or no file in the repository matches.
    pub fn resolve(
        &mut self,
        home: &HomeReference,
        copy: &Path,
        repos: &[TrackedRepo],
        listings: &mut FileListings,
    ) -> Result<Resolution, ResolveError> {
        let span = span!(Level::DEBUG, "resolve_home", copy = %copy.display(), repo = %home.repo);
        let _guard = span.enter();

        let basename = copy.file_name().map(OsString::from).unwrap_or_default();
        let key = (home.repo.clone(), home.subdir.clone(), basename.clone());
        if let Some(found) = self.resolved.get(&key) {
            return Ok(Resolution {
                home: found.clone(),
                ambiguous: None,
            });
        }

        let Some(repo) = repos.iter().find(|r| r.name == home.repo) else {
            return Err(ResolveError::UnknownRepo {
                copy: copy.to_path_buf(),
                repo: home.repo.clone(),
            });
        };

        let resolution = match &home.subdir {
            Some(subdir) => {
                let target = repo.root.join(subdir).join(&basename);
                if !target.is_file() {
                    return Err(ResolveError::MissingTarget {
                        copy: copy.to_path_buf(),
                        target,
                    });
                }
                Resolution {
                    home: target,
                    ambiguous: None,
                }
            }
            None => {
                let candidates = self
                    .basename_index
                    .entry(repo.name.clone())
                    .or_insert_with(|| build_basename_index(&repo.root, listings))
                    .get(&basename)
                    .map(Vec::as_slice)
                    .unwrap_or_default();

                match candidates {
                    [] => {
                        return Err(ResolveError::NoCandidates {
                            copy: copy.to_path_buf(),
                            repo: repo.name.clone(),
                        });
                    }
                    [only] => Resolution {
                        home: only.clone(),
                        ambiguous: None,
                    },
                    [first, second, ..] => Resolution {
                        home: first.clone(),
                        ambiguous: Some((first.clone(), second.clone())),
                    },
                }
            }
        };

        debug!(home = %resolution.home.display(), "Resolved home path");
        self.resolved.insert(key, resolution.home.clone());
        Ok(resolution)
    }
}

fn build_basename_index(
    root: &Path,
    listings: &mut FileListings,
) -> HashMap<OsString, Vec<PathBuf>> {
    let mut index: HashMap<OsString, Vec<PathBuf>> = HashMap::new();
    for file in listings.files(root) {
        if let Some(name) = file.file_name() {
            index.entry(name.to_os_string()).or_default().push(file.clone());
        }
    }
    index
}
