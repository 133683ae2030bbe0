//! Discovery for one `check` (or `list`) run.
//!
//! A [`CheckSession`] owns the per-run structures: the tree listings, the home
//! resolver with its memo, the header scanner built for the current set of
//! repository names, and the diff graph. Persisted state (the scan cache in
//! particular) stays in the [`Store`] and is borrowed for the duration of
//! discovery.

use crate::config::CheckConfig;
use crate::graph::{ConnectionEdge, DiffGraph};
use crate::output;
use crate::resolver::{HomeResolver, ResolveError};
use crate::scanner::{HeaderScanner, HomeReference, ScanCache};
use crate::store::{Store, TrackedRepo};
use crate::utils::{DirExclusions, FileListings};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info, span};

/// Per-run discovery state.
#[derive(Debug)]
pub struct CheckSession {
    pub graph: DiffGraph,
    scanner: HeaderScanner,
    resolver: HomeResolver,
    listings: FileListings,
    preserve_header_line: bool,
    problems: Vec<ResolveError>,
}

impl CheckSession {
    /// Prepare a session for the repositories in `store`.
    ///
    /// With `local_root`, only links touching that directory enter the diff
    /// record until the scope is lifted.
    ///
    /// # Errors
    ///
    /// Returns an error if the header pattern cannot be built.
    pub fn new(config: &CheckConfig, store: &Store, local_root: Option<PathBuf>) -> Result<Self> {
        let scanner = HeaderScanner::new(store.repos.iter().map(|r| r.name.as_str()))?;
        let graph = match local_root {
            Some(root) => DiffGraph::scoped_to(root),
            None => DiffGraph::new(),
        };
        Ok(Self {
            graph,
            scanner,
            resolver: HomeResolver::new(),
            listings: FileListings::new(
                DirExclusions::new(&config.exclude_dirs),
                config.follow_symlinks,
            ),
            preserve_header_line: config.preserve_header_line_on_copy,
            problems: Vec::new(),
        })
    }

    /// Every link known to the store: discovered home/copy links first, in
    /// repository and traversal order, then manual pairs.
    ///
    /// Unresolvable references are reported as warnings and left out.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside a single file, such as an
    /// unwritable terminal; unreadable files are skipped.
    pub fn links(&mut self, store: &mut Store) -> Result<Vec<ConnectionEdge>> {
        let mut links = Vec::new();
        for repo in &store.repos {
            self.discover_repo(repo, &store.repos, &mut store.scan_cache, &mut links);
        }
        links.extend(store.pairs.iter().map(|pair| ConnectionEdge {
            home: pair.a.clone(),
            copy: pair.b.clone(),
            ignore_header_line: true,
        }));
        info!(links = links.len(), "Discovery finished");
        Ok(links)
    }

    /// Discover every link and record it in the diff graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a comparison fails for a reason other than one of
    /// the files having disappeared.
    pub fn discover(&mut self, store: &mut Store) -> Result<()> {
        for link in self.links(store)? {
            if !link.home.is_file() || !link.copy.is_file() {
                output::warning(&format!(
                    "skipping {} <-> {}: one side no longer exists",
                    link.home.display(),
                    link.copy.display()
                ));
                continue;
            }
            self.graph
                .record(&link.home, &link.copy, link.ignore_header_line)?;
        }
        debug!(differences = self.graph.diff_count(), "Diff record built");
        Ok(())
    }

    fn discover_repo(
        &mut self,
        repo: &TrackedRepo,
        repos: &[TrackedRepo],
        cache: &mut ScanCache,
        links: &mut Vec<ConnectionEdge>,
    ) {
        let span = span!(Level::DEBUG, "discover_repo", repo = %repo.name);
        let _guard = span.enter();

        let files = self.listings.files(&repo.root).to_vec();
        let mut progress = output::start_scan(&repo.name, files.len());

        for copy in files {
            progress.tick();
            let reference = match self.scanner.scan(&copy, cache) {
                Ok(Some(reference)) => reference,
                Ok(None) => continue,
                Err(e) => {
                    debug!(path = %copy.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            if is_own_home(&reference, repo, &copy) {
                continue;
            }

            match self
                .resolver
                .resolve(&reference, &copy, repos, &mut self.listings)
            {
                Ok(resolution) => {
                    if let Some((first, second)) = &resolution.ambiguous {
                        report_ambiguous(&copy, first, second);
                    }
                    links.push(ConnectionEdge {
                        home: resolution.home,
                        copy,
                        ignore_header_line: self.preserve_header_line,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "Skipping link");
                    output::warning(&e.to_string());
                    self.problems.push(e);
                }
            }
        }
        progress.finish();
    }

    /// Resolution failures seen so far, in discovery order.
    #[must_use]
    pub fn problems(&self) -> &[ResolveError] {
        &self.problems
    }
}

/// A file naming its own repository is the home itself, unless a subdir
/// points somewhere else inside that repository.
fn is_own_home(reference: &HomeReference, repo: &TrackedRepo, file: &Path) -> bool {
    if reference.repo != repo.name {
        return false;
    }
    match (&reference.subdir, file.file_name()) {
        (Some(subdir), Some(name)) => repo.root.join(subdir).join(name) == file,
        _ => true,
    }
}

fn report_ambiguous(copy: &Path, first: &Path, second: &Path) {
    debug!(copy = %copy.display(), "Ambiguous home path");
    output::warning(&format!(
        "found multiple possible home paths for {}. First two matches are:\n    {}\n    {}",
        copy.display(),
        first.display(),
        second.display()
    ));
}
