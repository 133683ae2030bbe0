//! The diff graph.
//!
//! Every link seen during discovery becomes a [`ConnectionEdge`], indexed under
//! both of its endpoints whether or not the two files currently differ. The
//! subset of edges that do differ forms the diff record, keyed by home path and
//! drained in sorted order by the resolution loop. After a file is rewritten,
//! [`DiffGraph::on_mutated`] re-compares every edge touching it, which is how a
//! change to one copy surfaces the links that now disagree with it.

use crate::compare::files_equal;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A link between two files that are meant to stay in sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionEdge {
    /// The conventionally authoritative side
    pub home: PathBuf,
    /// The other side
    pub copy: PathBuf,
    /// Compare (and copy) without the header line
    pub ignore_header_line: bool,
}

/// One differing link waiting to be resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingDiff {
    pub home: PathBuf,
    pub copy: PathBuf,
    pub ignore_header_line: bool,
}

impl From<PendingDiff> for ConnectionEdge {
    fn from(diff: PendingDiff) -> Self {
        Self {
            home: diff.home,
            copy: diff.copy,
            ignore_header_line: diff.ignore_header_line,
        }
    }
}

#[derive(Debug, Default)]
pub struct DiffGraph {
    connections: HashMap<PathBuf, HashSet<ConnectionEdge>>,
    diffs: BTreeMap<PathBuf, BTreeSet<(PathBuf, bool)>>,
    local_root: Option<PathBuf>,
}

impl DiffGraph {
    /// Graph considering every link for the diff record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph whose diff record only admits links touching `root`.
    #[must_use]
    pub fn scoped_to(root: PathBuf) -> Self {
        Self {
            local_root: Some(root),
            ..Self::default()
        }
    }

    /// Index the link and update its diff record entry.
    ///
    /// Returns whether the two files differ.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read.
    pub fn record(&mut self, home: &Path, copy: &Path, ignore_header_line: bool) -> Result<bool> {
        let edge = ConnectionEdge {
            home: home.to_path_buf(),
            copy: copy.to_path_buf(),
            ignore_header_line,
        };
        self.connections
            .entry(edge.home.clone())
            .or_default()
            .insert(edge.clone());
        self.connections
            .entry(edge.copy.clone())
            .or_default()
            .insert(edge);

        let differ = !files_equal(home, copy, ignore_header_line)?;
        let entry = (copy.to_path_buf(), ignore_header_line);

        if differ && self.in_scope(home, copy) {
            trace!(home = %home.display(), copy = %copy.display(), "Recorded difference");
            self.diffs.entry(home.to_path_buf()).or_default().insert(entry);
        } else if let Some(set) = self.diffs.get_mut(home) {
            set.remove(&entry);
            if set.is_empty() {
                self.diffs.remove(home);
            }
        }
        Ok(differ)
    }

    fn in_scope(&self, home: &Path, copy: &Path) -> bool {
        match &self.local_root {
            Some(root) => home.starts_with(root) || copy.starts_with(root),
            None => true,
        }
    }

    /// Re-record every link incident on a path whose content just changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a re-comparison cannot read its files.
    pub fn on_mutated(&mut self, path: &Path) -> Result<()> {
        let Some(edges) = self.connections.get(path) else {
            return Ok(());
        };
        let mut edges: Vec<ConnectionEdge> = edges.iter().cloned().collect();
        edges.sort();
        debug!(path = %path.display(), edges = edges.len(), "Re-checking neighbours");

        for edge in edges {
            self.record(&edge.home, &edge.copy, edge.ignore_header_line)?;
        }
        Ok(())
    }

    /// Stop restricting the diff record to the local repository.
    pub fn lift_scope(&mut self) {
        self.local_root = None;
    }

    /// Keep only the diff record entries for the given home paths.
    pub fn narrow_to(&mut self, homes: &[PathBuf]) {
        self.diffs.retain(|home, _| homes.contains(home));
    }

    /// Take the next differing link: smallest home path first.
    pub fn pop_next(&mut self) -> Option<PendingDiff> {
        let mut entry = self.diffs.first_entry()?;
        let (copy, ignore_header_line) = entry.get_mut().pop_first()?;
        let home = entry.key().clone();
        if entry.get().is_empty() {
            entry.remove();
        }
        Some(PendingDiff {
            home,
            copy,
            ignore_header_line,
        })
    }

    /// Home paths with differences, sorted.
    pub fn homes(&self) -> impl Iterator<Item = &Path> {
        self.diffs.keys().map(PathBuf::as_path)
    }

    /// Differing copies of `home`.
    pub fn diffs_of(&self, home: &Path) -> impl Iterator<Item = (&Path, bool)> {
        self.diffs
            .get(home)
            .into_iter()
            .flatten()
            .map(|(copy, ignore)| (copy.as_path(), *ignore))
    }

    /// Whether `home` still has pending differences.
    #[must_use]
    pub fn has_diffs(&self, home: &Path) -> bool {
        self.diffs.contains_key(home)
    }

    /// Number of pending differing links.
    #[must_use]
    pub fn diff_count(&self) -> usize {
        self.diffs.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Every indexed link, sorted and without duplicates.
    #[must_use]
    pub fn edges(&self) -> Vec<&ConnectionEdge> {
        let unique: BTreeSet<&ConnectionEdge> = self.connections.values().flatten().collect();
        unique.into_iter().collect()
    }

    /// Links incident on `path`.
    pub fn edges_at(&self, path: &Path) -> impl Iterator<Item = &ConnectionEdge> {
        self.connections.get(path).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::copy_content;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_record_indexes_both_endpoints_even_when_equal() {
        let dir = TempDir::new().unwrap();
        let h = write(&dir, "h/x", "same");
        let c = write(&dir, "c/x", "same");

        let mut graph = DiffGraph::new();
        assert!(!graph.record(&h, &c, false).unwrap());
        assert!(graph.is_empty());
        assert_eq!(graph.edges_at(&h).count(), 1);
        assert_eq!(graph.edges_at(&c).count(), 1);
        assert_eq!(graph.edges_at(&h).next(), graph.edges_at(&c).next());
    }

    #[test]
    fn test_record_unequal_goes_under_home() {
        let dir = TempDir::new().unwrap();
        let h = write(&dir, "h/x", "new");
        let c = write(&dir, "c/x", "old");

        let mut graph = DiffGraph::new();
        assert!(graph.record(&h, &c, false).unwrap());
        assert_eq!(graph.homes().collect::<Vec<_>>(), vec![h.as_path()]);
        assert_eq!(graph.diffs_of(&h).collect::<Vec<_>>(), vec![(c.as_path(), false)]);
    }

    #[test]
    fn test_rerecord_after_fix_removes_entry() {
        let dir = TempDir::new().unwrap();
        let h = write(&dir, "h/x", "new");
        let c = write(&dir, "c/x", "old");

        let mut graph = DiffGraph::new();
        graph.record(&h, &c, false).unwrap();
        fs::write(&c, "new").unwrap();
        graph.record(&h, &c, false).unwrap();
        assert!(graph.is_empty());
        assert!(!graph.has_diffs(&h));
    }

    #[test]
    fn test_pop_next_drains_in_sorted_home_order() {
        let dir = TempDir::new().unwrap();
        let hb = write(&dir, "b/x", "1");
        let ha = write(&dir, "a/y", "1");
        let c1 = write(&dir, "c/x", "2");
        let c2 = write(&dir, "d/y", "2");
        let c3 = write(&dir, "e/y", "3");

        let mut graph = DiffGraph::new();
        graph.record(&hb, &c1, false).unwrap();
        graph.record(&ha, &c2, false).unwrap();
        graph.record(&ha, &c3, false).unwrap();
        assert_eq!(graph.diff_count(), 3);

        let order: Vec<PathBuf> = std::iter::from_fn(|| graph.pop_next())
            .map(|d| d.home)
            .collect();
        assert_eq!(order, vec![ha.clone(), ha, hb]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_local_scope_excludes_but_still_indexes() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("local");
        let h = write(&dir, "remote/x", "1");
        let c = write(&dir, "other/x", "2");
        let lh = write(&dir, "local/y", "1");
        let lc = write(&dir, "other/y", "2");

        let mut graph = DiffGraph::scoped_to(local);
        graph.record(&h, &c, false).unwrap();
        graph.record(&lh, &lc, false).unwrap();

        assert_eq!(graph.homes().collect::<Vec<_>>(), vec![lh.as_path()]);
        assert_eq!(graph.edges().len(), 2);

        graph.lift_scope();
        graph.on_mutated(&c).unwrap();
        assert_eq!(graph.diff_count(), 2);
    }

    #[test]
    fn test_narrow_to_selected_homes() {
        let dir = TempDir::new().unwrap();
        let h1 = write(&dir, "a/x", "1");
        let c1 = write(&dir, "b/x", "2");
        let h2 = write(&dir, "a/y", "1");
        let c2 = write(&dir, "b/y", "2");

        let mut graph = DiffGraph::new();
        graph.record(&h1, &c1, false).unwrap();
        graph.record(&h2, &c2, false).unwrap();
        graph.narrow_to(std::slice::from_ref(&h2));
        assert_eq!(graph.homes().collect::<Vec<_>>(), vec![h2.as_path()]);
    }

    #[test]
    fn test_transitive_propagation_through_manual_pair() {
        // H -> B is a discovered link, (B, C) is a manual pair. Initially B == C.
        let dir = TempDir::new().unwrap();
        let h = write(&dir, "home/x.txt", "a\nb\n# home\nnew\n");
        let b = write(&dir, "b/x.txt", "a\nb\n# from home\nold\n");
        let c = write(&dir, "c/x.txt", "a\nb\n# from b\nold\n");

        let mut graph = DiffGraph::new();
        graph.record(&h, &b, false).unwrap();
        graph.record(&b, &c, true).unwrap();
        assert_eq!(graph.diff_count(), 1);
        assert!(!graph.has_diffs(&b));

        let pending = graph.pop_next().unwrap();
        assert_eq!(pending.copy, b);
        copy_content(&pending.home, &pending.copy, false).unwrap();
        graph.on_mutated(&b).unwrap();

        assert_eq!(graph.homes().collect::<Vec<_>>(), vec![b.as_path()]);
        assert_eq!(graph.diffs_of(&b).collect::<Vec<_>>(), vec![(c.as_path(), true)]);
    }

    #[test]
    fn test_on_mutated_unknown_path_is_noop() {
        let mut graph = DiffGraph::new();
        graph.on_mutated(Path::new("/nowhere")).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_duplicate_record_is_one_edge() {
        let dir = TempDir::new().unwrap();
        let h = write(&dir, "h/x", "1");
        let c = write(&dir, "c/x", "2");

        let mut graph = DiffGraph::new();
        graph.record(&h, &c, false).unwrap();
        graph.record(&h, &c, false).unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.diff_count(), 1);
    }
}
