//! The interactive resolution loop.
//!
//! The loop is a small state machine driven by single key presses:
//!
//! ```text
//! SelectingScope -> IteratingDiffs -> PresentingDiff -> AwaitingAction
//!        |               ^    |                              |
//!        |               +----|------------------------------+  (copy, reverse, skip)
//!        v                    v                              v
//!       Done <----------------+----------------------------- Done  (write, quit)
//! ```
//!
//! Choosing a scope is the commit point: it opens a new changed-paths
//! generation and lifts the local-repository restriction of the diff graph.
//! Every copy re-checks the links touching the rewritten file before the next
//! difference is taken, so changes propagate within the same session.

mod keys;

pub use keys::{Interrupted, KeySource, PipedKeys, ScriptedKeys, TerminalKeys};

use crate::compare::copy_content;
use crate::diff::{self, DiffOptions};
use crate::graph::{DiffGraph, PendingDiff};
use crate::history::ChangedPathsHistory;
use crate::utils::paths::{basename, short_names};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Scope choices offered by number.
const MAX_NUMBERED: usize = 9;

const RULE: &str = "------------------------------------------------------------------------";

/// How a resolution session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// There was nothing to resolve.
    NoDifferences,
    /// Every difference in scope was handled.
    Finished,
    /// The operator quit at a prompt.
    Quit,
    /// The operator exported a diff to this file and quit.
    Exported(PathBuf),
}

/// Result of [`ResolutionLoop::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    /// Files overwritten during the session, in write order
    pub changed: Vec<PathBuf>,
}

enum State {
    SelectingScope,
    IteratingDiffs,
    PresentingDiff(PendingDiff),
    AwaitingAction(Presented),
    Done(Outcome),
}

/// A difference that has been shown to the operator.
struct Presented {
    diff: PendingDiff,
    older: PathBuf,
    newer: PathBuf,
    /// Uncoloured diff text, for exporting
    text: Vec<u8>,
}

/// One interactive session over a discovered diff graph.
pub struct ResolutionLoop<'a> {
    graph: &'a mut DiffGraph,
    history: &'a mut ChangedPathsHistory,
    keys: &'a mut dyn KeySource,
    out: &'a mut dyn Write,
    options: DiffOptions,
    export_dir: PathBuf,
    changed: Vec<PathBuf>,
    section: Option<PathBuf>,
}

impl<'a> ResolutionLoop<'a> {
    pub fn new(
        graph: &'a mut DiffGraph,
        history: &'a mut ChangedPathsHistory,
        keys: &'a mut dyn KeySource,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            graph,
            history,
            keys,
            out,
            options: DiffOptions::from_config(&crate::config::DiffConfig::default(), false),
            export_dir: PathBuf::from("."),
            changed: Vec::new(),
            section: None,
        }
    }

    /// Diff rendering settings for presented differences.
    #[must_use]
    pub const fn with_diff_options(mut self, options: DiffOptions) -> Self {
        self.options = options;
        self
    }

    /// Directory that exported diff files are written to.
    #[must_use]
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    /// Drive the session to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if a key cannot be read, the output cannot be written,
    /// or a file cannot be read, copied or exported.
    pub fn run(mut self) -> Result<Report> {
        let mut state = State::SelectingScope;
        let outcome = loop {
            state = match state {
                State::SelectingScope => self.select_scope()?,
                State::IteratingDiffs => self.next_diff()?,
                State::PresentingDiff(diff) => self.present(diff)?,
                State::AwaitingAction(presented) => self.act(presented)?,
                State::Done(outcome) => break outcome,
            };
        };
        self.out.flush()?;
        info!(?outcome, changed = self.changed.len(), "Resolution finished");
        Ok(Report {
            outcome,
            changed: self.changed,
        })
    }

    fn select_scope(&mut self) -> Result<State> {
        if self.graph.is_empty() {
            writeln!(self.out, "No differences found.")?;
            return Ok(State::Done(Outcome::NoDifferences));
        }

        let homes: Vec<PathBuf> = self.graph.homes().map(Path::to_path_buf).collect();
        self.write_overview(&homes)?;

        let numbered = homes.len().min(MAX_NUMBERED);
        let digits: String = (1..=numbered).map(|i| i.to_string()).collect();
        let choices = if numbered == 1 {
            "1".to_string()
        } else {
            format!("1-{numbered}")
        };
        writeln!(self.out, "{RULE}")?;
        writeln!(
            self.out,
            "Actions: [{choices}] handle a file; handle [a]ll files; [q]uit."
        )?;
        write!(self.out, "What would you like to do? ")?;

        let key = self
            .keys
            .read_key(&format!("{digits}aq"), &mut *self.out)?;
        let chosen = match key {
            'q' => return Ok(State::Done(Outcome::Quit)),
            'a' => homes,
            digit => {
                let index = digit
                    .to_digit(10)
                    .and_then(|d| usize::try_from(d).ok())
                    .context("Unexpected scope key")?;
                vec![homes[index - 1].clone()]
            }
        };

        debug!(homes = chosen.len(), "Scope chosen");
        self.graph.narrow_to(&chosen);
        self.graph.lift_scope();
        self.history.begin_generation();
        Ok(State::IteratingDiffs)
    }

    fn write_overview(&mut self, homes: &[PathBuf]) -> Result<()> {
        let mut basename_counts: HashMap<String, usize> = HashMap::new();
        for home in homes {
            *basename_counts.entry(basename(home)).or_default() += 1;
        }

        struct Row {
            left: String,
            relation: &'static str,
            right: String,
        }
        let mut sections = Vec::with_capacity(homes.len());
        let (mut left_width, mut right_width) = (0, 0);
        for home in homes {
            let mut rows = Vec::new();
            for (copy, _) in self.graph.diffs_of(home) {
                let (left, right) = short_names(home, copy);
                left_width = left_width.max(left.chars().count());
                right_width = right_width.max(right.chars().count());
                rows.push(Row {
                    left,
                    relation: relation_by_time(home, copy),
                    right,
                });
            }
            sections.push((home, rows));
        }

        writeln!(self.out, "Differences found:")?;
        for (i, (home, rows)) in sections.into_iter().enumerate() {
            let marker = if i < MAX_NUMBERED {
                format!("[{}]", i + 1)
            } else {
                "[ ]".to_string()
            };
            let base = basename(home);
            let suffix = if basename_counts.get(&base).copied().unwrap_or(0) > 1 {
                format!(" in {}", home.display())
            } else {
                String::new()
            };
            writeln!(self.out, "\n  {marker} {base}{suffix}")?;
            for row in rows {
                writeln!(
                    self.out,
                    "        {:>left_width$} {:^13} {:<right_width$}",
                    row.left, row.relation, row.right
                )?;
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn next_diff(&mut self) -> Result<State> {
        let next = self.graph.pop_next();
        let next_home = next.as_ref().map(|d| d.home.clone());
        if self.section != next_home {
            if let Some(ended) = self.section.take() {
                writeln!(self.out, "^^^^^^^ end {} ^^^^^^^", basename(&ended))?;
            }
            if let Some(started) = &next_home {
                writeln!(self.out, "vvvvvvv start {} vvvvvvv", basename(started))?;
            }
            self.section = next_home;
        }

        Ok(match next {
            Some(diff) => State::PresentingDiff(diff),
            None => {
                self.write_reminder()?;
                State::Done(Outcome::Finished)
            }
        })
    }

    fn present(&mut self, diff: PendingDiff) -> Result<State> {
        let (older, newer) = if modified(&diff.home)? >= modified(&diff.copy)? {
            (diff.copy.clone(), diff.home.clone())
        } else {
            (diff.home.clone(), diff.copy.clone())
        };

        writeln!(self.out, "\nDiff between:")?;
        writeln!(self.out, "older: {}", older.display())?;
        writeln!(self.out, "newer: {}\n", newer.display())?;

        let (old_label, new_label) = short_names(&older, &newer);
        let mut text = Vec::new();
        diff::render(
            (&older, &old_label),
            (&newer, &new_label),
            &self.options.plain(),
            &mut text,
        )?;
        if self.options.colorize {
            diff::render(
                (&older, &old_label),
                (&newer, &new_label),
                &self.options,
                &mut *self.out,
            )?;
        } else {
            self.out.write_all(&text)?;
        }

        Ok(State::AwaitingAction(Presented {
            diff,
            older,
            newer,
            text,
        }))
    }

    fn act(&mut self, presented: Presented) -> Result<State> {
        let (older_short, newer_short) = short_names(&presented.older, &presented.newer);
        writeln!(self.out, "{RULE}")?;
        writeln!(
            self.out,
            "Actions: [c]opy {newer_short} to {older_short}; [r]everse-copy {older_short} to {newer_short};"
        )?;
        writeln!(self.out, "         [s]kip; [w]rite diff file and quit; [q]uit.")?;
        write!(self.out, "What would you like to do? ")?;

        let ignore = presented.diff.ignore_header_line;
        match self.keys.read_key("crswq", &mut *self.out)? {
            'c' => self.copy(&presented.newer, &presented.older, ignore)?,
            'r' => self.copy(&presented.older, &presented.newer, ignore)?,
            's' => {}
            'w' => {
                let path = self.export(&presented)?;
                writeln!(self.out, "Wrote diff to {}", path.display())?;
                self.write_reminder()?;
                return Ok(State::Done(Outcome::Exported(path)));
            }
            _ => return Ok(State::Done(Outcome::Quit)),
        }
        Ok(State::IteratingDiffs)
    }

    fn copy(&mut self, source: &Path, destination: &Path, ignore_header_line: bool) -> Result<()> {
        copy_content(source, destination, ignore_header_line)?;
        writeln!(
            self.out,
            "Copied {} to {}",
            source.display(),
            destination.display()
        )?;

        self.history.record(destination);
        if !self.changed.iter().any(|p| p == destination) {
            self.changed.push(destination.to_path_buf());
        }
        self.graph.on_mutated(destination)
    }

    fn export(&self, presented: &Presented) -> Result<PathBuf> {
        let path = export_path(&self.export_dir, &basename(&presented.diff.copy));
        std::fs::write(&path, &presented.text)
            .with_context(|| format!("Failed to write diff file {}", path.display()))?;
        Ok(path)
    }

    fn write_reminder(&mut self) -> Result<()> {
        if self.changed.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "\nRemember to test:")?;
        for path in &self.changed {
            writeln!(self.out, "  {}", path.display())?;
        }
        Ok(())
    }
}

/// First free `<base>_diff.txt`, `<base>_diff_v2.txt`, ... in `dir`.
#[must_use]
pub fn export_path(dir: &Path, base: &str) -> PathBuf {
    let first = dir.join(format!("{base}_diff.txt"));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{base}_diff_v{n}.txt")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// `<-newer` when the home side is newer, `newer->` when the copy is.
fn relation_by_time(home: &Path, copy: &Path) -> &'static str {
    match (modified(home), modified(copy)) {
        (Ok(h), Ok(c)) if h > c => "<-newer  ",
        (Ok(h), Ok(c)) if h < c => "  newer->",
        _ => "!=",
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time of {}", path.display()))
}
