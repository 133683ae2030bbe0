//! Changed-paths history.
//!
//! Every `check` run that reaches the commit point opens a new generation at
//! index 0 and shifts older ones back. At most [`crate::MAX_GENERATIONS`]
//! generations are retained; `remind` reads generation 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Paths mutated during one committed `check` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// When the run reached its commit point
    pub committed_at: DateTime<Utc>,
    /// Absolute paths written during the run, in write order, without repeats
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Generation {
    fn new() -> Self {
        Self {
            committed_at: Utc::now(),
            paths: Vec::new(),
        }
    }
}

/// Fixed-capacity ring of generations, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Generation>", into = "Vec<Generation>")]
pub struct ChangedPathsHistory {
    generations: VecDeque<Generation>,
    capacity: usize,
}

impl Default for ChangedPathsHistory {
    fn default() -> Self {
        Self::with_capacity(crate::MAX_GENERATIONS)
    }
}

impl From<Vec<Generation>> for ChangedPathsHistory {
    fn from(generations: Vec<Generation>) -> Self {
        let mut history = Self::default();
        history.generations = generations.into();
        history.generations.truncate(history.capacity);
        history
    }
}

impl From<ChangedPathsHistory> for Vec<Generation> {
    fn from(history: ChangedPathsHistory) -> Self {
        history.generations.into()
    }
}

impl ChangedPathsHistory {
    /// Creates an empty history keeping at most `capacity` generations.
    ///
    /// The capacity is clamped to `1..=MAX_GENERATIONS`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, crate::MAX_GENERATIONS);
        Self {
            generations: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Changes the capacity, dropping generations beyond it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.clamp(1, crate::MAX_GENERATIONS);
        self.generations.truncate(self.capacity);
    }

    /// Opens a new, empty generation 0, dropping the oldest when full.
    pub fn begin_generation(&mut self) {
        self.generations.push_front(Generation::new());
        self.generations.truncate(self.capacity);
    }

    /// Records a mutated path in generation 0.
    ///
    /// Does nothing if no generation has been opened. A path that is not valid
    /// UTF-8 is stored lossily so the state file stays writable.
    pub fn record(&mut self, path: &Path) {
        let path = match path.to_str() {
            Some(_) => path.to_path_buf(),
            None => PathBuf::from(path.to_string_lossy().into_owned()),
        };
        if let Some(current) = self.generations.front_mut()
            && !current.paths.contains(&path)
        {
            current.paths.push(path);
        }
    }

    /// Generation `index`, 0 being the most recent.
    #[must_use]
    pub fn generation(&self, index: usize) -> Option<&Generation> {
        self.generations.get(index)
    }

    /// The most recent generation.
    #[must_use]
    pub fn latest(&self) -> Option<&Generation> {
        self.generations.front()
    }

    /// Number of retained generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    /// Whether no generation has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}
