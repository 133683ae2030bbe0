use colored::Colorize;
use std::io::{self, IsTerminal, Write};

/// An in-place `<title>: NN% (n/N)` line on stderr.
///
/// Draws only when stderr is a terminal; otherwise it just counts.
pub struct Progress {
    title: String,
    total: usize,
    current: usize,
    percent: usize,
    visible: bool,
}

impl Progress {
    #[must_use]
    pub fn new(title: &str, total: usize, enabled: bool) -> Self {
        let progress = Self {
            title: title.to_string(),
            total,
            current: 0,
            percent: 0,
            visible: enabled && total > 0 && io::stderr().is_terminal(),
        };
        progress.draw();
        progress
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Advance by one item, redrawing when the percentage changes.
    pub fn tick(&mut self) {
        self.current = (self.current + 1).min(self.total);
        let percent = percent(self.current, self.total);
        if percent != self.percent {
            self.percent = percent;
            self.draw();
        }
    }

    /// Draw the final state and end the line.
    pub fn finish(mut self) {
        self.current = self.total;
        self.percent = 100;
        if self.visible {
            self.draw();
            eprintln!(", done.");
            self.visible = false;
        }
    }

    fn draw(&self) {
        if !self.visible {
            return;
        }
        eprint!(
            "\r{}: {:>3}% ({}/{})",
            self.title.dimmed(),
            self.percent,
            self.current,
            self.total
        );
        let _ = io::stderr().flush();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if self.visible {
            eprintln!();
        }
    }
}

fn percent(current: usize, total: usize) -> usize {
    if total == 0 { 0 } else { current * 100 / total }
}
