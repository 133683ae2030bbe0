pub mod parser;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// User settings, stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub diff: DiffConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Keep the destination's header line when copying repository links.
    ///
    /// When set, repository-discovered links are also compared with the
    /// header line ignored, matching how manual pairs behave.
    #[serde(default)]
    pub preserve_header_line_on_copy: bool,
    /// Directory-name globs skipped while walking a repository
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default)]
    pub algorithm: DiffAlgorithm,
    #[serde(default = "default_color")]
    pub color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of changed-path generations to keep (1..=10)
    #[serde(default = "default_generations")]
    pub generations: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            preserve_header_line_on_copy: false,
            exclude_dirs: default_exclude_dirs(),
            follow_symlinks: false,
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            algorithm: DiffAlgorithm::Myers,
            color: default_color(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            generations: default_generations(),
        }
    }
}

impl Config {
    /// Load settings from a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories for a fresh default file
    /// - Cannot read or parse the settings file
    /// - A value fails validation
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        parser::parse_config_file(path)
    }

    /// Save settings to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or TOML serialization fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create config file: {}", path.display()))?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }

    /// Get a configuration value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return None;
        }

        match (parts[0], parts[1]) {
            ("check", "preserve_header_line_on_copy") => {
                Some(self.check.preserve_header_line_on_copy.to_string())
            }
            ("check", "exclude_dirs") => Some(self.check.exclude_dirs.join(",")),
            ("check", "follow_symlinks") => Some(self.check.follow_symlinks.to_string()),
            ("diff", "context_lines") => Some(self.diff.context_lines.to_string()),
            ("diff", "algorithm") => Some(format!("{:?}", self.diff.algorithm).to_lowercase()),
            ("diff", "color") => Some(self.diff.color.to_string()),
            ("history", "generations") => Some(self.history.generations.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key format is invalid (must be section.key)
    /// - The key is unknown
    /// - The value is invalid for the key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return Err(anyhow::anyhow!("Invalid configuration key: {key}"));
        }

        let mut next = self.clone();
        match (parts[0], parts[1]) {
            ("check", "preserve_header_line_on_copy") => {
                next.check.preserve_header_line_on_copy = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            ("check", "exclude_dirs") => {
                let dirs: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                for pattern in &dirs {
                    glob::Pattern::new(pattern)
                        .with_context(|| format!("Invalid glob pattern: {pattern}"))?;
                }
                next.check.exclude_dirs = dirs;
            }
            ("check", "follow_symlinks") => {
                next.check.follow_symlinks = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            ("diff", "context_lines") => {
                next.diff.context_lines = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
            }
            ("diff", "algorithm") => {
                next.diff.algorithm = match value {
                    "myers" => DiffAlgorithm::Myers,
                    "patience" => DiffAlgorithm::Patience,
                    _ => return Err(anyhow::anyhow!("Unknown diff algorithm: {value}")),
                };
            }
            ("diff", "color") => {
                next.diff.color = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            ("history", "generations") => {
                next.history.generations = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
            }
            _ => return Err(anyhow::anyhow!("Unknown configuration key: {key}")),
        }

        parser::validate_config(&next)?;
        *self = next;
        Ok(())
    }

    /// All known keys, in display order.
    #[must_use]
    pub const fn keys() -> &'static [&'static str] {
        &[
            "check.preserve_header_line_on_copy",
            "check.exclude_dirs",
            "check.follow_symlinks",
            "diff.context_lines",
            "diff.algorithm",
            "diff.color",
            "history.generations",
        ]
    }
}

// Default functions for serde
fn default_exclude_dirs() -> Vec<String> {
    [".git", ".hg", ".svn", ".bzr", "CVS"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_context_lines() -> usize {
    3
}

const fn default_color() -> bool {
    true
}

const fn default_generations() -> usize {
    crate::MAX_GENERATIONS
}
