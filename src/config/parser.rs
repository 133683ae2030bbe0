use super::Config;
use anyhow::{Context, Result};
use memmap2::MmapOptions;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

/// Files at or above this size are memory mapped instead of read.
const MMAP_THRESHOLD: u64 = 4096;

/// Parse a TOML file into `T`.
///
/// Small files are read normally; larger ones (a state store with a big scan
/// cache) are memory mapped and UTF-8 validated with SIMD before parsing.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid UTF-8, or is not
/// valid TOML for `T`.
pub fn parse_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat file: {}", path.display()))?;

    if metadata.len() < MMAP_THRESHOLD {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        return toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML in {}", path.display()));
    }

    let file = File::open(path)?;
    // SAFETY: the map is read-only and dropped before this function returns;
    // syncer never runs concurrently with itself against the same file.
    let mmap = unsafe { MmapOptions::new().map(&file)? };

    let content = simdutf8::basic::from_utf8(&mmap)
        .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in {}: {}", path.display(), e))?;

    toml::from_str(content).with_context(|| format!("Failed to parse TOML in {}", path.display()))
}

/// Parse and validate a settings file.
///
/// # Errors
///
/// Returns an error if parsing fails or a value is out of range.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let config: Config = parse_toml_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

pub(crate) fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse TOML config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Check value ranges that serde cannot express.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate_config(config: &Config) -> Result<()> {
    if !(1..=crate::MAX_GENERATIONS).contains(&config.history.generations) {
        anyhow::bail!(
            "history.generations must be between 1 and {}",
            crate::MAX_GENERATIONS
        );
    }

    if config.diff.context_lines > 1000 {
        anyhow::bail!("diff.context_lines cannot exceed 1000");
    }

    for pattern in &config.check.exclude_dirs {
        glob::Pattern::new(pattern)
            .with_context(|| format!("Invalid exclude_dirs pattern: {pattern}"))?;
    }

    Ok(())
}
