//! Command-line interface definitions for syncer.
//!
//! Shared between the binary and `xtask`, which renders man pages from it.

#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Main CLI structure for syncer.
#[derive(Parser)]
#[command(
    name = "syncer",
    version = crate::VERSION,
    about = "Keep copied files in sync with their homes",
    long_about = "Tracks files copied out of a home repository (or paired by hand) \
                  and walks you through every place a copy and its home have drifted apart"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Track the current directory as repository NAME, or pair two files
    #[command(override_usage = "syncer track <NAME>\n       syncer track <FILE1> <FILE2>")]
    Track {
        /// A repository name, or two files sharing a basename
        #[arg(required = true, num_args = 1..=2, value_name = "NAME | FILES")]
        items: Vec<String>,
    },

    /// Find differences between copies and homes, and resolve them
    Check {
        /// Look at every tracked repository, not just the current one
        #[arg(short, long)]
        all: bool,
    },

    /// List the files changed by the most recent check
    Remind,

    /// List every known home/copy link and manual pair
    List,

    /// Get and set options
    Config {
        /// Option key, as section.key
        key: Option<String>,

        /// New value
        value: Option<String>,

        /// List all options
        #[arg(short, long)]
        list: bool,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}
