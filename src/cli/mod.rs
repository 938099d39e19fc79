//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "taggrr",
    version,
    author = "neur0map",
    about = "Identify, group and plan renames for loosely structured video collections",
    long_about = "Taggrr scans video folders, extracts identifiers from folder and file names, \
                  groups multi-part files, scores candidate matches and prints a deterministic, \
                  collision-free output layout."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/taggrr/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan directories and print the planned layout
    Plan {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Show at most this many groups
        #[arg(short, long)]
        limit: Option<usize>,

        /// Approve every group that needs manual review
        #[arg(long)]
        approve: bool,

        /// Worker threads used to plan groups
        #[arg(short = 'j', long, default_value = "1")]
        jobs: usize,
    },

    /// Show what gets extracted from a single folder or file name
    Analyze {
        /// Name to analyze
        name: String,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Report files of two directories that share an identifier
    Duplicates {
        /// Original (unsorted) directory
        left: PathBuf,

        /// Directory to compare against, usually the organized copy
        right: PathBuf,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
