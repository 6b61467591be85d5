//! CLI argument definitions using clap derive

use crate::pipeline::OverwritePolicy;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// docfold - fold a project's documentation into one PDF
///
/// Resolves the latest release of the documentation source, fetches its
/// markdown tree, merges it and renders a single document named after the
/// release.
#[derive(Parser, Debug)]
#[command(name = "docfold")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `build`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DOCFOLD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve, fetch, merge and render the current documentation
    Build(BuildArgs),

    /// Show cached version metadata and artifact state without network access
    Status,

    /// Inspect or clear the version metadata cache
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Print shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug, Default)]
pub struct BuildArgs {
    /// Ignore the freshness window and ask the remote source
    #[arg(long, conflicts_with = "offline")]
    pub refresh: bool,

    /// Never contact the remote source; use cached metadata only
    #[arg(long)]
    pub offline: bool,

    /// What to do with existing artifacts (default: from config)
    #[arg(long, value_enum)]
    pub overwrite: Option<OverwritePolicy>,

    /// Answer yes to every overwrite prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Directory for fetched, merged and rendered artifacts
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cached entries with their age
    Show {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete the cache file
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format for `cache show`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON array
    Json,
    /// `key=value` lines
    Plain,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., source.owner)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
