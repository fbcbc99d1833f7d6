//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AzureSettings, BitbucketSettings, GitHubSettings, ShadowSyncConfig, load_default_config};
use crate::error::Result;
use crate::source::SourceKind;

pub mod commands;

/// shadowsync - mirror your Bitbucket / Azure DevOps contributions to GitHub
#[derive(Parser, Debug)]
#[command(name = "shadowsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List repositories and pull the identity's commits
    Pull {
        /// Source host
        #[arg(value_enum)]
        source: SourceKind,

        /// Write the pulled commits to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Record the commits of a pull file in the shadow repository
    Push {
        /// Pull file written by `shadowsync pull --output`
        #[arg(short, long)]
        input: PathBuf,

        /// Source the pull file came from (picks the default repository name)
        #[arg(long, value_enum, default_value_t = SourceKind::Bitbucket)]
        source: SourceKind,

        #[command(flatten)]
        options: PushOptions,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Pull, then push, in one run
    Sync {
        /// Source host
        #[arg(value_enum)]
        source: SourceKind,

        #[command(flatten)]
        options: PushOptions,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration (secrets redacted)
    Show {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Print the config file location
    Path,
}

/// Options shared by `push` and `sync`.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PushOptions {
    /// Name shadow files by the SHA256 of the repository name
    #[arg(long)]
    pub hash_paths: bool,

    /// Read everything, write nothing
    #[arg(long)]
    pub dry_run: bool,
}

/// Host settings given as flags or environment variables.
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    #[command(flatten, next_help_heading = "Bitbucket")]
    pub bitbucket: BitbucketSettings,

    #[command(flatten, next_help_heading = "Azure DevOps")]
    pub azure: AzureSettings,

    #[command(flatten, next_help_heading = "GitHub")]
    pub github: GitHubSettings,
}

impl Credentials {
    /// Layer these settings over the config file.
    pub fn load(&self) -> Result<ShadowSyncConfig> {
        Ok(load_default_config()?.overlay(&self.bitbucket, &self.azure, &self.github))
    }
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
