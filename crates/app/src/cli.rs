use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gitkeel")]
#[command(about = "A local version-control session engine - status, history and branch surgery for one repository at a time")]
pub struct Cli {
    /// Repository to operate on (defaults to the current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover repositories under the configured scan roots
    Scan {
        /// Roots to scan instead of the configured ones
        roots: Vec<PathBuf>,
    },
    /// Create an empty repository and open it
    Init {
        path: PathBuf,
    },
    /// Show staged, unstaged and untracked files
    Status,
    /// List local branches
    Branches,
    /// Show commit history
    Log {
        /// Maximum number of commits to show
        #[arg(long)]
        limit: Option<usize>,
        /// Commits to skip from the front
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Only show commits whose message contains this text
        #[arg(long)]
        grep: Option<String>,
        /// Include a per-file diff summary for each commit
        #[arg(long)]
        diffs: bool,
    },
    /// Stage files for the next commit
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Record the staged changes
    Commit {
        #[arg(short, long)]
        message: String,
    },
    /// Create a branch at the current head
    Branch {
        name: String,
    },
    /// Switch to another branch
    Checkout {
        name: String,
    },
    /// Merge a branch into the current one
    Merge {
        source: String,
    },
    /// Rebase the current branch onto another
    Rebase {
        target: String,
    },
    /// Apply commits onto a target branch and come back
    CherryPick {
        /// Commits to apply, in order
        #[arg(required = true)]
        commits: Vec<String>,
        /// Branch to apply the commits onto
        #[arg(long)]
        onto: String,
        /// Stage the changes but do not commit
        #[arg(long)]
        no_commit: bool,
        /// Combine all picked commits into a single commit
        #[arg(long)]
        squash: bool,
    },
}
