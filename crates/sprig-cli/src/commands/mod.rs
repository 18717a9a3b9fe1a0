//! Command-line surface and per-command implementations.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use sprig_core::{SortBy, Strategy};

pub mod branch;
pub mod completions;
pub mod merge;
pub mod utils;

/// Sprig - branch and merge intelligence over git.
#[derive(Debug, Parser)]
#[command(name = "sprig", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Run as if sprig was started in <PATH>
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors and essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Kill git invocations after this many seconds (0 = no limit)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Options every command needs to open the repository.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            directory: self.directory.clone(),
            timeout: self.timeout,
        }
    }
}

/// Repository location and invocation limits shared by all commands.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub directory: Option<PathBuf>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and manage branches
    #[command(subcommand)]
    Branch(BranchCommand),

    /// Predict conflicts, merge, rebase and recover
    #[command(subcommand)]
    Merge(MergeCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// List branches with tracking and merge status
    List(ListArgs),

    /// Show one branch
    Show {
        /// Branch name (local, or remote as `origin/name`)
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the checked-out branch
    Current {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a branch
    Create(CreateArgs),

    /// Delete a branch, locally or on the remote
    Delete(DeleteArgs),

    /// Rename a branch
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,

        /// Overwrite an existing branch and ignore protection
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Include remote-tracking branches
    #[arg(short, long)]
    pub all: bool,

    /// Only branches merged into HEAD
    #[arg(long)]
    pub merged: bool,

    /// Sort order: listing, name, date (newest first) or author
    #[arg(long, default_value = "listing")]
    pub sort: SortBy,

    /// Show at most N branches
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the new branch
    pub name: String,

    /// Start point (defaults to HEAD)
    #[arg(short, long, value_name = "REF")]
    pub base: Option<String>,

    /// Switch to the new branch
    #[arg(short, long)]
    pub checkout: bool,

    /// Set the start point as upstream
    #[arg(short, long)]
    pub track: bool,

    /// Reset the branch if it already exists
    #[arg(short, long)]
    pub force: bool,

    /// Skip branch name validation
    #[arg(long)]
    pub no_validate: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Branch to delete
    pub name: String,

    /// Delete the branch on the remote
    #[arg(short, long)]
    pub remote: bool,

    /// Delete even if unmerged or protected
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Don't ask before deleting a protected branch
    #[arg(short, long)]
    pub yes: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum MergeCommand {
    /// Predict conflicts between two refs without touching the repository
    Detect {
        /// Branch or ref to merge from
        source: String,

        /// Branch or ref to merge into
        #[arg(default_value = "HEAD")]
        target: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge a branch into the checked-out branch
    Do(MergeArgs),

    /// Rebase the checked-out branch, or continue or abort a rebase
    Rebase(RebaseArgs),

    /// Abort the merge or rebase in progress
    Abort,

    /// Show whether a merge or rebase is in progress
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Branch to merge
    pub branch: String,

    /// Further branches for an octopus merge
    #[arg(value_name = "BRANCH")]
    pub extra: Vec<String>,

    /// fast-forward, recursive, ours, theirs or octopus
    #[arg(short, long)]
    pub strategy: Option<Strategy>,

    /// Always create a merge commit
    #[arg(long)]
    pub no_ff: bool,

    /// Stage the combined changes without committing
    #[arg(long)]
    pub squash: bool,

    /// Predict and report, don't merge
    #[arg(long)]
    pub dry_run: bool,

    /// Merge commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RebaseArgs {
    /// Upstream to rebase onto
    #[arg(required_unless_present_any = ["abort", "continue_"])]
    pub onto: Option<String>,

    /// Edit the todo list in an interactive rebase
    #[arg(short, long)]
    pub interactive: bool,

    /// Predict and report, don't rebase
    #[arg(long)]
    pub dry_run: bool,

    /// Abort the rebase in progress
    #[arg(long, conflicts_with_all = ["continue_", "onto"])]
    pub abort: bool,

    /// Continue after resolving conflicts
    #[arg(long = "continue", conflicts_with = "onto")]
    pub continue_: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
