//! Command definitions and handlers.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub mod abort;
pub mod completions;
pub mod onto;
pub mod resume;
pub mod status;
pub mod utils;

/// Rebase a stack of dependent branches onto a new base in one resumable run.
#[derive(Debug, Parser)]
#[command(name = "rebranch", version, propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Only print errors and essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log every git invocation to stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebase branches onto BASE; stacked branches follow their rebased parents.
    ///
    /// With no BRANCH given, every local branch that does not yet contain
    /// BASE is rebased.
    Onto {
        /// Commit-ish to rebase onto (branch, tag or commit).
        base: String,

        /// Branches to rebase, in any order.
        branches: Vec<String>,

        /// Print the plan without changing anything.
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Ignore configured upstreams when working out parents.
        #[arg(long)]
        no_upstream: bool,
    },

    /// Continue a run paused on a conflict or failure.
    Resume {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Roll back the run in progress and restore every branch.
    Abort {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the run in progress.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// A run stopped before completing. Already reported to the user.
#[derive(Debug, thiserror::Error)]
pub enum Stopped {
    #[error("rebase paused on a conflict")]
    Conflict,
    #[error("rebase step failed")]
    Failed,
}
