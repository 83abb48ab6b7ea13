//! Error types for rebranch-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rebranch-core operations.
///
/// Planning errors are raised before anything in the repository changes.
/// Conflicts and git failures during execution are not errors here: they
/// are reported as [`crate::RunOutcome`]s with the run record preserved.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A selected branch does not exist.
    #[error("unknown branch: {0}")]
    UnknownBranch(String),

    /// The target base does not resolve to a commit.
    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    /// Two commits share no history.
    #[error("'{0}' and '{1}' have no common ancestor")]
    NoCommonAncestor(String, String),

    /// Parent relationships loop back on themselves.
    #[error("cyclic dependency detected: {}", .cycle.join(" -> "))]
    CycleDetected {
        /// Branches on the cycle, in parent order.
        cycle: Vec<String>,
    },

    /// More than one selected branch is equally close below a branch.
    #[error(
        "cannot decide the parent of '{branch}': {} are equally close ancestors",
        .candidates.join(", ")
    )]
    AmbiguousParent {
        /// The branch whose parent is ambiguous.
        branch: String,
        /// The equally close candidates.
        candidates: Vec<String>,
    },

    /// Invalid branch name.
    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName {
        /// The invalid name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// Nothing to rebase.
    #[error("no branches to rebase")]
    NoBranches,

    /// The target base is also one of the branches being rebased.
    #[error("target base '{0}' cannot also be one of the branches to rebase")]
    BaseInBranchSet(String),

    /// A plan violates its ordering invariant.
    #[error("invalid rebase plan: {0}")]
    InvalidPlan(String),

    /// A run record already exists.
    #[error("a rebase run is already in progress - run `rebranch resume` or `rebranch abort`")]
    RunInProgress,

    /// git is in the middle of a rebase this tool did not start.
    #[error("git has a rebase in progress - finish it or run `git rebase --abort` first")]
    ExternalRebaseInProgress,

    /// No run record exists.
    #[error("no rebase run in progress")]
    NoRunInProgress,

    /// Run record could not be parsed.
    #[error("failed to parse {file}: {message}")]
    StateParseError {
        /// The record file.
        file: PathBuf,
        /// Parser message.
        message: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] rebranch_git::Error),
}

impl Error {
    /// Whether the error was raised while planning, before any mutation.
    #[must_use]
    pub const fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownBranch(_)
                | Self::UnknownRevision(_)
                | Self::NoCommonAncestor(..)
                | Self::CycleDetected { .. }
                | Self::AmbiguousParent { .. }
                | Self::InvalidBranchName { .. }
                | Self::NoBranches
                | Self::BaseInBranchSet(_)
                | Self::InvalidPlan(_)
        )
    }
}
