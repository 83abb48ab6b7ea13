//! Error types for rebranch-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Local branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Revision does not resolve to a commit.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// Rebase stopped on conflicts that need manual resolution.
    #[error("rebase conflict in: {0:?}")]
    RebaseConflict(Vec<String>),

    /// The git binary exited unsuccessfully for a reason other than a conflict.
    #[error("`{command}` failed{}: {stderr}", exit_code_suffix(.code))]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// Working directory is dirty.
    #[error("working directory has uncommitted changes")]
    DirtyWorkingDirectory,

    /// Output that should have been an object id was not.
    #[error("invalid commit id: {0:?}")]
    InvalidCommitId(String),

    /// Could not spawn the git binary or read its output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

#[allow(clippy::ref_option)]
fn exit_code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {c}"))
        .unwrap_or_default()
}
