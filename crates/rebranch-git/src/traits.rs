//! Trait abstraction over the git operations rebranch needs.
//!
//! `GitOps` is the only seam through which the core touches git, so the
//! planner and executor can be driven by an in-memory fake in tests.

use crate::{CommitId, Head, Result};

/// Git repository operations used by rebranch.
///
/// Implementations must not cache: branch tips move between calls when a
/// rebase step completes.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Where HEAD currently points.
    fn head(&self) -> Result<Head>;

    /// Check if a rebase is in progress.
    fn is_rebasing(&self) -> bool;

    /// Check if the working directory is clean.
    fn is_clean(&self) -> Result<bool>;

    // === Inspection ===

    /// Tip commit of a local branch.
    ///
    /// Returns `BranchNotFound` when there is no such branch.
    fn branch_tip(&self, name: &str) -> Result<CommitId>;

    /// The branch's configured upstream, if it is another local branch.
    fn local_upstream(&self, name: &str) -> Result<Option<String>>;

    /// Resolve any commit-ish to a commit.
    ///
    /// Returns `RefNotFound` when it does not resolve.
    fn resolve_commit(&self, rev: &str) -> Result<CommitId>;

    /// Best common ancestor of two commits, `None` for unrelated histories.
    fn merge_base(&self, one: &CommitId, two: &CommitId) -> Result<Option<CommitId>>;

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own ancestor).
    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool>;

    /// Local branches whose history does not contain `commit`.
    fn branches_not_containing(&self, commit: &CommitId) -> Result<Vec<String>>;

    // === Rebase Operations ===

    /// Replay `branch`'s commits after `upstream` onto `onto`.
    ///
    /// Leaves `branch` checked out. Returns `RebaseConflict` when git stops
    /// for manual resolution and `CommandFailed` for any other failure.
    fn rebase_onto(&self, branch: &str, onto: &CommitId, upstream: &CommitId) -> Result<()>;

    /// Continue a rebase after conflicts were resolved and staged.
    fn rebase_continue(&self) -> Result<()>;

    /// Abort a rebase in progress.
    fn rebase_abort(&self) -> Result<()>;

    /// Files with unresolved conflicts.
    fn conflicting_files(&self) -> Result<Vec<String>>;

    // === Working Tree ===

    /// Point a local branch at `commit`, resetting the working tree when it is checked out.
    fn reset_branch(&self, branch: &str, commit: &CommitId) -> Result<()>;

    /// Checkout a branch, or detach at a commit.
    fn checkout(&self, head: &Head) -> Result<()>;

    /// Stash local changes including untracked files.
    ///
    /// Returns whether anything was stashed.
    fn stash_push(&self) -> Result<bool>;

    /// Re-apply and drop the most recent stash.
    fn stash_pop(&self) -> Result<()>;
}
