//! Read-only queries against the repository.
//!
//! Nothing here caches: branch tips move while a run is executing, so every
//! call asks git again.

use rebranch_git::{CommitId, GitOps, Head};
use serde::{Deserialize, Serialize};

use crate::branch_name::BranchName;
use crate::error::{Error, Result};

/// What the inspector knows about a local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: BranchName,
    pub tip: CommitId,
    /// Configured upstream, when it is another local branch.
    pub declared_parent: Option<String>,
}

/// The target base a plan rebases onto.
///
/// `commit` is pinned when the plan is made; a resumed run keeps using it
/// even if the ref named by `spec` has since moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRef {
    /// The base as the user spelled it.
    pub spec: String,
    pub commit: CommitId,
}

/// Repository inspector generic over the git boundary.
pub struct Inspector<'a, G: GitOps> {
    git: &'a G,
}

impl<'a, G: GitOps> Inspector<'a, G> {
    #[must_use]
    pub const fn new(git: &'a G) -> Self {
        Self { git }
    }

    /// Resolve a local branch to its tip and declared parent.
    ///
    /// # Errors
    /// Returns `UnknownBranch` if there is no such local branch.
    pub fn resolve_branch(&self, name: &BranchName) -> Result<BranchInfo> {
        let tip = match self.git.branch_tip(name) {
            Ok(tip) => tip,
            Err(rebranch_git::Error::BranchNotFound(_)) => {
                return Err(Error::UnknownBranch(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let declared_parent = self
            .git
            .local_upstream(name)?
            .filter(|upstream| upstream != name.as_str());

        Ok(BranchInfo {
            name: name.clone(),
            tip,
            declared_parent,
        })
    }

    /// Resolve the target base to a commit.
    ///
    /// # Errors
    /// Returns `UnknownRevision` if `spec` names no commit.
    pub fn resolve_base(&self, spec: &str) -> Result<BaseRef> {
        match self.git.resolve_commit(spec) {
            Ok(commit) => Ok(BaseRef {
                spec: spec.to_string(),
                commit,
            }),
            Err(rebranch_git::Error::RefNotFound(_)) => Err(Error::UnknownRevision(spec.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Best common ancestor of two commits.
    ///
    /// # Errors
    /// Returns `NoCommonAncestor` for unrelated histories.
    pub fn common_ancestor(&self, a: &CommitId, b: &CommitId) -> Result<CommitId> {
        self.git
            .merge_base(a, b)?
            .ok_or_else(|| Error::NoCommonAncestor(a.to_string(), b.to_string()))
    }

    /// Whether `a` is an ancestor of (or equal to) `b`.
    ///
    /// # Errors
    /// Returns error if git cannot answer.
    pub fn is_ancestor(&self, a: &CommitId, b: &CommitId) -> Result<bool> {
        Ok(self.git.is_ancestor(a, b)?)
    }

    /// What HEAD points at: a branch, or a commit when detached.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be read.
    pub fn current_head(&self) -> Result<Head> {
        Ok(self.git.head()?)
    }

    /// Local branches that have not yet been rebased onto `base`.
    ///
    /// Lists branches whose history lacks the base commit, skipping the
    /// branch the base itself names and anything git would refuse as a
    /// branch argument.
    ///
    /// # Errors
    /// Returns error if git cannot list branches.
    pub fn discover_branches(&self, base: &BaseRef) -> Result<Vec<BranchName>> {
        let names = self.git.branches_not_containing(&base.commit)?;
        Ok(names
            .into_iter()
            .filter(|name| *name != base.spec)
            .filter_map(|name| match BranchName::new(name) {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::debug!("skipping branch during discovery: {e}");
                    None
                }
            })
            .collect())
    }
}
