//! Repository wrapper providing the git operations rebranch needs.

use std::path::{Path, PathBuf};

use git2::{RepositoryState, StatusOptions};

use crate::command::GitCommand;
use crate::error::{Error, Result};
use crate::traits::GitOps;
use crate::{CommitId, Head};

/// High-level wrapper around a git repository.
///
/// git2 answers questions about the repository itself (where it lives,
/// HEAD, working-tree status, whether a rebase is underway); everything
/// else runs through the `git` binary in the working directory.
pub struct Repository {
    inner: git2::Repository,
    root: PathBuf,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent, or if
    /// the repository is bare.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| Error::NotARepository)?;
        let root = inner.workdir().ok_or(Error::NotARepository)?.to_path_buf();
        Ok(Self { inner, root })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a non-bare git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Get the current repository state.
    #[must_use]
    pub fn state(&self) -> RepositoryState {
        self.inner.state()
    }

    fn git(&self) -> GitCommand {
        GitCommand::new(&self.root)
    }

    /// Classify a failed `git rebase` invocation.
    fn rebase_failure(&self, cmd: &GitCommand, output: &std::process::Output) -> Error {
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let stopped_on_conflict = combined.contains("CONFLICT")
            || combined.contains("could not apply")
            || combined.contains("Resolve all conflicts");

        if self.is_rebasing() && stopped_on_conflict {
            match self.conflicting_files() {
                Ok(files) => return Error::RebaseConflict(files),
                Err(e) => return e,
            }
        }
        cmd.failure(output)
    }
}

impl GitOps for Repository {
    fn head(&self) -> Result<Head> {
        let head = self.inner.head()?;
        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Head::Branch(name.to_string()));
            }
        }
        let oid = head.target().ok_or(Error::DetachedHead)?;
        Ok(Head::Detached(oid.into()))
    }

    fn is_rebasing(&self) -> bool {
        matches!(
            self.state(),
            RepositoryState::Rebase
                | RepositoryState::RebaseInteractive
                | RepositoryState::RebaseMerge
                | RepositoryState::ApplyMailboxOrRebase
        )
    }

    /// Untracked files do not count; only changes `git rebase` would refuse to run over.
    fn is_clean(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = self.inner.statuses(Some(&mut opts))?;
        Ok(statuses.is_empty())
    }

    fn branch_tip(&self, name: &str) -> Result<CommitId> {
        let cmd = self.git().args([
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("refs/heads/{name}^{{commit}}"),
        ]);
        let output = cmd.output()?;
        match output.status.code() {
            Some(0) => CommitId::parse(&String::from_utf8_lossy(&output.stdout)),
            Some(1) => Err(Error::BranchNotFound(name.to_string())),
            _ => Err(cmd.failure(&output)),
        }
    }

    fn local_upstream(&self, name: &str) -> Result<Option<String>> {
        let refname = format!("refs/heads/{name}");
        let listing = self
            .git()
            .args(["for-each-ref", "--format=%(refname) %(upstream)", &refname])
            .stdout()?;

        let upstream = listing
            .lines()
            .filter_map(|line| line.split_once(' '))
            .find(|(r, _)| *r == refname)
            .and_then(|(_, upstream)| upstream.strip_prefix("refs/heads/"))
            .map(String::from);
        Ok(upstream)
    }

    fn resolve_commit(&self, rev: &str) -> Result<CommitId> {
        if rev.is_empty() || rev.starts_with('-') {
            return Err(Error::RefNotFound(rev.to_string()));
        }
        let cmd = self
            .git()
            .args(["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")]);
        let output = cmd.output()?;
        if output.status.success() {
            CommitId::parse(&String::from_utf8_lossy(&output.stdout))
        } else {
            Err(Error::RefNotFound(rev.to_string()))
        }
    }

    fn merge_base(&self, one: &CommitId, two: &CommitId) -> Result<Option<CommitId>> {
        let cmd = self.git().args(["merge-base", one.as_str(), two.as_str()]);
        let output = cmd.output()?;
        // Exit 1 with no output = no common ancestor
        match output.status.code() {
            Some(0) => CommitId::parse(&String::from_utf8_lossy(&output.stdout)).map(Some),
            Some(1) => Ok(None),
            _ => Err(cmd.failure(&output)),
        }
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        let cmd = self.git().args([
            "merge-base",
            "--is-ancestor",
            ancestor.as_str(),
            descendant.as_str(),
        ]);
        let output = cmd.output()?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(cmd.failure(&output)),
        }
    }

    fn branches_not_containing(&self, commit: &CommitId) -> Result<Vec<String>> {
        let listing = self
            .git()
            .args([
                "for-each-ref",
                "--no-contains",
                commit.as_str(),
                "--format=%(refname:short)",
                "refs/heads/",
            ])
            .stdout()?;
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn rebase_onto(&self, branch: &str, onto: &CommitId, upstream: &CommitId) -> Result<()> {
        let cmd = self
            .git()
            .args(["rebase", "--onto", onto.as_str(), upstream.as_str(), branch]);
        let output = cmd.output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(self.rebase_failure(&cmd, &output))
        }
    }

    fn rebase_continue(&self) -> Result<()> {
        let cmd = self
            .git()
            .args(["rebase", "--continue"])
            .env("GIT_EDITOR", "true");
        let output = cmd.output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(self.rebase_failure(&cmd, &output))
        }
    }

    fn rebase_abort(&self) -> Result<()> {
        self.git().args(["rebase", "--abort"]).run()?;
        Ok(())
    }

    fn conflicting_files(&self) -> Result<Vec<String>> {
        let listing = self
            .git()
            .args(["diff", "--name-only", "--diff-filter=U"])
            .stdout()?;
        Ok(listing.lines().map(String::from).collect())
    }

    fn reset_branch(&self, branch: &str, commit: &CommitId) -> Result<()> {
        let checked_out = matches!(self.head(), Ok(Head::Branch(ref name)) if name == branch);
        if checked_out {
            self.git().args(["reset", "--hard", commit.as_str()]).run()?;
        } else {
            self.git()
                .args([
                    "update-ref",
                    "-m",
                    &format!("rebranch: reset {branch} to {}", commit.short()),
                    &format!("refs/heads/{branch}"),
                    commit.as_str(),
                ])
                .run()?;
        }
        Ok(())
    }

    fn checkout(&self, head: &Head) -> Result<()> {
        let cmd = match head {
            Head::Branch(name) => self.git().args(["checkout", name.as_str(), "--"]),
            Head::Detached(commit) => self.git().args([
                "-c",
                "advice.detachedHead=false",
                "checkout",
                "--detach",
                commit.as_str(),
            ]),
        };
        cmd.run()?;
        Ok(())
    }

    fn stash_push(&self) -> Result<bool> {
        let count = || -> Result<usize> {
            Ok(self.git().args(["stash", "list"]).stdout()?.lines().count())
        };
        let before = count()?;
        self.git()
            .args(["stash", "push", "--include-untracked", "-m", "rebranch autostash"])
            .run()?;
        Ok(count()? > before)
    }

    fn stash_pop(&self) -> Result<()> {
        self.git().args(["stash", "pop"]).run()?;
        Ok(())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}
