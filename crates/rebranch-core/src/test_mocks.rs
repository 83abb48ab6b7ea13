//! In-memory implementations of `GitOps` and `StateStore` for unit tests.
//!
//! `FakeGit` keeps a small commit DAG and replays rebases by minting new
//! commits, so planner and executor logic can be checked without a real
//! repository.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use rebranch_git::{CommitId, GitOps, Head, Result as GitResult};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::state::RunState;
use crate::traits::StateStore;

struct PendingRebase {
    branch: String,
    onto: CommitId,
    replay: Vec<CommitId>,
}

/// Fake git repository backed by an in-memory commit graph.
pub struct FakeGit {
    parents: RefCell<Vec<(CommitId, Vec<CommitId>)>>,
    branches: RefCell<BTreeMap<String, CommitId>>,
    upstreams: RefCell<HashMap<String, String>>,
    head: RefCell<Head>,
    pending: RefCell<Option<PendingRebase>>,
    unresolved: RefCell<Vec<String>>,
    conflicts: RefCell<HashMap<String, Vec<String>>>,
    continue_conflicts: RefCell<Vec<Vec<String>>>,
    failures: RefCell<HashSet<String>>,
    dirty: Cell<bool>,
    stashes: Cell<usize>,
    /// Branches passed to `rebase_onto`, in call order.
    pub rebased: RefCell<Vec<String>>,
}

impl Default for FakeGit {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGit {
    pub fn new() -> Self {
        Self {
            parents: RefCell::new(vec![]),
            branches: RefCell::new(BTreeMap::new()),
            upstreams: RefCell::new(HashMap::new()),
            head: RefCell::new(Head::Branch("main".to_string())),
            pending: RefCell::new(None),
            unresolved: RefCell::new(vec![]),
            conflicts: RefCell::new(HashMap::new()),
            continue_conflicts: RefCell::new(vec![]),
            failures: RefCell::new(HashSet::new()),
            dirty: Cell::new(false),
            stashes: Cell::new(0),
            rebased: RefCell::new(vec![]),
        }
    }

    /// Mint a commit with the given parents.
    pub fn commit(&self, parents: &[&CommitId]) -> CommitId {
        let mut graph = self.parents.borrow_mut();
        let id = CommitId::parse(&format!("{:040x}", graph.len() + 1)).unwrap();
        graph.push((id.clone(), parents.iter().map(|&p| p.clone()).collect()));
        id
    }

    /// Mint a linear chain of `n` commits on top of `base`, returning the tip.
    pub fn chain(&self, base: &CommitId, n: usize) -> CommitId {
        let mut tip = base.clone();
        for _ in 0..n {
            tip = self.commit(&[&tip]);
        }
        tip
    }

    pub fn set_branch(&self, name: &str, tip: &CommitId) {
        self.branches
            .borrow_mut()
            .insert(name.to_string(), tip.clone());
    }

    pub fn remove_branch(&self, name: &str) {
        self.branches.borrow_mut().remove(name);
    }

    pub fn set_upstream(&self, branch: &str, upstream: &str) {
        self.upstreams
            .borrow_mut()
            .insert(branch.to_string(), upstream.to_string());
    }

    pub fn set_head(&self, head: Head) {
        *self.head.borrow_mut() = head;
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.set(dirty);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn stash_depth(&self) -> usize {
        self.stashes.get()
    }

    /// The next rebase of `branch` stops on conflicts in `files`.
    pub fn conflict_on(&self, branch: &str, files: &[&str]) {
        self.conflicts.borrow_mut().insert(
            branch.to_string(),
            files.iter().map(ToString::to_string).collect(),
        );
    }

    /// The next `rebase_continue` stops on a later commit with conflicts in `files`.
    pub fn conflict_on_continue(&self, files: &[&str]) {
        self.continue_conflicts
            .borrow_mut()
            .push(files.iter().map(ToString::to_string).collect());
    }

    /// The next rebase of `branch` fails outright.
    pub fn fail_on(&self, branch: &str) {
        self.failures.borrow_mut().insert(branch.to_string());
    }

    /// Pretend the user resolved and staged every conflicted file.
    pub fn resolve_conflicts(&self) {
        self.unresolved.borrow_mut().clear();
    }

    /// Pretend the user ran `git rebase --continue` themselves.
    pub fn finish_rebase_by_hand(&self) {
        self.resolve_conflicts();
        self.complete_pending();
    }

    pub fn tip(&self, branch: &str) -> CommitId {
        self.branches.borrow()[branch].clone()
    }

    pub fn current_head(&self) -> Head {
        self.head.borrow().clone()
    }

    fn parents_of(&self, commit: &CommitId) -> Vec<CommitId> {
        self.parents
            .borrow()
            .iter()
            .find(|(id, _)| id == commit)
            .map(|(_, parents)| parents.clone())
            .unwrap_or_default()
    }

    fn exists(&self, commit: &CommitId) -> bool {
        self.parents.borrow().iter().any(|(id, _)| id == commit)
    }

    fn ancestors(&self, commit: &CommitId) -> HashSet<CommitId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([commit.clone()]);
        while let Some(next) = queue.pop_front() {
            if seen.insert(next.clone()) {
                queue.extend(self.parents_of(&next));
            }
        }
        seen
    }

    /// Commits reachable from `tip` but not from `upstream`, oldest first.
    fn to_replay(&self, tip: &CommitId, upstream: &CommitId) -> Vec<CommitId> {
        let excluded = self.ancestors(upstream);
        let mut replay = vec![];
        let mut current = Some(tip.clone());
        while let Some(commit) = current.filter(|c| !excluded.contains(c)) {
            current = self.parents_of(&commit).into_iter().next();
            replay.push(commit);
        }
        replay.reverse();
        replay
    }

    fn complete_pending(&self) {
        let Some(pending) = self.pending.borrow_mut().take() else {
            return;
        };
        let new_tip = self.chain(&pending.onto, pending.replay.len());
        self.set_branch(&pending.branch, &new_tip);
        self.set_head(Head::Branch(pending.branch));
    }

    fn order(&self, commit: &CommitId) -> usize {
        self.parents
            .borrow()
            .iter()
            .position(|(id, _)| id == commit)
            .unwrap_or(0)
    }
}

impl GitOps for FakeGit {
    fn head(&self) -> GitResult<Head> {
        Ok(self.head.borrow().clone())
    }

    fn is_rebasing(&self) -> bool {
        self.pending.borrow().is_some()
    }

    fn is_clean(&self) -> GitResult<bool> {
        Ok(!self.dirty.get())
    }

    fn branch_tip(&self, name: &str) -> GitResult<CommitId> {
        self.branches
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| rebranch_git::Error::BranchNotFound(name.to_string()))
    }

    fn local_upstream(&self, name: &str) -> GitResult<Option<String>> {
        Ok(self
            .upstreams
            .borrow()
            .get(name)
            .filter(|upstream| self.branches.borrow().contains_key(upstream.as_str()))
            .cloned())
    }

    fn resolve_commit(&self, rev: &str) -> GitResult<CommitId> {
        if let Ok(tip) = self.branch_tip(rev) {
            return Ok(tip);
        }
        CommitId::parse(rev)
            .ok()
            .filter(|id| self.exists(id))
            .ok_or_else(|| rebranch_git::Error::RefNotFound(rev.to_string()))
    }

    fn merge_base(&self, one: &CommitId, two: &CommitId) -> GitResult<Option<CommitId>> {
        let left = self.ancestors(one);
        let right = self.ancestors(two);
        Ok(left
            .intersection(&right)
            .max_by_key(|c| self.order(c))
            .cloned())
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> GitResult<bool> {
        Ok(self.ancestors(descendant).contains(ancestor))
    }

    fn branches_not_containing(&self, commit: &CommitId) -> GitResult<Vec<String>> {
        Ok(self
            .branches
            .borrow()
            .iter()
            .filter(|(_, tip)| !self.ancestors(tip).contains(commit))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn rebase_onto(&self, branch: &str, onto: &CommitId, upstream: &CommitId) -> GitResult<()> {
        self.rebased.borrow_mut().push(branch.to_string());
        if self.failures.borrow_mut().remove(branch) {
            return Err(rebranch_git::Error::CommandFailed {
                command: format!("git rebase --onto {onto} {upstream} {branch}"),
                code: Some(128),
                stderr: "fatal: simulated failure".to_string(),
            });
        }

        let tip = self.branch_tip(branch)?;
        *self.pending.borrow_mut() = Some(PendingRebase {
            branch: branch.to_string(),
            onto: onto.clone(),
            replay: self.to_replay(&tip, upstream),
        });
        self.set_head(Head::Detached(onto.clone()));

        if let Some(files) = self.conflicts.borrow_mut().remove(branch) {
            self.unresolved.borrow_mut().clone_from(&files);
            return Err(rebranch_git::Error::RebaseConflict(files));
        }
        self.complete_pending();
        Ok(())
    }

    fn rebase_continue(&self) -> GitResult<()> {
        let unresolved = self.unresolved.borrow().clone();
        if !unresolved.is_empty() {
            return Err(rebranch_git::Error::RebaseConflict(unresolved));
        }
        let next = self.continue_conflicts.borrow_mut().pop();
        if let Some(files) = next {
            self.unresolved.borrow_mut().clone_from(&files);
            return Err(rebranch_git::Error::RebaseConflict(files));
        }
        self.complete_pending();
        Ok(())
    }

    fn rebase_abort(&self) -> GitResult<()> {
        if let Some(pending) = self.pending.borrow_mut().take() {
            self.set_head(Head::Branch(pending.branch));
        }
        self.unresolved.borrow_mut().clear();
        Ok(())
    }

    fn conflicting_files(&self) -> GitResult<Vec<String>> {
        Ok(self.unresolved.borrow().clone())
    }

    fn reset_branch(&self, branch: &str, commit: &CommitId) -> GitResult<()> {
        self.set_branch(branch, commit);
        Ok(())
    }

    fn checkout(&self, head: &Head) -> GitResult<()> {
        self.set_head(head.clone());
        Ok(())
    }

    fn stash_push(&self) -> GitResult<bool> {
        if !self.dirty.get() {
            return Ok(false);
        }
        self.dirty.set(false);
        self.stashes.set(self.stashes.get() + 1);
        Ok(true)
    }

    fn stash_pop(&self) -> GitResult<()> {
        let depth = self.stashes.get();
        if depth == 0 {
            return Err(rebranch_git::Error::CommandFailed {
                command: "git stash pop".to_string(),
                code: Some(1),
                stderr: "No stash entries found.".to_string(),
            });
        }
        self.stashes.set(depth - 1);
        self.dirty.set(true);
        Ok(())
    }
}

/// In-memory run state store.
#[derive(Default)]
pub struct MockStateStore {
    pub run: RefCell<Option<RunState>>,
    pub config: Config,
    /// Number of successful writes of the run record.
    pub writes: Cell<usize>,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MockStateStore {
    fn is_run_in_progress(&self) -> bool {
        self.run.borrow().is_some()
    }

    fn load_run(&self) -> Result<RunState> {
        self.run.borrow().clone().ok_or(Error::NoRunInProgress)
    }

    fn begin_run(&self, state: &RunState) -> Result<()> {
        if self.is_run_in_progress() {
            return Err(Error::RunInProgress);
        }
        self.save_run(state)
    }

    fn save_run(&self, state: &RunState) -> Result<()> {
        *self.run.borrow_mut() = Some(state.clone());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn clear_run(&self) -> Result<()> {
        *self.run.borrow_mut() = None;
        Ok(())
    }

    fn load_config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }
}
