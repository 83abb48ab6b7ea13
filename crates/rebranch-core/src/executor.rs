//! Rebase execution with a persisted, resumable run record.
//!
//! A run walks the plan one step at a time and saves the record after every
//! attempt. Conflicts and git failures pause the run instead of unwinding
//! it; `resume` picks up at the paused step and `abort` rolls every touched
//! branch back to where it started.

use rebranch_git::{CommitId, GitOps, Head};
use serde::Serialize;

use crate::config::GeneralConfig;
use crate::error::{Error, Result};
use crate::inspect::{BaseRef, Inspector};
use crate::plan::{PlanStep, RebasePlan};
use crate::state::RunState;
use crate::traits::StateStore;

/// Options for starting a run.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Stash local changes for the duration of the run.
    pub autostash: bool,
    /// Return to the original HEAD when the run ends.
    pub restore_head: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self::from(&GeneralConfig::default())
    }
}

impl From<&GeneralConfig> for ExecuteOptions {
    fn from(config: &GeneralConfig) -> Self {
        Self {
            autostash: config.autostash,
            restore_head: config.restore_head,
        }
    }
}

/// How a branch fared in a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchResult {
    pub branch: String,
    pub old_tip: CommitId,
    pub new_tip: CommitId,
    pub changed: bool,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: BaseRef,
    pub branches: Vec<BranchResult>,
    /// Where HEAD was put back, if it was.
    pub head: Option<Head>,
    /// Whether stashed local changes were re-applied.
    pub stash_restored: bool,
    /// Cleanup that did not succeed.
    pub warnings: Vec<String>,
}

/// Summary of an aborted run.
#[derive(Debug, Clone, Serialize)]
pub struct AbortReport {
    /// Branches reset to their original tips.
    pub restored: Vec<String>,
    pub head: Option<Head>,
    pub stash_restored: bool,
    pub warnings: Vec<String>,
}

/// What a `start` or `resume` call ended with.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step applied; the record is gone.
    Completed(RunReport),
    /// Paused on conflicts in `branch`; resolve them, then resume or abort.
    Conflicted {
        branch: String,
        files: Vec<String>,
        completed: usize,
        total: usize,
    },
    /// A step failed for a reason other than a conflict.
    Failed {
        branch: String,
        error: String,
        completed: usize,
        total: usize,
    },
}

/// Executes rebase plans against a repository and a state store.
pub struct Executor<'a, G: GitOps, S: StateStore> {
    git: &'a G,
    store: &'a S,
}

impl<'a, G: GitOps, S: StateStore> Executor<'a, G, S> {
    #[must_use]
    pub const fn new(git: &'a G, store: &'a S) -> Self {
        Self { git, store }
    }

    /// Start a new run.
    ///
    /// # Errors
    /// - `RunInProgress` if a run record already exists
    /// - `ExternalRebaseInProgress` if git is mid-rebase
    /// - `InvalidPlan` if the plan's ordering is broken
    /// - a git error if the tree is dirty and autostash is off
    ///
    /// None of these touch the repository.
    pub fn start(&self, plan: RebasePlan, options: ExecuteOptions) -> Result<RunOutcome> {
        if self.store.is_run_in_progress() {
            return Err(Error::RunInProgress);
        }
        if self.git.is_rebasing() {
            return Err(Error::ExternalRebaseInProgress);
        }
        plan.validate()?;
        if !options.autostash && !self.git.is_clean()? {
            return Err(rebranch_git::Error::DirtyWorkingDirectory.into());
        }

        let original_head = if options.restore_head {
            Some(Inspector::new(self.git).current_head()?)
        } else {
            None
        };
        let mut run = RunState::new(plan, original_head);
        self.store.begin_run(&run)?;
        tracing::info!(
            base = %run.plan.target.spec,
            steps = run.plan.len(),
            "run started"
        );

        if options.autostash {
            match self.git.stash_push() {
                Ok(true) => {
                    run.stashed = true;
                    self.store.save_run(&run)?;
                }
                Ok(false) => {}
                Err(e) => {
                    if let Err(clear) = self.store.clear_run() {
                        tracing::warn!("failed to remove run record: {clear}");
                    }
                    return Err(e.into());
                }
            }
        }

        self.run_steps(run)
    }

    /// Continue a paused run.
    ///
    /// Completed steps are never re-applied. A step the user finished by
    /// hand is recorded as done; a step that never applied is attempted again.
    ///
    /// # Errors
    /// Returns `NoRunInProgress` if there is no run record.
    pub fn resume(&self) -> Result<RunOutcome> {
        let mut run = self.store.load_run()?;
        let Some(step) = run.current().cloned() else {
            return self.finish(run);
        };
        tracing::info!(branch = %step.branch, status = %run.status, "resuming run");

        if self.git.is_rebasing() {
            let files = self.git.conflicting_files()?;
            if !files.is_empty() {
                return self.conflicted(&mut run, &step, files);
            }
            match self.git.rebase_continue() {
                Ok(()) => self.step_done(&mut run, &step)?,
                Err(rebranch_git::Error::RebaseConflict(files)) => {
                    return self.conflicted(&mut run, &step, files);
                }
                Err(e) => return self.failed(&mut run, &step, e.to_string()),
            }
        } else if self.finished_by_hand(&run, &step)? {
            tracing::info!(branch = %step.branch, "step already applied");
            self.step_done(&mut run, &step)?;
        }

        self.run_steps(run)
    }

    /// Roll back a run: abort git's rebase, reset the branches this run
    /// rebased to their original tips, restore HEAD and local changes, drop
    /// the record.
    ///
    /// Only completed steps are rolled back, plus the current step when the
    /// user finished its rebase by hand. Branches the run never reached keep
    /// whatever the user did to them.
    ///
    /// # Errors
    /// Returns `NoRunInProgress` if there is no run record. If a reset fails
    /// the record is kept so abort can be retried.
    pub fn abort(&self) -> Result<AbortReport> {
        let run = self.store.load_run()?;
        let rebasing = self.git.is_rebasing();

        let mut touched: Vec<&PlanStep> = run.completed().iter().collect();
        if let Some(step) = run.current() {
            if !rebasing && self.finished_by_hand(&run, step)? {
                touched.push(step);
            }
        }
        if rebasing {
            self.git.rebase_abort()?;
        }

        let mut restored = vec![];
        for step in touched {
            let Some(original) = run.original_tips.get(step.branch.as_str()) else {
                continue;
            };
            let moved = match self.git.branch_tip(&step.branch) {
                Ok(tip) => tip != *original,
                Err(rebranch_git::Error::BranchNotFound(_)) => true,
                Err(e) => return Err(e.into()),
            };
            if moved {
                self.git.reset_branch(&step.branch, original)?;
                tracing::info!(branch = %step.branch, tip = %original.short(), "branch restored");
                restored.push(step.branch.to_string());
            }
        }

        let mut warnings = vec![];
        let head = self.restore_head(&run, &mut warnings);
        let stash_restored = self.restore_stash(&run, &mut warnings);
        self.store.clear_run()?;
        tracing::info!(restored = restored.len(), "run aborted");

        Ok(AbortReport {
            restored,
            head,
            stash_restored,
            warnings,
        })
    }

    /// The current run record, if a run is in progress.
    ///
    /// # Errors
    /// Returns error if the record exists but cannot be read.
    pub fn status(&self) -> Result<Option<RunState>> {
        if !self.store.is_run_in_progress() {
            return Ok(None);
        }
        self.store.load_run().map(Some)
    }

    fn run_steps(&self, mut run: RunState) -> Result<RunOutcome> {
        while let Some(step) = run.current().cloned() {
            if let Some(paused) = self.apply(&mut run, &step)? {
                return Ok(paused);
            }
        }
        self.finish(run)
    }

    fn apply(&self, run: &mut RunState, step: &PlanStep) -> Result<Option<RunOutcome>> {
        let tip = match self.git.branch_tip(&step.branch) {
            Ok(tip) => tip,
            Err(rebranch_git::Error::BranchNotFound(_)) => {
                let message = format!("branch '{}' no longer exists", step.branch);
                return self.failed(run, step, message).map(Some);
            }
            Err(e) => return Err(e.into()),
        };
        if tip != step.old_tip {
            let message = format!(
                "branch '{}' moved from {} to {} after the run was planned",
                step.branch,
                step.old_tip.short(),
                tip.short()
            );
            return self.failed(run, step, message).map(Some);
        }
        let Some(onto) = run.resolve_onto(step) else {
            let message = format!("no rebased tip recorded for the base of '{}'", step.branch);
            return self.failed(run, step, message).map(Some);
        };

        tracing::info!(
            branch = %step.branch,
            onto = %onto.short(),
            step = run.current_step + 1,
            of = run.plan.len(),
            "rebasing"
        );
        match self.git.rebase_onto(&step.branch, &onto, &step.upstream) {
            Ok(()) => {
                self.step_done(run, step)?;
                Ok(None)
            }
            Err(rebranch_git::Error::RebaseConflict(files)) => {
                self.conflicted(run, step, files).map(Some)
            }
            Err(e) => self.failed(run, step, e.to_string()).map(Some),
        }
    }

    fn step_done(&self, run: &mut RunState, step: &PlanStep) -> Result<()> {
        let new_tip = self.git.branch_tip(&step.branch)?;
        tracing::debug!(branch = %step.branch, tip = %new_tip.short(), "step applied");
        run.advance(new_tip);
        self.store.save_run(run)
    }

    /// Whether git is idle and the branch already sits on its resolved base.
    fn finished_by_hand(&self, run: &RunState, step: &PlanStep) -> Result<bool> {
        let tip = match self.git.branch_tip(&step.branch) {
            Ok(tip) => tip,
            Err(rebranch_git::Error::BranchNotFound(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if tip == step.old_tip {
            return Ok(false);
        }
        match run.resolve_onto(step) {
            Some(onto) => Ok(self.git.is_ancestor(&onto, &tip)?),
            None => Ok(false),
        }
    }

    fn conflicted(
        &self,
        run: &mut RunState,
        step: &PlanStep,
        files: Vec<String>,
    ) -> Result<RunOutcome> {
        tracing::info!(branch = %step.branch, files = files.len(), "paused on conflict");
        run.mark_conflicted(files.clone());
        self.store.save_run(run)?;
        Ok(RunOutcome::Conflicted {
            branch: step.branch.to_string(),
            files,
            completed: run.current_step,
            total: run.plan.len(),
        })
    }

    fn failed(&self, run: &mut RunState, step: &PlanStep, error: String) -> Result<RunOutcome> {
        tracing::warn!(branch = %step.branch, "step failed: {error}");
        run.mark_failed(error.clone());
        self.store.save_run(run)?;
        Ok(RunOutcome::Failed {
            branch: step.branch.to_string(),
            error,
            completed: run.current_step,
            total: run.plan.len(),
        })
    }

    fn finish(&self, run: RunState) -> Result<RunOutcome> {
        let mut warnings = vec![];
        let head = self.restore_head(&run, &mut warnings);
        let stash_restored = self.restore_stash(&run, &mut warnings);
        self.store.clear_run()?;

        let branches = run
            .plan
            .steps
            .iter()
            .map(|step| {
                let branch = step.branch.to_string();
                let old_tip = run
                    .original_tips
                    .get(&branch)
                    .cloned()
                    .unwrap_or_else(|| step.old_tip.clone());
                let new_tip = run
                    .new_tips
                    .get(&branch)
                    .cloned()
                    .unwrap_or_else(|| old_tip.clone());
                BranchResult {
                    changed: old_tip != new_tip,
                    branch,
                    old_tip,
                    new_tip,
                }
            })
            .collect::<Vec<_>>();
        tracing::info!(
            changed = branches.iter().filter(|b| b.changed).count(),
            "run completed"
        );

        Ok(RunOutcome::Completed(RunReport {
            target: run.plan.target,
            branches,
            head,
            stash_restored,
            warnings,
        }))
    }

    fn restore_head(&self, run: &RunState, warnings: &mut Vec<String>) -> Option<Head> {
        let head = run.original_head.as_ref()?;
        match self.git.checkout(head) {
            Ok(()) => Some(head.clone()),
            Err(e) => {
                tracing::warn!("failed to restore HEAD to {head}: {e}");
                warnings.push(format!("could not check out {head} again: {e}"));
                None
            }
        }
    }

    fn restore_stash(&self, run: &RunState, warnings: &mut Vec<String>) -> bool {
        if !run.stashed {
            return false;
        }
        match self.git.stash_pop() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to pop stash: {e}");
                warnings.push(format!(
                    "local changes are still stashed, run `git stash pop` to restore them: {e}"
                ));
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graph::{DependencyGraph, GraphOptions};
    use crate::inspect::Inspector;
    use crate::state::RunStatus;
    use crate::test_mocks::{FakeGit, MockStateStore};

    /// main advanced past `root`; feature-a was cut from `root` and
    /// feature-b from feature-a.
    fn stacked() -> FakeGit {
        let git = FakeGit::new();
        let root = git.commit(&[]);
        git.set_branch("main", &git.chain(&root, 2));
        let a = git.chain(&root, 2);
        git.set_branch("feature-a", &a);
        git.set_branch("feature-b", &git.chain(&a, 1));
        git.set_head(Head::Branch("feature-b".into()));
        git
    }

    fn plan_for(git: &FakeGit, names: &[&str]) -> RebasePlan {
        let inspector = Inspector::new(git);
        let base = inspector.resolve_base("main").unwrap();
        let graph =
            DependencyGraph::build(&inspector, names, base, GraphOptions::default()).unwrap();
        RebasePlan::from_graph(&inspector, &graph).unwrap()
    }

    fn start(git: &FakeGit, store: &MockStateStore) -> RunOutcome {
        let plan = plan_for(git, &["feature-a", "feature-b"]);
        Executor::new(git, store)
            .start(plan, ExecuteOptions::default())
            .unwrap()
    }

    fn is_ancestor(git: &FakeGit, a: &CommitId, b: &CommitId) -> bool {
        git.is_ancestor(a, b).unwrap()
    }

    #[test]
    fn test_stacked_branch_lands_on_new_parent_tip() {
        let git = stacked();
        let store = MockStateStore::new();
        let old_a = git.tip("feature-a");

        let RunOutcome::Completed(report) = start(&git, &store) else {
            panic!("run did not complete");
        };

        let main = git.tip("main");
        let new_a = git.tip("feature-a");
        let new_b = git.tip("feature-b");
        assert!(is_ancestor(&git, &main, &new_a));
        assert!(is_ancestor(&git, &new_a, &new_b));
        assert!(!is_ancestor(&git, &old_a, &new_b));

        assert_eq!(report.branches.len(), 2);
        assert!(report.branches.iter().all(|b| b.changed));
        assert_eq!(report.branches[1].new_tip, new_b);
        assert_eq!(report.head, Some(Head::Branch("feature-b".into())));
        assert!(!store.is_run_in_progress());
        assert_eq!(git.current_head(), Head::Branch("feature-b".into()));
    }

    #[test]
    fn test_conflict_pauses_then_resume_continues() {
        let git = stacked();
        let store = MockStateStore::new();
        git.conflict_on("feature-b", &["src/lib.rs"]);

        match start(&git, &store) {
            RunOutcome::Conflicted {
                branch,
                files,
                completed,
                total,
            } => {
                assert_eq!(branch, "feature-b");
                assert_eq!(files, vec!["src/lib.rs"]);
                assert_eq!((completed, total), (1, 2));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let record = store.load_run().unwrap();
        assert_eq!(record.status, RunStatus::Conflicted);
        assert_eq!(record.current_step, 1);

        git.resolve_conflicts();
        let outcome = Executor::new(&git, &store).resume().unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(*git.rebased.borrow(), vec!["feature-a", "feature-b"]);
        assert!(is_ancestor(&git, &git.tip("feature-a"), &git.tip("feature-b")));
        assert!(!store.is_run_in_progress());
    }

    #[test]
    fn test_resume_with_unresolved_files_reports_conflict_again() {
        let git = stacked();
        let store = MockStateStore::new();
        git.conflict_on("feature-a", &["a.txt"]);
        start(&git, &store);

        let outcome = Executor::new(&git, &store).resume().unwrap();
        assert!(matches!(outcome, RunOutcome::Conflicted { completed: 0, .. }));
        assert_eq!(store.load_run().unwrap().current_step, 0);
        assert!(git.is_rebasing());
    }

    #[test]
    fn test_resume_accepts_step_finished_by_hand() {
        let git = stacked();
        let store = MockStateStore::new();
        git.conflict_on("feature-b", &["b.txt"]);
        start(&git, &store);

        git.finish_rebase_by_hand();
        let outcome = Executor::new(&git, &store).resume().unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(git.rebased.borrow().len(), 2);
    }

    #[test]
    fn test_failed_step_is_retried_on_resume() {
        let git = stacked();
        let store = MockStateStore::new();
        git.fail_on("feature-a");

        match start(&git, &store) {
            RunOutcome::Failed { branch, error, .. } => {
                assert_eq!(branch, "feature-a");
                assert!(error.contains("simulated failure"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let record = store.load_run().unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.last_error.is_some());

        let outcome = Executor::new(&git, &store).resume().unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(
            *git.rebased.borrow(),
            vec!["feature-a", "feature-a", "feature-b"]
        );
    }

    #[test]
    fn test_abort_restores_touched_branches() {
        let git = stacked();
        let store = MockStateStore::new();
        let old_a = git.tip("feature-a");
        let old_b = git.tip("feature-b");
        git.conflict_on("feature-b", &["b.txt"]);
        start(&git, &store);
        assert_ne!(git.tip("feature-a"), old_a);

        let report = Executor::new(&git, &store).abort().unwrap();
        assert_eq!(report.restored, vec!["feature-a"]);
        assert_eq!(git.tip("feature-a"), old_a);
        assert_eq!(git.tip("feature-b"), old_b);
        assert!(!git.is_rebasing());
        assert!(!store.is_run_in_progress());
        assert_eq!(git.current_head(), Head::Branch("feature-b".into()));
    }

    #[test]
    fn test_abort_leaves_branches_the_run_never_reached() {
        let git = stacked();
        let store = MockStateStore::new();
        let old_a = git.tip("feature-a");
        git.conflict_on("feature-a", &["a.txt"]);
        start(&git, &store);

        // The user keeps working on feature-b while the run is paused.
        let later = git.chain(&git.tip("feature-b"), 1);
        git.set_branch("feature-b", &later);

        let report = Executor::new(&git, &store).abort().unwrap();
        assert!(report.restored.is_empty());
        assert_eq!(git.tip("feature-a"), old_a);
        assert_eq!(git.tip("feature-b"), later);
        assert!(!store.is_run_in_progress());
    }

    #[test]
    fn test_abort_keeps_commits_on_a_branch_that_moved_after_planning() {
        let git = stacked();
        let store = MockStateStore::new();
        let plan = plan_for(&git, &["feature-a", "feature-b"]);
        let moved = git.chain(&git.tip("feature-a"), 1);
        git.set_branch("feature-a", &moved);

        let outcome = Executor::new(&git, &store)
            .start(plan, ExecuteOptions::default())
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Failed { .. }));

        let report = Executor::new(&git, &store).abort().unwrap();
        assert!(report.restored.is_empty());
        assert_eq!(git.tip("feature-a"), moved);
    }

    #[test]
    fn test_abort_resets_step_finished_by_hand() {
        let git = stacked();
        let store = MockStateStore::new();
        let old_a = git.tip("feature-a");
        let old_b = git.tip("feature-b");
        git.conflict_on("feature-b", &["b.txt"]);
        start(&git, &store);
        git.finish_rebase_by_hand();
        assert_ne!(git.tip("feature-b"), old_b);

        let report = Executor::new(&git, &store).abort().unwrap();
        assert_eq!(report.restored, vec!["feature-a", "feature-b"]);
        assert_eq!(git.tip("feature-a"), old_a);
        assert_eq!(git.tip("feature-b"), old_b);
    }

    #[test]
    fn test_abort_recreates_rebased_branch_that_was_deleted() {
        let git = stacked();
        let store = MockStateStore::new();
        let old_a = git.tip("feature-a");
        git.conflict_on("feature-b", &["b.txt"]);
        start(&git, &store);
        git.remove_branch("feature-a");

        let report = Executor::new(&git, &store).abort().unwrap();
        assert_eq!(report.restored, vec!["feature-a"]);
        assert_eq!(git.tip("feature-a"), old_a);
    }

    #[test]
    fn test_branch_deleted_before_its_step_fails_the_run() {
        let git = stacked();
        let store = MockStateStore::new();
        let plan = plan_for(&git, &["feature-a", "feature-b"]);
        git.remove_branch("feature-b");

        match Executor::new(&git, &store)
            .start(plan, ExecuteOptions::default())
            .unwrap()
        {
            RunOutcome::Failed {
                branch,
                error,
                completed,
                ..
            } => {
                assert_eq!(branch, "feature-b");
                assert!(error.contains("no longer exists"));
                assert_eq!(completed, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*git.rebased.borrow(), vec!["feature-a"]);
        assert_eq!(store.load_run().unwrap().status, RunStatus::Failed);
    }

    #[test]
    fn test_resume_stops_on_conflict_in_a_later_commit() {
        let git = stacked();
        let store = MockStateStore::new();
        git.conflict_on("feature-b", &["first.txt"]);
        start(&git, &store);

        git.conflict_on_continue(&["second.txt"]);
        git.resolve_conflicts();
        match Executor::new(&git, &store).resume().unwrap() {
            RunOutcome::Conflicted {
                branch,
                files,
                completed,
                ..
            } => {
                assert_eq!(branch, "feature-b");
                assert_eq!(files, vec!["second.txt"]);
                assert_eq!(completed, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(git.is_rebasing());
        assert_eq!(store.load_run().unwrap().conflict_files, vec!["second.txt"]);

        git.resolve_conflicts();
        let outcome = Executor::new(&git, &store).resume().unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(*git.rebased.borrow(), vec!["feature-a", "feature-b"]);
    }

    #[test]
    fn test_start_refuses_when_run_exists() {
        let git = stacked();
        let store = MockStateStore::new();
        git.conflict_on("feature-a", &["a.txt"]);
        start(&git, &store);
        git.rebase_abort().unwrap();
        let before = (git.tip("feature-a"), git.tip("feature-b"));
        let calls = git.rebased.borrow().len();

        let plan = plan_for(&git, &["feature-a", "feature-b"]);
        let err = Executor::new(&git, &store)
            .start(plan, ExecuteOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::RunInProgress));
        assert_eq!((git.tip("feature-a"), git.tip("feature-b")), before);
        assert_eq!(git.rebased.borrow().len(), calls);
    }

    #[test]
    fn test_start_refuses_external_rebase() {
        let git = stacked();
        let store = MockStateStore::new();
        let plan = plan_for(&git, &["feature-a", "feature-b"]);
        git.conflict_on("feature-a", &["a.txt"]);
        let main = git.tip("main");
        let _ = git.rebase_onto("feature-a", &main, &main);

        let err = Executor::new(&git, &store)
            .start(plan, ExecuteOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ExternalRebaseInProgress));
        assert!(!store.is_run_in_progress());
    }

    #[test]
    fn test_autostash_round_trip() {
        let git = stacked();
        let store = MockStateStore::new();
        git.set_dirty(true);

        let RunOutcome::Completed(report) = start(&git, &store) else {
            panic!("run did not complete");
        };
        assert!(report.stash_restored);
        assert!(git.is_dirty());
        assert_eq!(git.stash_depth(), 0);
    }

    #[test]
    fn test_dirty_tree_without_autostash_is_refused() {
        let git = stacked();
        let store = MockStateStore::new();
        git.set_dirty(true);
        let plan = plan_for(&git, &["feature-a"]);
        let options = ExecuteOptions {
            autostash: false,
            restore_head: true,
        };

        let err = Executor::new(&git, &store).start(plan, options).unwrap_err();
        assert!(matches!(
            err,
            Error::Git(rebranch_git::Error::DirtyWorkingDirectory)
        ));
        assert!(!store.is_run_in_progress());
        assert!(git.rebased.borrow().is_empty());
    }

    #[test]
    fn test_branch_moved_since_planning_fails_the_run() {
        let git = stacked();
        let store = MockStateStore::new();
        let plan = plan_for(&git, &["feature-a", "feature-b"]);
        let moved = git.chain(&git.tip("feature-a"), 1);
        git.set_branch("feature-a", &moved);

        let outcome = Executor::new(&git, &store)
            .start(plan, ExecuteOptions::default())
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Failed { ref branch, .. } if branch == "feature-a"));
        assert!(git.rebased.borrow().is_empty());
        assert!(store.is_run_in_progress());
    }

    #[test]
    fn test_detached_head_is_restored() {
        let git = stacked();
        let store = MockStateStore::new();
        let main = git.tip("main");
        git.set_head(Head::Detached(main.clone()));

        let RunOutcome::Completed(report) = start(&git, &store) else {
            panic!("run did not complete");
        };
        assert_eq!(report.head, Some(Head::Detached(main.clone())));
        assert_eq!(git.current_head(), Head::Detached(main));
    }

    #[test]
    fn test_no_run_to_resume_or_abort() {
        let git = stacked();
        let store = MockStateStore::new();
        let executor = Executor::new(&git, &store);
        assert!(matches!(executor.resume(), Err(Error::NoRunInProgress)));
        assert!(matches!(executor.abort(), Err(Error::NoRunInProgress)));
        assert!(executor.status().unwrap().is_none());
    }

    #[test]
    fn test_record_saved_after_every_step() {
        let git = stacked();
        let store = MockStateStore::new();
        start(&git, &store);
        // begin + one save per step
        assert_eq!(store.writes.get(), 3);
    }
}
