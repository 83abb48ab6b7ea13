//! Run record persistence in `<git-dir>/rebranch/`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rebranch_git::{CommitId, Head};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::plan::{PlanStep, RebasePlan, StepBase};

/// Manages the `<git-dir>/rebranch/` directory.
#[derive(Debug)]
pub struct State {
    dir: PathBuf,
}

impl State {
    const DIR_NAME: &'static str = "rebranch";
    const RUN_FILE: &'static str = "run.json";
    const CONFIG_FILE: &'static str = "config.toml";

    /// State for the repository whose git directory is `git_dir`.
    #[must_use]
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: git_dir.as_ref().join(Self::DIR_NAME),
        }
    }

    /// Get the path to the rebranch directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run_path(&self) -> PathBuf {
        self.dir.join(Self::RUN_FILE)
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join(Self::CONFIG_FILE)
    }

    /// Check if a run record exists.
    #[must_use]
    pub fn is_run_in_progress(&self) -> bool {
        self.run_path().exists()
    }

    /// Load the run record.
    ///
    /// # Errors
    /// Returns `NoRunInProgress` if there is none, `StateParseError` if it is corrupt.
    pub fn load_run(&self) -> Result<RunState> {
        let path = self.run_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NoRunInProgress),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| Error::StateParseError {
            file: path,
            message: e.to_string(),
        })
    }

    /// Create the run record, failing if one already exists.
    ///
    /// The record appears in a single link step, so two processes racing to
    /// start a run cannot both succeed.
    ///
    /// # Errors
    /// Returns `RunInProgress` if a record exists.
    pub fn begin_run(&self, state: &RunState) -> Result<()> {
        let temp = self.write_temp(state)?;
        match temp.persist_noclobber(self.run_path()) {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::RunInProgress);
            }
            Err(e) => return Err(e.error.into()),
        }
        sync_dir(&self.dir)?;
        tracing::debug!(path = %self.run_path().display(), "run record created");
        Ok(())
    }

    /// Replace the run record atomically.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save_run(&self, state: &RunState) -> Result<()> {
        let temp = self.write_temp(state)?;
        temp.persist(self.run_path()).map_err(|e| e.error)?;
        sync_dir(&self.dir)?;
        tracing::debug!(step = state.current_step, status = ?state.status, "run record saved");
        Ok(())
    }

    /// Delete the run record.
    ///
    /// # Errors
    /// Returns error if file removal fails.
    pub fn clear_run(&self) -> Result<()> {
        match fs::remove_file(self.run_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        sync_dir(&self.dir)?;
        tracing::debug!("run record cleared");
        Ok(())
    }

    /// Load the config, or defaults when there is no config file.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be parsed.
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config_path())
    }

    fn write_temp(&self, state: &RunState) -> Result<NamedTempFile> {
        fs::create_dir_all(&self.dir)?;
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut temp, state)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        Ok(temp)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Steps are being applied.
    InProgress,
    /// Paused on a conflict the user must resolve.
    Conflicted,
    /// A step failed for a reason other than a conflict.
    Failed,
    /// Every step applied.
    Completed,
    /// The run was rolled back.
    Aborted,
}

impl RunStatus {
    /// Whether the run can still be resumed or aborted.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::InProgress | Self::Conflicted | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in progress",
            Self::Conflicted => "conflicted",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Persisted record of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub plan: RebasePlan,

    /// Index of the next step to apply.
    pub current_step: usize,

    /// Tip of every planned branch before the run touched it.
    pub original_tips: BTreeMap<String, CommitId>,

    /// Tips produced by completed steps.
    #[serde(default)]
    pub new_tips: BTreeMap<String, CommitId>,

    pub status: RunStatus,

    /// Where HEAD was when the run started, if it should be restored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_head: Option<Head>,

    /// Whether local changes were stashed for the run.
    #[serde(default)]
    pub stashed: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflict_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl RunState {
    /// A fresh record for `plan`, before any step ran.
    #[must_use]
    pub fn new(plan: RebasePlan, original_head: Option<Head>) -> Self {
        let now = Utc::now();
        let original_tips = plan
            .steps
            .iter()
            .map(|s| (s.branch.to_string(), s.old_tip.clone()))
            .collect();
        Self {
            started_at: now,
            updated_at: now,
            plan,
            current_step: 0,
            original_tips,
            new_tips: BTreeMap::new(),
            status: RunStatus::InProgress,
            original_head,
            stashed: false,
            conflict_files: vec![],
            last_error: None,
        }
    }

    /// The step to apply next, if any remain.
    #[must_use]
    pub fn current(&self) -> Option<&PlanStep> {
        self.plan.steps.get(self.current_step)
    }

    /// Steps already applied.
    #[must_use]
    pub fn completed(&self) -> &[PlanStep] {
        let done = self.current_step.min(self.plan.steps.len());
        &self.plan.steps[..done]
    }

    /// Steps not yet applied, including the current one.
    #[must_use]
    pub fn remaining(&self) -> &[PlanStep] {
        let done = self.current_step.min(self.plan.steps.len());
        &self.plan.steps[done..]
    }

    /// The commit `step` lands on: the pinned target, or the new tip of
    /// the earlier step it depends on.
    #[must_use]
    pub fn resolve_onto(&self, step: &PlanStep) -> Option<CommitId> {
        match &step.onto {
            StepBase::Base => Some(self.plan.target.commit.clone()),
            StepBase::Branch(parent) => self.new_tips.get(parent.as_str()).cloned(),
        }
    }

    /// Record the current step's result and move to the next one.
    pub fn advance(&mut self, new_tip: CommitId) {
        if let Some(step) = self.current() {
            let branch = step.branch.to_string();
            self.new_tips.insert(branch, new_tip);
        }
        self.current_step += 1;
        self.status = RunStatus::InProgress;
        self.conflict_files.clear();
        self.last_error = None;
        self.touch();
    }

    pub fn mark_conflicted(&mut self, files: Vec<String>) {
        self.status = RunStatus::Conflicted;
        self.conflict_files = files;
        self.last_error = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.conflict_files.clear();
        self.last_error = Some(message.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
