use anyhow::{Context, Result};
use rebranch_core::{RunOutcome, RunReport, State};
use rebranch_git::Repository;

use super::Stopped;
use crate::output;

/// Helper to open repo and state.
pub fn open_repo_and_state() -> Result<(Repository, State)> {
    let repo = Repository::open_current().context("Not inside a git working tree")?;
    let state = State::new(repo.git_dir());
    Ok((repo, state))
}

/// Print how a run ended and turn a paused run into a [`Stopped`] error.
pub fn report_outcome(outcome: &RunOutcome, json: bool) -> Result<()> {
    if json {
        output::essential(&serde_json::to_string_pretty(outcome)?);
    } else {
        print_outcome(outcome);
    }

    match outcome {
        RunOutcome::Completed(_) => Ok(()),
        RunOutcome::Conflicted { .. } => Err(Stopped::Conflict.into()),
        RunOutcome::Failed { .. } => Err(Stopped::Failed.into()),
    }
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed(report) => print_report(report),
        RunOutcome::Conflicted {
            branch,
            files,
            completed,
            total,
        } => {
            output::warn(&format!(
                "Conflict while rebasing '{branch}' ({completed}/{total} branches done)"
            ));
            for file in files {
                output::detail(&format!("  {file}"));
            }
            output::detail("");
            output::detail("Resolve the conflicts and stage them with `git add`, then:");
            output::detail("  rebranch resume    to continue");
            output::detail("  rebranch abort     to restore every branch");
        }
        RunOutcome::Failed {
            branch,
            error,
            completed,
            total,
        } => {
            output::error(&format!(
                "Rebasing '{branch}' failed ({completed}/{total} branches done)"
            ));
            output::detail(&format!("  {error}"));
            output::detail("");
            output::detail("Fix the problem, then run `rebranch resume` to retry or `rebranch abort`.");
        }
    }
}

fn print_report(report: &RunReport) {
    let changed = report.branches.iter().filter(|b| b.changed).count();
    output::success(&format!(
        "Rebased {changed} of {} branches onto {}",
        report.branches.len(),
        report.target.spec
    ));
    for branch in &report.branches {
        output::detail(&format!(
            "  {:<30} {}",
            branch.branch,
            output::tip_change(branch.old_tip.short(), branch.new_tip.short(), branch.changed)
        ));
    }
    if let Some(head) = &report.head {
        output::info(&format!("Back on {head}"));
    }
    if report.stash_restored {
        output::info("Restored local changes");
    }
    for warning in &report.warnings {
        output::warn(warning);
    }
}
