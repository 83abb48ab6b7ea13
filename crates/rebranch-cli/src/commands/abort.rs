//! `rebranch abort` command - roll back the run in progress.

use anyhow::{Context, Result};
use console::Term;
use inquire::Confirm;
use rebranch_core::{Executor, RunState};

use crate::commands::utils;
use crate::output;

/// Run the abort command.
pub fn run(yes: bool, json: bool) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state()?;
    let executor = Executor::new(&repo, &state);

    let Some(run) = executor.status()? else {
        return Err(rebranch_core::Error::NoRunInProgress.into());
    };

    let interactive = !yes && !json && Term::stdout().is_term();
    if interactive && !confirm_abort(&run)? {
        return Ok(());
    }

    let report = executor.abort()?;

    if json {
        output::essential(&serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.restored.is_empty() {
        output::success("Aborted - no branch had been changed yet");
    } else {
        output::success(&format!(
            "Aborted - restored {} branches",
            report.restored.len()
        ));
        for branch in &report.restored {
            output::detail(&format!("  {branch}"));
        }
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
    Ok(())
}

fn confirm_abort(run: &RunState) -> Result<bool> {
    output::info(&format!(
        "Will restore {} branches to their tips from before the run",
        run.original_tips.len()
    ));

    let confirmed = Confirm::new("Abort the rebase run?")
        .with_default(false)
        .prompt()
        .context("Confirmation cancelled")?;

    if !confirmed {
        output::info("Abort cancelled");
    }
    Ok(confirmed)
}
