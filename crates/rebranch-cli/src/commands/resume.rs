//! `rebranch resume` command - continue a paused run.

use anyhow::Result;
use rebranch_core::Executor;

use crate::commands::utils;
use crate::output;

/// Run the resume command.
pub fn run(json: bool) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state()?;
    let executor = Executor::new(&repo, &state);

    if !json {
        if let Some(run) = executor.status()? {
            if let Some(step) = run.current() {
                output::info(&format!(
                    "Resuming at '{}' ({}/{} branches done)",
                    step.branch,
                    run.current_step,
                    run.plan.len()
                ));
            }
        }
    }

    let outcome = executor.resume()?;
    utils::report_outcome(&outcome, json)
}
