//! `rebranch status` command - show the run in progress.

use anyhow::Result;
use rebranch_core::{Executor, RunState, StepBase};
use serde::Serialize;

use crate::commands::utils;
use crate::output::{self, StepMark};

/// JSON output for the status command.
#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    in_progress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<&'a RunState>,
}

/// Run the status command.
pub fn run(json: bool) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state()?;
    let run = Executor::new(&repo, &state).status()?;

    if json {
        let out = StatusOutput {
            in_progress: run.is_some(),
            run: run.as_ref(),
        };
        output::essential(&serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let Some(run) = run else {
        output::info("No rebase run in progress");
        return Ok(());
    };
    print_run(&run);
    Ok(())
}

fn print_run(run: &RunState) {
    output::info(&format!(
        "Rebasing onto {} ({}) - {}",
        run.plan.target.spec,
        run.plan.target.commit.short(),
        output::status_label(run.status)
    ));
    output::detail(&format!(
        "  started {}, {}/{} branches done",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        run.completed().len(),
        run.plan.len()
    ));
    output::hr();

    let done = run.completed().iter().map(|step| (StepMark::Done, step));
    let left = run.remaining().iter().enumerate().map(|(i, step)| {
        let mark = if i == 0 { StepMark::Current } else { StepMark::Pending };
        (mark, step)
    });
    for (mark, step) in done.chain(left) {
        let onto = match &step.onto {
            StepBase::Base => run.plan.target.spec.clone(),
            StepBase::Branch(parent) => parent.to_string(),
        };
        output::detail(&format!("  {}", output::step_line(mark, &step.branch, &onto)));
    }
    output::hr();

    if !run.conflict_files.is_empty() {
        output::warn("Unresolved conflicts:");
        for file in &run.conflict_files {
            output::detail(&format!("  {file}"));
        }
    }
    if let Some(error) = &run.last_error {
        output::warn(&format!("Last step failed: {error}"));
    }
    if run.status.is_active() {
        output::detail("Run `rebranch resume` to continue or `rebranch abort` to roll back.");
    }
}
