//! `rebranch onto` command - plan and run a stack rebase.

use anyhow::{Context, Result};
use rebranch_core::{
    BranchName, DependencyGraph, ExecuteOptions, Executor, GraphOptions, Inspector, Parent,
    RebasePlan, StepBase,
};
use serde::Serialize;

use crate::commands::utils;
use crate::output;

/// Options for the onto command.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct OntoOptions<'a> {
    pub base: &'a str,
    pub branches: &'a [String],
    pub dry_run: bool,
    pub json: bool,
    pub no_upstream: bool,
}

/// JSON output for a dry run.
#[derive(Debug, Serialize)]
struct DryRunOutput<'a> {
    dry_run: bool,
    plan: &'a RebasePlan,
}

/// Run the onto command.
pub fn run(opts: &OntoOptions<'_>) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state()?;
    let config = state.load_config().context("Failed to load config")?;

    if !opts.dry_run && state.is_run_in_progress() {
        return Err(rebranch_core::Error::RunInProgress.into());
    }

    let inspector = Inspector::new(&repo);
    let base = inspector.resolve_base(opts.base).map_err(planning_error)?;

    let names: Vec<String> = if opts.branches.is_empty() {
        let found = inspector.discover_branches(&base)?;
        if found.is_empty() {
            if opts.json {
                output::essential(r#"{"outcome":"up_to_date","branches":[]}"#);
            } else {
                output::success(&format!("Every branch already contains {}", base.spec));
            }
            return Ok(());
        }
        if !opts.json {
            output::info(&format!(
                "Found {} branches not yet on {}",
                found.len(),
                base.spec
            ));
        }
        found.into_iter().map(BranchName::into_inner).collect()
    } else {
        opts.branches.to_vec()
    };

    let graph_options = GraphOptions {
        use_upstream_parents: config.general.use_upstream_parents && !opts.no_upstream,
    };
    let graph =
        DependencyGraph::build(&inspector, &names, base, graph_options).map_err(planning_error)?;
    let plan = RebasePlan::from_graph(&inspector, &graph).map_err(planning_error)?;

    if opts.dry_run {
        if opts.json {
            let out = DryRunOutput {
                dry_run: true,
                plan: &plan,
            };
            output::essential(&serde_json::to_string_pretty(&out)?);
        } else {
            print_plan(&graph, &plan);
            output::info("Dry run - no changes made");
        }
        return Ok(());
    }

    if !opts.json {
        print_plan(&graph, &plan);
    }

    let executor = Executor::new(&repo, &state);
    let outcome = executor.start(plan, ExecuteOptions::from(&config.general))?;
    utils::report_outcome(&outcome, opts.json)
}

/// Planning errors are raised before anything is touched; say so.
fn planning_error(e: rebranch_core::Error) -> anyhow::Error {
    if e.is_planning_error() {
        anyhow::Error::new(e).context("Could not plan the rebase, no branch was changed")
    } else {
        e.into()
    }
}

fn print_plan(graph: &DependencyGraph, plan: &RebasePlan) {
    output::info(&format!(
        "Rebasing {} branches onto {} ({})",
        plan.len(),
        plan.target.spec,
        plan.target.commit.short()
    ));
    output::hr();
    for (index, step) in plan.steps.iter().enumerate() {
        let declared = graph
            .node(&step.branch)
            .is_some_and(|n| n.declared && n.parent != Parent::Base);
        let onto = match &step.onto {
            StepBase::Base => plan.target.spec.clone(),
            StepBase::Branch(parent) if declared => format!("{parent} (upstream)"),
            StepBase::Branch(parent) => parent.to_string(),
        };
        output::detail(&format!("  {}. {} onto {}", index + 1, step.branch, onto));
    }
    output::hr();
}
