//! Rebase planning: turn a dependency graph into an ordered list of steps.

use std::collections::HashSet;
use std::fmt;

use rebranch_git::{CommitId, GitOps};
use serde::{Deserialize, Serialize};

use crate::branch_name::BranchName;
use crate::error::{Error, Result};
use crate::graph::{BranchNode, DependencyGraph, Parent};
use crate::inspect::{BaseRef, Inspector};

/// Where a step's commits land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "branch", rename_all = "snake_case")]
pub enum StepBase {
    /// The plan's target commit.
    Base,
    /// The tip an earlier step produced for this branch.
    Branch(BranchName),
}

impl fmt::Display for StepBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Branch(name) => write!(f, "{name}"),
        }
    }
}

/// One `git rebase --onto <onto> <upstream> <branch>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub branch: BranchName,
    /// Tip of the branch when the plan was made.
    pub old_tip: CommitId,
    /// Where the branch's own commits begin: its merge base with the
    /// target for a root, with its parent's old tip for a stacked branch.
    pub upstream: CommitId,
    pub onto: StepBase,
}

/// Ordered rebase steps against a pinned target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebasePlan {
    pub target: BaseRef,
    pub steps: Vec<PlanStep>,
}

impl RebasePlan {
    /// Order the graph's branches so every parent is rebased before its children.
    ///
    /// Roots come first in selection order, then each layer of children in
    /// selection order. The same graph always yields the same plan.
    ///
    /// # Errors
    /// Returns `CycleDetected` if some branch never becomes placeable, and
    /// `NoCommonAncestor` if a root branch shares no history with the target.
    pub fn from_graph<G: GitOps>(
        inspector: &Inspector<'_, G>,
        graph: &DependencyGraph,
    ) -> Result<Self> {
        let nodes = graph.nodes();
        let mut placed: HashSet<&str> = HashSet::with_capacity(nodes.len());
        let mut order: Vec<&BranchNode> = Vec::with_capacity(nodes.len());

        for node in nodes.iter().filter(|n| n.parent == Parent::Base) {
            placed.insert(node.name.as_str());
            order.push(node);
        }

        loop {
            let layer: Vec<&BranchNode> = nodes
                .iter()
                .filter(|n| !placed.contains(n.name.as_str()))
                .filter(|n| matches!(&n.parent, Parent::Branch(p) if placed.contains(p.as_str())))
                .collect();
            if layer.is_empty() {
                break;
            }
            for node in layer {
                placed.insert(node.name.as_str());
                order.push(node);
            }
        }

        if order.len() < nodes.len() {
            let cycle = nodes
                .iter()
                .filter(|n| !placed.contains(n.name.as_str()))
                .map(|n| n.name.to_string())
                .collect();
            return Err(Error::CycleDetected { cycle });
        }

        let target = graph.base().clone();
        let mut steps = Vec::with_capacity(order.len());
        for node in order {
            let (upstream, onto) = match &node.parent {
                Parent::Base => (
                    inspector.common_ancestor(&node.tip, &target.commit)?,
                    StepBase::Base,
                ),
                Parent::Branch(parent) => {
                    let parent_tip = graph
                        .node(parent)
                        .map(|p| &p.tip)
                        .ok_or_else(|| Error::UnknownBranch(parent.to_string()))?;
                    (
                        inspector.common_ancestor(parent_tip, &node.tip)?,
                        StepBase::Branch(parent.clone()),
                    )
                }
            };
            steps.push(PlanStep {
                branch: node.name.clone(),
                old_tip: node.tip.clone(),
                upstream,
                onto,
            });
        }

        let plan = Self { target, steps };
        plan.validate()?;
        Ok(plan)
    }

    /// Check that every branch appears once and every `Branch(x)` base
    /// refers to an earlier step.
    ///
    /// # Errors
    /// Returns `InvalidPlan` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            if let StepBase::Branch(parent) = &step.onto {
                if !seen.contains(parent.as_str()) {
                    return Err(Error::InvalidPlan(format!(
                        "step {index} ({}) is based on '{parent}', which is not rebased earlier",
                        step.branch
                    )));
                }
            }
            if !seen.insert(step.branch.as_str()) {
                return Err(Error::InvalidPlan(format!(
                    "branch '{}' appears more than once",
                    step.branch
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
