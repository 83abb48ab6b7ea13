//! Dependency graph over the selected branches.
//!
//! Each branch gets exactly one parent: the target base, or another selected
//! branch it was built on. A declared parent (the branch's local upstream)
//! wins when it is part of the selection; otherwise the parent is inferred
//! from commit ancestry. Ties are refused, never broken arbitrarily.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rebranch_git::{CommitId, GitOps};
use serde::{Deserialize, Serialize};

use crate::branch_name::BranchName;
use crate::error::{Error, Result};
use crate::inspect::{BaseRef, BranchInfo, Inspector};

/// What a branch sits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Parent {
    /// The target base.
    Base,
    /// Another selected branch.
    Branch(BranchName),
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("(base)"),
            Self::Branch(name) => write!(f, "{name}"),
        }
    }
}

/// A branch in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub name: BranchName,
    pub tip: CommitId,
    pub parent: Parent,
    /// Whether `parent` came from the branch's configured upstream.
    pub declared: bool,
}

/// Options that affect parent selection.
#[derive(Debug, Clone, Copy)]
pub struct GraphOptions {
    /// Honor a configured upstream that is one of the selected branches.
    pub use_upstream_parents: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            use_upstream_parents: true,
        }
    }
}

/// Acyclic single-parent graph of the selected branches.
///
/// Nodes keep the order the branches were given in.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    base: BaseRef,
    nodes: Vec<BranchNode>,
}

impl DependencyGraph {
    /// Build the graph for `names` against `base`.
    ///
    /// Read-only: nothing in the repository changes.
    ///
    /// # Errors
    /// - `InvalidBranchName` for a name git or a shell would misread
    /// - `NoBranches` if nothing is selected
    /// - `BaseInBranchSet` if the base is one of the selected branches
    /// - `UnknownBranch` if a branch does not exist
    /// - `AmbiguousParent` if two selected branches are equally close below one
    /// - `CycleDetected` if declared parents loop
    pub fn build<G: GitOps, S: AsRef<str>>(
        inspector: &Inspector<'_, G>,
        names: &[S],
        base: BaseRef,
        options: GraphOptions,
    ) -> Result<Self> {
        let names = select(names)?;
        if names.iter().any(|name| name.as_str() == base.spec) {
            return Err(Error::BaseInBranchSet(base.spec));
        }

        let infos = names
            .iter()
            .map(|name| inspector.resolve_branch(name))
            .collect::<Result<Vec<_>>>()?;

        let mut nodes = Vec::with_capacity(infos.len());
        for info in &infos {
            let (parent, declared) = choose_parent(inspector, info, &infos, options)?;
            tracing::debug!(branch = %info.name, %parent, declared, "parent selected");
            nodes.push(BranchNode {
                name: info.name.clone(),
                tip: info.tip.clone(),
                parent,
                declared,
            });
        }

        if let Some(cycle) = find_cycle(&nodes) {
            return Err(Error::CycleDetected { cycle });
        }

        Ok(Self { base, nodes })
    }

    /// The target base.
    #[must_use]
    pub const fn base(&self) -> &BaseRef {
        &self.base
    }

    /// All nodes, in selection order.
    #[must_use]
    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    /// Look up a node by branch name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&BranchNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Validate names and drop repeats, keeping first occurrences.
fn select<S: AsRef<str>>(names: &[S]) -> Result<Vec<BranchName>> {
    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let name = BranchName::new(name.as_ref())?;
        if seen.insert(name.clone()) {
            selected.push(name);
        }
    }
    if selected.is_empty() {
        return Err(Error::NoBranches);
    }
    Ok(selected)
}

fn choose_parent<G: GitOps>(
    inspector: &Inspector<'_, G>,
    branch: &BranchInfo,
    all: &[BranchInfo],
    options: GraphOptions,
) -> Result<(Parent, bool)> {
    if options.use_upstream_parents {
        if let Some(declared) = branch.declared_parent.as_deref() {
            if let Some(parent) = all.iter().find(|b| b.name == declared) {
                return Ok((Parent::Branch(parent.name.clone()), true));
            }
        }
    }

    let mut candidates = vec![];
    for other in all {
        if other.name != branch.name
            && other.tip != branch.tip
            && inspector.is_ancestor(&other.tip, &branch.tip)?
        {
            candidates.push(other);
        }
    }

    let mut closest = vec![];
    for candidate in &candidates {
        let mut dominated = false;
        for other in &candidates {
            if other.tip != candidate.tip && inspector.is_ancestor(&candidate.tip, &other.tip)? {
                dominated = true;
                break;
            }
        }
        if !dominated {
            closest.push(*candidate);
        }
    }

    match closest.as_slice() {
        [] => Ok((Parent::Base, false)),
        [parent] => Ok((Parent::Branch(parent.name.clone()), false)),
        _ => Err(Error::AmbiguousParent {
            branch: branch.name.to_string(),
            candidates: closest.iter().map(|c| c.name.to_string()).collect(),
        }),
    }
}

/// The first parent loop found, as a closed path of branch names.
fn find_cycle(nodes: &[BranchNode]) -> Option<Vec<String>> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name.as_str(), i))
        .collect();

    for start in 0..nodes.len() {
        let mut path: Vec<usize> = vec![];
        let mut current = Some(start);
        while let Some(i) = current {
            if let Some(pos) = path.iter().position(|&p| p == i) {
                let mut cycle: Vec<String> =
                    path[pos..].iter().map(|&p| nodes[p].name.to_string()).collect();
                cycle.push(nodes[i].name.to_string());
                return Some(cycle);
            }
            path.push(i);
            current = match &nodes[i].parent {
                Parent::Base => None,
                Parent::Branch(parent) => index.get(parent.as_str()).copied(),
            };
        }
    }
    None
}
