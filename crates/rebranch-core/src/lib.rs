//! # rebranch-core
//!
//! Rebase orchestration for stacks of local branches: inspect the
//! repository, infer which branch was built on which, order the rebases so
//! parents go first, and execute them with a run record that survives
//! conflicts.
//!
//! ```text
//! Inspector -> DependencyGraph -> RebasePlan -> Executor <-> StateStore
//! ```

pub mod branch_name;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod inspect;
pub mod plan;
pub mod state;
pub mod traits;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_mocks;

pub use branch_name::BranchName;
pub use config::{Config, GeneralConfig};
pub use error::{Error, Result};
pub use executor::{AbortReport, BranchResult, ExecuteOptions, Executor, RunOutcome, RunReport};
pub use graph::{BranchNode, DependencyGraph, GraphOptions, Parent};
pub use inspect::{BaseRef, BranchInfo, Inspector};
pub use plan::{PlanStep, RebasePlan, StepBase};
pub use state::{RunState, RunStatus, State};
pub use traits::StateStore;
