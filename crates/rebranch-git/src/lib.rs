//! # rebranch-git
//!
//! Git boundary for rebranch. Repository discovery and state inspection
//! use git2; every command that reads branch state for planning or mutates
//! the repository goes through the `git` binary, whose exit status is the
//! integration contract.

mod command;
mod commit;
mod error;
mod repository;
mod traits;

pub use commit::{CommitId, Head};
pub use error::{Error, Result};
pub use repository::Repository;
pub use traits::GitOps;
