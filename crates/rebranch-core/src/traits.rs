//! Trait abstraction for run state storage.
//!
//! The executor only talks to persistence through `StateStore`, so tests can
//! run it against an in-memory store.

use crate::Result;
use crate::config::Config;
use crate::state::{RunState, State};

/// Trait for run state storage operations.
#[allow(clippy::missing_errors_doc)]
pub trait StateStore {
    /// Check if a run record exists.
    fn is_run_in_progress(&self) -> bool;

    /// Load the run record (`NoRunInProgress` when there is none).
    fn load_run(&self) -> Result<RunState>;

    /// Create the run record; `RunInProgress` if one already exists.
    fn begin_run(&self, state: &RunState) -> Result<()>;

    /// Overwrite the run record.
    fn save_run(&self, state: &RunState) -> Result<()>;

    /// Delete the run record.
    fn clear_run(&self) -> Result<()>;

    /// Load the config from disk.
    fn load_config(&self) -> Result<Config>;
}

impl StateStore for State {
    fn is_run_in_progress(&self) -> bool {
        Self::is_run_in_progress(self)
    }

    fn load_run(&self) -> Result<RunState> {
        Self::load_run(self)
    }

    fn begin_run(&self, state: &RunState) -> Result<()> {
        Self::begin_run(self, state)
    }

    fn save_run(&self, state: &RunState) -> Result<()> {
        Self::save_run(self, state)
    }

    fn clear_run(&self) -> Result<()> {
        Self::clear_run(self)
    }

    fn load_config(&self) -> Result<Config> {
        Self::load_config(self)
    }
}
