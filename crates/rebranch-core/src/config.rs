//! Configuration management for rebranch.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Configuration loaded from `.git/rebranch/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Config {
    /// Load config from a TOML file, falling back to defaults when absent.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

/// General settings.
#[derive(Debug, Clone, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct GeneralConfig {
    /// Stash local changes before the first step and restore them when the run ends.
    #[serde(default = "enabled")]
    pub autostash: bool,

    /// Return to the branch or commit that was checked out when the run started.
    #[serde(default = "enabled")]
    pub restore_head: bool,

    /// Treat a branch's upstream as its parent when the upstream is also being rebased.
    #[serde(default = "enabled")]
    pub use_upstream_parents: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            autostash: true,
            restore_head: true,
            use_upstream_parents: true,
        }
    }
}

const fn enabled() -> bool {
    true
}
