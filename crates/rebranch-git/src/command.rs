//! Invocation of the `git` binary.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// A single `git` invocation rooted at a working directory.
///
/// Runs with `LC_ALL=C` so diagnostics such as `CONFLICT` stay parseable,
/// and with terminal prompts disabled so a credential helper can never
/// block the run.
#[derive(Debug, Clone)]
pub(crate) struct GitCommand {
    workdir: PathBuf,
    args: Vec<String>,
    envs: Vec<(&'static str, String)>,
}

impl GitCommand {
    pub(crate) fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub(crate) fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub(crate) fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.envs.push((key, value.into()));
        self
    }

    /// The command line as a user would type it.
    pub(crate) fn display(&self) -> String {
        format!("git {}", self.args.join(" "))
    }

    /// Run and capture output without judging the exit status.
    pub(crate) fn output(&self) -> Result<Output> {
        tracing::debug!(command = %self.display(), "running git");

        let mut cmd = Command::new("git");
        cmd.current_dir(&self.workdir)
            .args(&self.args)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0");
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        let output = cmd.output()?;
        tracing::debug!(
            command = %self.display(),
            code = ?output.status.code(),
            "git finished"
        );
        Ok(output)
    }

    /// Run, mapping any non-zero exit to [`Error::CommandFailed`].
    pub(crate) fn run(&self) -> Result<Output> {
        let output = self.output()?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(self.failure(&output))
        }
    }

    /// Run and return trimmed stdout.
    pub(crate) fn stdout(&self) -> Result<String> {
        let output = self.run()?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Build the error for an unsuccessful run.
    pub(crate) fn failure(&self, output: &Output) -> Error {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stderr = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        Error::CommandFailed {
            command: self.display(),
            code: output.status.code(),
            stderr,
        }
    }
}
