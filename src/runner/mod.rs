//! Check invocation boundary.
//!
//! The aggregator depends only on the [`CommandRunner`] trait: start the
//! check's command, wait for it (bounded by an optional timeout), and hand
//! back the exit code and captured output. [`ProcessRunner`] does this with
//! real child processes; tests substitute
//! [`ScriptedRunner`](crate::testing::ScriptedRunner).

pub mod process;

pub use process::{resolve_program, ProcessRunner};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::quality::CheckDefinition;

/// Exit code and captured streams of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Stdout followed by stderr, for parsers that don't care which stream
    /// a line came from.
    #[must_use]
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// The command could not produce an exit status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    /// The process could not be started.
    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },

    /// The process started but waiting on it failed.
    #[error("failed to wait for `{program}`: {message}")]
    Wait { program: String, message: String },

    /// The process was killed after exceeding its timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Runs one check's command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `check.command` to completion or until `timeout` expires.
    ///
    /// On timeout the implementation must terminate the process before
    /// returning [`InvocationError::Timeout`].
    async fn run(
        &self,
        check: &CheckDefinition,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, InvocationError>;
}
