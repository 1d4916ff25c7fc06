//! Mock implementations of the check invocation boundary.
//!
//! [`ScriptedRunner`] stands in for real processes, enabling deterministic
//! aggregator tests with controllable exit codes, output and delays.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::quality::CheckDefinition;
use crate::runner::{CommandOutput, CommandRunner, InvocationError};

/// What a scripted check does when run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedOutcome {
    exit_code: i32,
    stdout: String,
    stderr: String,
    delay: Duration,
    spawn_error: Option<String>,
}

impl Default for ScriptedOutcome {
    fn default() -> Self {
        Self::exit(0)
    }
}

impl ScriptedOutcome {
    /// Finish immediately with the given exit code.
    #[must_use]
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            stdout: String::new(),
            stderr: String::new(),
            delay: Duration::ZERO,
            spawn_error: None,
        }
    }

    /// Fail to start, as if the program were missing.
    #[must_use]
    pub fn spawn_error() -> Self {
        Self {
            spawn_error: Some("No such file or directory (os error 2)".to_string()),
            ..Self::exit(0)
        }
    }

    /// Set the captured stdout.
    #[must_use]
    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    /// Set the captured stderr.
    #[must_use]
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    /// Take this long before finishing.
    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }
}

/// Mock [`CommandRunner`] answering each check by name.
///
/// Checks without a scripted outcome exit `0` with no output. Delays honour
/// the timeout passed by the aggregator, so timeout handling can be tested
/// without real processes.
///
/// # Example
///
/// ```rust,ignore
/// let runner = ScriptedRunner::new()
///     .with_outcome("typecheck", ScriptedOutcome::exit(1).with_stdout("3 errors"))
///     .with_outcome("test", ScriptedOutcome::exit(0).with_delay_ms(100));
/// let calls = runner.call_log();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    outcomes: HashMap<String, ScriptedOutcome>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    /// Create a runner where every check passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for a check name.
    #[must_use]
    pub fn with_outcome(mut self, name: &str, outcome: ScriptedOutcome) -> Self {
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    /// Shared log of check names in the order they were started.
    #[must_use]
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        check: &CheckDefinition,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, InvocationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(check.name.clone());
        }

        let outcome = self.outcomes.get(&check.name).cloned().unwrap_or_default();

        if let Some(message) = outcome.spawn_error {
            return Err(InvocationError::Spawn {
                program: check.command.program().to_string(),
                message,
            });
        }

        if !outcome.delay.is_zero() {
            let sleep = tokio::time::sleep(outcome.delay);
            match timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, sleep).await.is_err() {
                        return Err(InvocationError::Timeout(limit));
                    }
                }
                None => sleep.await,
            }
        }

        Ok(CommandOutput::new(
            outcome.exit_code,
            outcome.stdout,
            outcome.stderr,
        ))
    }
}
