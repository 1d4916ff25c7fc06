//! Check definitions and per-check results.
//!
//! A [`CheckDefinition`] describes one quality dimension (lint, typecheck,
//! format, test, build) as an opaque external command. Running it produces
//! a [`CheckResult`], whose pass/fail status is derived once, at
//! construction, from the zero-tolerance rule: a check passes only when the
//! process exited `0` **and** no errors were counted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::parser::{IssueCounts, OutputParser};

// ============================================================================
// Severity
// ============================================================================

/// Classification of a check, used for reporting only.
///
/// Severity never changes whether a check passes: zero tolerance applies
/// uniformly to every configured check.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Lowercase identifier as used in configuration files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Check Definition
// ============================================================================

/// How a check's external process is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckCommand {
    /// A command line handed to the platform shell (`sh -c` / `cmd /C`).
    Shell(String),
    /// A program started directly with an argument vector.
    Exec { program: String, args: Vec<String> },
}

impl CheckCommand {
    /// The executable that will be looked up on `PATH`.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Shell(line) => line.split_whitespace().next().unwrap_or_default(),
            Self::Exec { program, .. } => program,
        }
    }
}

impl fmt::Display for CheckCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(line) => f.write_str(line),
            Self::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}

/// One quality dimension to evaluate.
#[derive(Clone)]
pub struct CheckDefinition {
    /// Unique name within a run configuration.
    pub name: String,
    /// Invocation descriptor.
    pub command: CheckCommand,
    /// Reporting classification.
    pub severity: Severity,
    /// Working directory for the process (inherits when `None`).
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the process.
    pub env: BTreeMap<String, String>,
    /// Per-check timeout; `None` means wait indefinitely.
    pub timeout: Option<Duration>,
    /// Strategy mapping raw output to error/warning counts.
    pub parser: Option<Arc<dyn OutputParser>>,
}

impl CheckDefinition {
    /// Create a check that runs a shell command line.
    pub fn shell(name: impl Into<String>, line: impl Into<String>) -> Self {
        Self::with_command(name, CheckCommand::Shell(line.into()))
    }

    /// Create a check that runs a program directly.
    pub fn exec<I, S>(name: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_command(
            name,
            CheckCommand::Exec {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Create a check from an explicit command.
    pub fn with_command(name: impl Into<String>, command: CheckCommand) -> Self {
        Self {
            name: name.into(),
            command,
            severity: Severity::default(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: None,
            parser: None,
        }
    }

    /// Set the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the output parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn OutputParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("severity", &self.severity)
            .field("cwd", &self.cwd)
            .field("env", &self.env)
            .field("timeout", &self.timeout)
            .field("parser", &self.parser.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

// ============================================================================
// Check Result
// ============================================================================

/// Outcome state of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// Not executed because an earlier check failed in fail-fast mode.
    Skipped,
}

impl CheckStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a check could not produce a normal exit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The process could not be started.
    ExecutionError { message: String },
    /// The process exceeded its timeout and was killed.
    Timeout { timeout_ms: u64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionError { message } => write!(f, "could not be run: {}", message),
            Self::Timeout { timeout_ms } => write!(f, "timed out after {}ms", timeout_ms),
        }
    }
}

/// Outcome of running one [`CheckDefinition`].
///
/// Results are immutable once built; the only way to create one is through
/// the constructors below, which derive `status` from the zero-tolerance
/// rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    name: String,
    severity: Severity,
    status: CheckStatus,
    /// `None` only for skipped checks.
    exit_code: Option<i32>,
    error_count: u32,
    warning_count: u32,
    duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parse_note: Option<String>,
}

impl CheckResult {
    /// Result of a process that ran to completion.
    ///
    /// `parse_note` carries the parser's complaint when the output could not
    /// be interpreted and the counts are a fallback.
    pub fn completed(
        name: impl Into<String>,
        severity: Severity,
        exit_code: i32,
        counts: IssueCounts,
        duration_ms: u64,
        parse_note: Option<String>,
    ) -> Self {
        let passed = exit_code == 0 && counts.errors == 0;
        Self {
            name: name.into(),
            severity,
            status: if passed {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            exit_code: Some(exit_code),
            error_count: counts.errors,
            warning_count: counts.warnings,
            duration_ms,
            failure_reason: None,
            parse_note,
        }
    }

    /// Result of a process that could not be spawned.
    pub fn execution_error(
        name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self::invocation_failure(
            name,
            severity,
            FailureReason::ExecutionError {
                message: message.into(),
            },
            duration_ms,
        )
    }

    /// Result of a process killed after exceeding its timeout.
    pub fn timed_out(
        name: impl Into<String>,
        severity: Severity,
        timeout: Duration,
        duration_ms: u64,
    ) -> Self {
        Self::invocation_failure(
            name,
            severity,
            FailureReason::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            duration_ms,
        )
    }

    /// Placeholder for a check that never ran.
    pub fn skipped(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            severity,
            status: CheckStatus::Skipped,
            exit_code: None,
            error_count: 0,
            warning_count: 0,
            duration_ms: 0,
            failure_reason: None,
            parse_note: None,
        }
    }

    fn invocation_failure(
        name: impl Into<String>,
        severity: Severity,
        reason: FailureReason,
        duration_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            status: CheckStatus::Failed,
            exit_code: Some(-1),
            error_count: 1,
            warning_count: 0,
            duration_ms,
            failure_reason: Some(reason),
            parse_note: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn status(&self) -> CheckStatus {
        self.status
    }

    /// Whether the check ran and met the zero-tolerance rule.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == CheckStatus::Skipped
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    #[must_use]
    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    #[must_use]
    pub fn parse_note(&self) -> Option<&str> {
        self.parse_note.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_clean_check_passes() {
        let result = CheckResult::completed(
            "lint",
            Severity::Critical,
            0,
            IssueCounts::default(),
            12,
            None,
        );
        assert!(result.passed());
        assert_eq!(result.status(), CheckStatus::Passed);
        assert_eq!(result.exit_code(), Some(0));
    }

    #[test]
    fn test_exit_zero_with_errors_fails() {
        let result = CheckResult::completed(
            "lint",
            Severity::High,
            0,
            IssueCounts::new(1, 0),
            5,
            None,
        );
        assert!(!result.passed());
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn test_nonzero_exit_without_errors_fails() {
        let result =
            CheckResult::completed("build", Severity::High, 2, IssueCounts::default(), 5, None);
        assert!(!result.passed());
        assert_eq!(result.error_count(), 0);
    }

    #[test]
    fn test_warnings_alone_do_not_fail() {
        let result = CheckResult::completed(
            "lint",
            Severity::Medium,
            0,
            IssueCounts::new(0, 7),
            5,
            None,
        );
        assert!(result.passed());
        assert_eq!(result.warning_count(), 7);
    }

    #[test]
    fn test_execution_error_shape() {
        let result = CheckResult::execution_error("test", Severity::High, "not found", 1);
        assert!(!result.passed());
        assert_eq!(result.exit_code(), Some(-1));
        assert_eq!(result.error_count(), 1);
        assert!(matches!(
            result.failure_reason(),
            Some(FailureReason::ExecutionError { .. })
        ));
    }

    #[test]
    fn test_timed_out_shape() {
        let result =
            CheckResult::timed_out("test", Severity::Low, Duration::from_millis(50), 51);
        assert!(!result.passed());
        assert_eq!(
            result.failure_reason(),
            Some(&FailureReason::Timeout { timeout_ms: 50 })
        );
        assert_eq!(
            result.failure_reason().unwrap().to_string(),
            "timed out after 50ms"
        );
    }

    #[test]
    fn test_skipped_is_not_passed() {
        let result = CheckResult::skipped("format", Severity::Medium);
        assert!(!result.passed());
        assert!(result.is_skipped());
        assert_eq!(result.exit_code(), None);
        assert_eq!(result.error_count(), 0);
    }

    #[test]
    fn test_severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Severity::Low);
    }

    #[test]
    fn test_command_display_and_program() {
        let exec = CheckCommand::Exec {
            program: "npx".into(),
            args: vec!["tsc".into(), "--noEmit".into()],
        };
        assert_eq!(exec.to_string(), "npx tsc --noEmit");
        assert_eq!(exec.program(), "npx");

        let shell = CheckCommand::Shell("npm run lint -- --max-warnings 0".into());
        assert_eq!(shell.program(), "npm");
    }

    #[test]
    fn test_definition_builder() {
        let check = CheckDefinition::exec("typecheck", "npx", ["tsc", "--noEmit"])
            .with_severity(Severity::Critical)
            .with_timeout(Duration::from_secs(30))
            .with_cwd("web")
            .with_env("CI", "true");

        assert_eq!(check.name, "typecheck");
        assert_eq!(check.severity, Severity::Critical);
        assert_eq!(check.timeout, Some(Duration::from_secs(30)));
        assert_eq!(check.env.get("CI").map(String::as_str), Some("true"));
        assert!(format!("{:?}", check).contains("typecheck"));
    }
}
