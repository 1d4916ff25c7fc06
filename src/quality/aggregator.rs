//! Quality gate aggregation.
//!
//! The [`QualityGateAggregator`] runs a list of checks through a
//! [`CommandRunner`], either one after another or all at once, and folds the
//! outcomes into a [`QualityReport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zerogate::quality::{CheckDefinition, QualityGateAggregator, RunOptions, compute_verdict};
//! use zerogate::runner::ProcessRunner;
//!
//! let checks = vec![
//!     CheckDefinition::shell("lint", "npx eslint . --max-warnings 0"),
//!     CheckDefinition::shell("typecheck", "npx tsc --noEmit"),
//! ];
//! let aggregator = QualityGateAggregator::new(Arc::new(ProcessRunner::new()), RunOptions::new());
//! let report = aggregator.run_all(&checks).await?;
//! std::process::exit(compute_verdict(&report).exit_code);
//! ```

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::check::{CheckDefinition, CheckResult};
use super::parser::apply_parser;
use super::report::QualityReport;
use crate::error::{GateError, Result};
use crate::runner::{CommandRunner, InvocationError};

// ============================================================================
// Run Options
// ============================================================================

/// How checks are scheduled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One check at a time, in configuration order.
    #[default]
    Sequential,
    /// All checks concurrently.
    Parallel,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Parallel => f.write_str("parallel"),
        }
    }
}

/// Options for one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Scheduling mode.
    pub mode: ExecutionMode,
    /// Stop after the first failing check (sequential mode only).
    ///
    /// Remaining checks are reported as skipped. In parallel mode every
    /// check is already running, so this has no effect on execution.
    pub fail_fast: bool,
    /// Timeout for checks that don't set their own.
    pub default_timeout: Option<Duration>,
}

impl RunOptions {
    /// Create default options: sequential, no fail-fast, no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable/disable fail-fast mode.
    #[must_use]
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Set the fallback timeout for checks without one.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    fn timeout_for(&self, check: &CheckDefinition) -> Option<Duration> {
        check.timeout.or(self.default_timeout)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Reject check lists the aggregator cannot run: empty, or with duplicate
/// names.
///
/// # Errors
///
/// Returns [`GateError::EmptyCheckList`] or [`GateError::DuplicateCheckName`].
pub fn validate_checks(checks: &[CheckDefinition]) -> Result<()> {
    if checks.is_empty() {
        return Err(GateError::EmptyCheckList);
    }

    let mut seen = HashSet::with_capacity(checks.len());
    for check in checks {
        if !seen.insert(check.name.as_str()) {
            return Err(GateError::DuplicateCheckName {
                name: check.name.clone(),
            });
        }
    }

    Ok(())
}

// ============================================================================
// Single Check Execution
// ============================================================================

/// Run one check and turn whatever happened into a [`CheckResult`].
///
/// Never fails: spawn errors and timeouts become failed results, and parser
/// failures fall back to exit-code counts.
async fn execute_check(
    runner: &dyn CommandRunner,
    check: &CheckDefinition,
    timeout: Option<Duration>,
) -> CheckResult {
    debug!(check = %check.name, command = %check.command, ?timeout, "running check");
    let start = Instant::now();
    let outcome = runner.run(check, timeout).await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let result = match outcome {
        Ok(output) => {
            let (counts, parse_note) = apply_parser(check.parser.as_deref(), &output);
            if let Some(ref note) = parse_note {
                warn!(check = %check.name, "output could not be parsed: {}", note);
            }
            CheckResult::completed(
                &check.name,
                check.severity,
                output.exit_code,
                counts,
                duration_ms,
                parse_note,
            )
        }
        Err(InvocationError::Timeout(limit)) => {
            warn!(check = %check.name, "check timed out after {}ms", limit.as_millis());
            CheckResult::timed_out(&check.name, check.severity, limit, duration_ms)
        }
        Err(e) => {
            warn!(check = %check.name, "check could not be run: {}", e);
            CheckResult::execution_error(&check.name, check.severity, e.to_string(), duration_ms)
        }
    };

    debug!(
        check = %check.name,
        status = %result.status(),
        errors = result.error_count(),
        warnings = result.warning_count(),
        duration_ms,
        "check finished"
    );
    result
}

// ============================================================================
// Quality Gate Aggregator
// ============================================================================

/// Runs checks and aggregates their results.
pub struct QualityGateAggregator {
    runner: Arc<dyn CommandRunner>,
    options: RunOptions,
}

impl QualityGateAggregator {
    /// Create an aggregator with the given runner and options.
    pub fn new(runner: Arc<dyn CommandRunner>, options: RunOptions) -> Self {
        Self { runner, options }
    }

    /// Options this aggregator was built with.
    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every check and build the report.
    ///
    /// The report's results are always in the order of `checks`, whatever
    /// order the checks finished in.
    ///
    /// # Errors
    ///
    /// Only configuration errors (empty list, duplicate names), detected
    /// before any check starts. Failures of individual checks are recorded
    /// in the report.
    pub async fn run_all(&self, checks: &[CheckDefinition]) -> Result<QualityReport> {
        validate_checks(checks)?;

        info!(
            checks = checks.len(),
            mode = %self.options.mode,
            fail_fast = self.options.fail_fast,
            "starting quality gate run"
        );

        let start = Instant::now();
        let results = match self.options.mode {
            ExecutionMode::Sequential => self.run_sequential(checks).await,
            ExecutionMode::Parallel => self.run_concurrent(checks).await,
        };
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = QualityReport::new(self.options.mode, self.options.fail_fast, results)
            .with_total_duration_ms(elapsed_ms);

        info!(
            passed = report.overall_passed(),
            total_errors = report.total_errors(),
            total_warnings = report.total_warnings(),
            duration_ms = elapsed_ms,
            "quality gate run completed"
        );

        Ok(report)
    }

    /// Execute checks one at a time, honouring fail-fast.
    async fn run_sequential(&self, checks: &[CheckDefinition]) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(checks.len());
        let mut remaining = checks.iter();

        for check in remaining.by_ref() {
            let result =
                execute_check(self.runner.as_ref(), check, self.options.timeout_for(check)).await;
            let failed = !result.passed();
            results.push(result);

            if failed && self.options.fail_fast {
                info!(check = %check.name, "fail-fast: skipping remaining checks");
                break;
            }
        }

        results.extend(remaining.map(|check| CheckResult::skipped(&check.name, check.severity)));
        results
    }

    /// Execute all checks concurrently using tokio::spawn and futures::join_all.
    async fn run_concurrent(&self, checks: &[CheckDefinition]) -> Vec<CheckResult> {
        let handles: Vec<_> = checks
            .iter()
            .map(|check| {
                let runner = Arc::clone(&self.runner);
                let check = check.clone();
                let timeout = self.options.timeout_for(&check);

                tokio::spawn(async move { execute_check(runner.as_ref(), &check, timeout).await })
            })
            .collect();
        let _abort = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

        // join_all yields outputs in input order, not completion order.
        let join_results = join_all(handles).await;

        join_results
            .into_iter()
            .zip(checks)
            .map(|(joined, check)| {
                joined.unwrap_or_else(|e| {
                    warn!(check = %check.name, "check task panicked: {}", e);
                    CheckResult::execution_error(
                        &check.name,
                        check.severity,
                        format!("check task panicked: {}", e),
                        0,
                    )
                })
            })
            .collect()
    }
}

/// Aborts spawned check tasks if the run is dropped before they finish, so
/// their runners are dropped and their processes killed.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::check::{CheckStatus, FailureReason, Severity};
    use crate::quality::parser::{IssueCounts, OutputParser, ParseError};
    use crate::runner::CommandOutput;
    use crate::testing::{ScriptedOutcome, ScriptedRunner};

    fn aggregator(runner: ScriptedRunner, options: RunOptions) -> QualityGateAggregator {
        QualityGateAggregator::new(Arc::new(runner), options)
    }

    fn names(report: &QualityReport) -> Vec<&str> {
        report.results().iter().map(CheckResult::name).collect()
    }

    struct ErrorsFromStdout;

    impl OutputParser for ErrorsFromStdout {
        fn name(&self) -> &str {
            "errors-from-stdout"
        }

        fn parse(&self, output: &CommandOutput) -> std::result::Result<IssueCounts, ParseError> {
            output
                .stdout
                .trim()
                .parse::<u32>()
                .map(|errors| IssueCounts::new(errors, 0))
                .map_err(|e| ParseError::new(self.name(), e.to_string()))
        }
    }

    #[test]
    fn test_run_options_builder() {
        let options = RunOptions::new()
            .with_mode(ExecutionMode::Parallel)
            .with_fail_fast(true)
            .with_default_timeout(Duration::from_secs(5));

        assert_eq!(options.mode, ExecutionMode::Parallel);
        assert!(options.fail_fast);
        assert_eq!(options.default_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_check_timeout_overrides_default() {
        let options = RunOptions::new().with_default_timeout(Duration::from_secs(5));
        let own = CheckDefinition::shell("a", "true").with_timeout(Duration::from_secs(1));
        let inherited = CheckDefinition::shell("b", "true");

        assert_eq!(options.timeout_for(&own), Some(Duration::from_secs(1)));
        assert_eq!(options.timeout_for(&inherited), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_validate_rejects_empty_list() {
        assert!(matches!(validate_checks(&[]), Err(GateError::EmptyCheckList)));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let checks = vec![
            CheckDefinition::shell("lint", "true"),
            CheckDefinition::shell("lint", "false"),
        ];
        match validate_checks(&checks) {
            Err(GateError::DuplicateCheckName { name }) => assert_eq!(name, "lint"),
            other => panic!("expected duplicate name error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configuration_error_runs_nothing() {
        let runner = ScriptedRunner::new();
        let calls = runner.call_log();
        let checks = vec![
            CheckDefinition::shell("lint", "true"),
            CheckDefinition::shell("lint", "true"),
        ];

        let err = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_runs_in_configuration_order() {
        let runner = ScriptedRunner::new();
        let calls = runner.call_log();
        let checks = vec![
            CheckDefinition::shell("lint", "x"),
            CheckDefinition::shell("typecheck", "x"),
            CheckDefinition::shell("format", "x"),
        ];

        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["lint", "typecheck", "format"]);
        assert_eq!(names(&report), vec!["lint", "typecheck", "format"]);
        assert!(report.overall_passed());
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining() {
        let runner = ScriptedRunner::new().with_outcome("b", ScriptedOutcome::exit(1));
        let calls = runner.call_log();
        let checks = vec![
            CheckDefinition::shell("a", "x"),
            CheckDefinition::shell("b", "x"),
            CheckDefinition::shell("c", "x"),
        ];

        let report = aggregator(runner, RunOptions::new().with_fail_fast(true))
            .run_all(&checks)
            .await
            .unwrap();

        let statuses: Vec<CheckStatus> = report.results().iter().map(|r| r.status()).collect();
        assert_eq!(
            statuses,
            vec![CheckStatus::Passed, CheckStatus::Failed, CheckStatus::Skipped]
        );
        assert!(!report.overall_passed());
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_without_fail_fast_everything_runs() {
        let runner = ScriptedRunner::new().with_outcome("a", ScriptedOutcome::exit(1));
        let calls = runner.call_log();
        let checks = vec![
            CheckDefinition::shell("a", "x"),
            CheckDefinition::shell("b", "x"),
        ];

        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(report.count_by_status(CheckStatus::Skipped), 0);
    }

    #[tokio::test]
    async fn test_parallel_ignores_fail_fast_for_execution() {
        let runner = ScriptedRunner::new().with_outcome("a", ScriptedOutcome::exit(1));
        let calls = runner.call_log();
        let checks = vec![
            CheckDefinition::shell("a", "x"),
            CheckDefinition::shell("b", "x"),
            CheckDefinition::shell("c", "x"),
        ];

        let options = RunOptions::new()
            .with_mode(ExecutionMode::Parallel)
            .with_fail_fast(true);
        let report = aggregator(runner, options).run_all(&checks).await.unwrap();

        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(report.count_by_status(CheckStatus::Skipped), 0);
        assert!(!report.overall_passed());
    }

    #[tokio::test]
    async fn test_parallel_preserves_configuration_order() {
        // First check finishes last.
        let runner = ScriptedRunner::new()
            .with_outcome("slow", ScriptedOutcome::exit(0).with_delay_ms(120))
            .with_outcome("medium", ScriptedOutcome::exit(0).with_delay_ms(60))
            .with_outcome("fast", ScriptedOutcome::exit(0));
        let checks = vec![
            CheckDefinition::shell("slow", "x"),
            CheckDefinition::shell("medium", "x"),
            CheckDefinition::shell("fast", "x"),
        ];

        let report = aggregator(runner, RunOptions::new().with_mode(ExecutionMode::Parallel))
            .run_all(&checks)
            .await
            .unwrap();

        assert_eq!(names(&report), vec!["slow", "medium", "fast"]);
    }

    #[tokio::test]
    async fn test_parallel_runs_concurrently() {
        let runner = ScriptedRunner::new()
            .with_outcome("a", ScriptedOutcome::exit(0).with_delay_ms(100))
            .with_outcome("b", ScriptedOutcome::exit(0).with_delay_ms(100))
            .with_outcome("c", ScriptedOutcome::exit(0).with_delay_ms(100));
        let checks = vec![
            CheckDefinition::shell("a", "x"),
            CheckDefinition::shell("b", "x"),
            CheckDefinition::shell("c", "x"),
        ];

        let start = Instant::now();
        let report = aggregator(runner, RunOptions::new().with_mode(ExecutionMode::Parallel))
            .run_all(&checks)
            .await
            .unwrap();

        assert!(report.overall_passed());
        assert!(
            start.elapsed() < Duration::from_millis(250),
            "parallel run took {}ms",
            start.elapsed().as_millis()
        );
    }

    #[tokio::test]
    async fn test_parser_counts_drive_result() {
        let runner = ScriptedRunner::new()
            .with_outcome("typecheck", ScriptedOutcome::exit(1).with_stdout("3"));
        let checks = vec![CheckDefinition::shell("typecheck", "x")
            .with_parser(Arc::new(ErrorsFromStdout))];

        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        let result = report.result("typecheck").unwrap();
        assert_eq!(result.error_count(), 3);
        assert!(result.parse_note().is_none());
        assert_eq!(report.total_errors(), 3);
    }

    #[tokio::test]
    async fn test_exit_zero_with_parsed_error_fails() {
        let runner =
            ScriptedRunner::new().with_outcome("lint", ScriptedOutcome::exit(0).with_stdout("1"));
        let checks =
            vec![CheckDefinition::shell("lint", "x").with_parser(Arc::new(ErrorsFromStdout))];

        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        assert!(!report.result("lint").unwrap().passed());
        assert!(!report.overall_passed());
    }

    #[tokio::test]
    async fn test_parse_failure_falls_back_to_exit_code() {
        let runner = ScriptedRunner::new()
            .with_outcome("lint", ScriptedOutcome::exit(2).with_stdout("not a number"));
        let checks =
            vec![CheckDefinition::shell("lint", "x").with_parser(Arc::new(ErrorsFromStdout))];

        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        let result = report.result("lint").unwrap();
        assert_eq!(result.error_count(), 1);
        assert!(result
            .parse_note()
            .unwrap()
            .starts_with("errors-from-stdout:"));
        assert!(result.failure_reason().is_none());
    }

    #[tokio::test]
    async fn test_spawn_failure_becomes_execution_error() {
        let runner = ScriptedRunner::new().with_outcome("test", ScriptedOutcome::spawn_error());
        let checks = vec![
            CheckDefinition::shell("test", "x"),
            CheckDefinition::shell("build", "x"),
        ];

        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        let result = report.result("test").unwrap();
        assert_eq!(result.exit_code(), Some(-1));
        assert_eq!(result.error_count(), 1);
        assert!(matches!(
            result.failure_reason(),
            Some(FailureReason::ExecutionError { .. })
        ));
        assert!(report.result("build").unwrap().passed());
    }

    #[tokio::test]
    async fn test_timeout_becomes_timeout_failure() {
        let runner =
            ScriptedRunner::new().with_outcome("e2e", ScriptedOutcome::exit(0).with_delay_ms(500));
        let checks = vec![CheckDefinition::shell("e2e", "x")
            .with_severity(Severity::Low)
            .with_timeout(Duration::from_millis(50))];

        let start = Instant::now();
        let report = aggregator(runner, RunOptions::new())
            .run_all(&checks)
            .await
            .unwrap();

        let result = report.result("e2e").unwrap();
        assert_eq!(
            result.failure_reason(),
            Some(&FailureReason::Timeout { timeout_ms: 50 })
        );
        assert!(!result.passed());
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_default_timeout_applies() {
        let runner =
            ScriptedRunner::new().with_outcome("e2e", ScriptedOutcome::exit(0).with_delay_ms(500));
        let checks = vec![CheckDefinition::shell("e2e", "x")];
        let options = RunOptions::new().with_default_timeout(Duration::from_millis(30));

        let report = aggregator(runner, options).run_all(&checks).await.unwrap();

        assert!(matches!(
            report.result("e2e").unwrap().failure_reason(),
            Some(FailureReason::Timeout { timeout_ms: 30 })
        ));
    }

    /// Never finishes; counts how many of its runs were dropped.
    struct HangingRunner {
        dropped: Arc<std::sync::atomic::AtomicUsize>,
    }

    struct CountOnDrop(Arc<std::sync::atomic::AtomicUsize>);

    impl Drop for CountOnDrop {
        fn drop(&mut self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for HangingRunner {
        async fn run(
            &self,
            _check: &CheckDefinition,
            _timeout: Option<Duration>,
        ) -> std::result::Result<CommandOutput, InvocationError> {
            let _count = CountOnDrop(Arc::clone(&self.dropped));
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_parallel_run_drops_running_checks() {
        let dropped = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let runner = HangingRunner {
            dropped: Arc::clone(&dropped),
        };
        let aggregator = QualityGateAggregator::new(
            Arc::new(runner),
            RunOptions::new().with_mode(ExecutionMode::Parallel),
        );
        let checks = vec![
            CheckDefinition::shell("lint", "x"),
            CheckDefinition::shell("test", "y"),
        ];

        let run = aggregator.run_all(&checks);
        assert!(tokio::time::timeout(Duration::from_millis(50), run)
            .await
            .is_err());

        for _ in 0..50 {
            if dropped.load(std::sync::atomic::Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(dropped.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
