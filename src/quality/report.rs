//! Aggregate report and the zero-tolerance verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregator::ExecutionMode;
use super::check::{CheckResult, CheckStatus, Severity};

/// All check results of one run, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    run_id: Uuid,
    timestamp: DateTime<Utc>,
    mode: ExecutionMode,
    fail_fast: bool,
    results: Vec<CheckResult>,
    overall_passed: bool,
    total_errors: u64,
    total_warnings: u64,
    total_duration_ms: u64,
}

impl QualityReport {
    /// Build a report from results already in configuration order.
    ///
    /// Totals are derived here; `total_duration_ms` starts as the sum of
    /// check durations and can be replaced with the measured wall clock.
    pub fn new(mode: ExecutionMode, fail_fast: bool, results: Vec<CheckResult>) -> Self {
        let overall_passed = results.iter().all(CheckResult::passed);
        let total_errors = results
            .iter()
            .filter(|r| !r.is_skipped())
            .map(|r| u64::from(r.error_count()))
            .sum();
        let total_warnings = results
            .iter()
            .filter(|r| !r.is_skipped())
            .map(|r| u64::from(r.warning_count()))
            .sum();
        let total_duration_ms = results.iter().map(CheckResult::duration_ms).sum();

        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mode,
            fail_fast,
            results,
            overall_passed,
            total_errors,
            total_warnings,
            total_duration_ms,
        }
    }

    /// Override the run identifier.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Override the total duration.
    #[must_use]
    pub fn with_total_duration_ms(mut self, duration_ms: u64) -> Self {
        self.total_duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    #[must_use]
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    #[must_use]
    pub fn overall_passed(&self) -> bool {
        self.overall_passed
    }

    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    #[must_use]
    pub fn total_warnings(&self) -> u64 {
        self.total_warnings
    }

    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Look up a result by check name.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name() == name)
    }

    /// Number of results in the given state.
    #[must_use]
    pub fn count_by_status(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status() == status).count()
    }

    /// Failed checks per severity, most severe first, omitting zeros.
    #[must_use]
    pub fn failures_by_severity(&self) -> Vec<(Severity, usize)> {
        Severity::ALL
            .iter()
            .filter_map(|sev| {
                let count = self
                    .results
                    .iter()
                    .filter(|r| r.status() == CheckStatus::Failed && r.severity() == *sev)
                    .count();
                (count > 0).then_some((*sev, count))
            })
            .collect()
    }
}

/// The quality gate decision for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub exit_code: i32,
}

/// Zero tolerance: the gate passes only if every check passed. No partial
/// credit, no thresholds.
#[must_use]
pub fn compute_verdict(report: &QualityReport) -> Verdict {
    let passed = report.overall_passed();
    Verdict {
        passed,
        exit_code: if passed { 0 } else { 1 },
    }
}
