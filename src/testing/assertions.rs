//! Custom assertions for domain-specific testing.
//!
//! Provides expressive assertions for quality reports.

use crate::quality::{CheckStatus, QualityReport};

/// Assert that a named check has the expected status.
///
/// # Panics
///
/// Panics if the check is missing or its status differs.
///
/// # Example
///
/// ```rust,ignore
/// assert_check_status(&report, "lint", CheckStatus::Passed);
/// ```
pub fn assert_check_status(report: &QualityReport, name: &str, expected: CheckStatus) {
    let result = report
        .result(name)
        .unwrap_or_else(|| panic!("Expected check '{}' in report, but it is missing", name));
    assert_eq!(
        result.status(),
        expected,
        "Expected check '{}' to be {}, but it was {}.\nResult: {:?}",
        name,
        expected,
        result.status(),
        result
    );
}

/// Assert that the report lists checks in exactly this order.
///
/// # Panics
///
/// Panics if the order differs.
pub fn assert_result_order(report: &QualityReport, expected: &[&str]) {
    let actual: Vec<&str> = report.results().iter().map(|r| r.name()).collect();
    assert_eq!(
        actual, expected,
        "Expected results in configuration order {:?}, got {:?}",
        expected, actual
    );
}

/// Assert that the overall gate passed.
///
/// # Panics
///
/// Panics with the failing checks listed.
pub fn assert_gate_passed(report: &QualityReport) {
    let failing: Vec<&str> = report
        .results()
        .iter()
        .filter(|r| !r.passed())
        .map(|r| r.name())
        .collect();
    assert!(
        report.overall_passed(),
        "Expected quality gate to pass, but these checks did not: {:?}",
        failing
    );
}

/// Assert that the overall gate failed.
///
/// # Panics
///
/// Panics if the gate passed.
pub fn assert_gate_failed(report: &QualityReport) {
    assert!(
        !report.overall_passed(),
        "Expected quality gate to fail, but every check passed"
    );
}
