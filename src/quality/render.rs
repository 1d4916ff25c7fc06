//! Report rendering.
//!
//! Rendering is a pure function of the report: the same [`QualityReport`]
//! always renders to byte-identical text, and checks appear in `results`
//! order in every format.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::check::{CheckResult, CheckStatus, FailureReason};
use super::report::{compute_verdict, QualityReport};

/// Output format for a rendered report.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Pretty-printed JSON of the full report.
    Json,
    /// Flat `key=value` lines.
    #[value(name = "kv")]
    #[serde(rename = "kv")]
    KeyValue,
}

/// Render a report in the requested format.
#[must_use]
pub fn render_report(report: &QualityReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => render_text(report),
        ReportFormat::Json => render_json(report),
        ReportFormat::KeyValue => render_key_value(report),
    }
}

// ============================================================================
// Text
// ============================================================================

fn status_tag(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Passed => "PASS",
        CheckStatus::Failed => "FAIL",
        CheckStatus::Skipped => "SKIP",
    }
}

fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// One-line outcome of a check.
///
/// Keeps "ran and found errors" apart from "could not be run" and "output
/// could not be parsed" since each needs a different fix.
fn describe(result: &CheckResult) -> String {
    if result.is_skipped() {
        return "skipped after an earlier failure".to_string();
    }

    if let Some(reason) = result.failure_reason() {
        return match reason {
            FailureReason::ExecutionError { .. } => reason.to_string(),
            FailureReason::Timeout { .. } => format!("{}, process killed", reason),
        };
    }

    let mut line = format!(
        "{}, {}",
        plural(u64::from(result.error_count()), "error"),
        plural(u64::from(result.warning_count()), "warning")
    );
    if let Some(code) = result.exit_code() {
        if code != 0 {
            let _ = write!(line, ", exit {}", code);
        }
    }
    if let Some(note) = result.parse_note() {
        let _ = write!(line, "; output could not be parsed ({})", note);
    }
    line
}

fn render_text(report: &QualityReport) -> String {
    let mut out = String::new();
    let verdict = compute_verdict(report);

    out.push_str("Quality Gate Report\n");
    out.push_str("===================\n");
    let _ = writeln!(out, "Run:       {}", report.run_id());
    let _ = writeln!(
        out,
        "Timestamp: {}",
        report.timestamp().format("%Y-%m-%dT%H:%M:%SZ")
    );
    let _ = writeln!(
        out,
        "Mode:      {}{}",
        report.mode(),
        if report.fail_fast() { " (fail-fast)" } else { "" }
    );
    out.push('\n');

    let name_width = report
        .results()
        .iter()
        .map(|r| r.name().len())
        .max()
        .unwrap_or(0);
    let severity_width = report
        .results()
        .iter()
        .map(|r| r.severity().as_str().len() + 2)
        .max()
        .unwrap_or(0);

    for result in report.results() {
        let severity = format!("[{}]", result.severity());
        let _ = write!(
            out,
            "  {}  {:<name_width$}  {:<severity_width$}  {}",
            status_tag(result.status()),
            result.name(),
            severity,
            describe(result),
        );
        if !result.is_skipped() {
            let _ = write!(out, " ({}ms)", result.duration_ms());
        }
        out.push('\n');
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "Totals: {}, {} across {} ({} passed, {} failed, {} skipped) in {}ms",
        plural(report.total_errors(), "error"),
        plural(report.total_warnings(), "warning"),
        plural(report.results().len() as u64, "check"),
        report.count_by_status(CheckStatus::Passed),
        report.count_by_status(CheckStatus::Failed),
        report.count_by_status(CheckStatus::Skipped),
        report.total_duration_ms()
    );

    let by_severity = report.failures_by_severity();
    if !by_severity.is_empty() {
        let parts: Vec<String> = by_severity
            .iter()
            .map(|(sev, count)| format!("{} {}", sev, count))
            .collect();
        let _ = writeln!(out, "Failed by severity: {}", parts.join(", "));
    }

    let _ = writeln!(
        out,
        "Verdict: {} (exit code {})",
        if verdict.passed { "PASSED" } else { "FAILED" },
        verdict.exit_code
    );

    out
}

// ============================================================================
// JSON
// ============================================================================

fn serialization_error(e: &serde_json::Error) -> String {
    let message = format!("failed to serialize report: {}", e);
    format!("{{\"error\": {}}}\n", serde_json::Value::String(message))
}

fn render_json(report: &QualityReport) -> String {
    let mut value = match serde_json::to_value(report) {
        Ok(value) => value,
        Err(e) => return serialization_error(&e),
    };
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "exit_code".to_string(),
            serde_json::Value::from(compute_verdict(report).exit_code),
        );
    }

    // Value maps are ordered by key, so output is stable for a given report.
    match serde_json::to_string_pretty(&value) {
        Ok(mut text) => {
            text.push('\n');
            text
        }
        Err(e) => serialization_error(&e),
    }
}

// ============================================================================
// Key/value
// ============================================================================

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn render_key_value(report: &QualityReport) -> String {
    let mut out = String::new();
    let verdict = compute_verdict(report);

    let _ = writeln!(out, "run_id={}", report.run_id());
    let _ = writeln!(
        out,
        "timestamp={}",
        report.timestamp().format("%Y-%m-%dT%H:%M:%SZ")
    );
    let _ = writeln!(out, "mode={}", report.mode());
    let _ = writeln!(out, "fail_fast={}", report.fail_fast());
    let _ = writeln!(out, "overall_passed={}", report.overall_passed());
    let _ = writeln!(out, "exit_code={}", verdict.exit_code);
    let _ = writeln!(out, "total_errors={}", report.total_errors());
    let _ = writeln!(out, "total_warnings={}", report.total_warnings());
    let _ = writeln!(out, "total_duration_ms={}", report.total_duration_ms());
    let _ = writeln!(out, "check_count={}", report.results().len());

    for (idx, result) in report.results().iter().enumerate() {
        let prefix = format!("check.{}", idx + 1);
        let _ = writeln!(out, "{}.name={}", prefix, single_line(result.name()));
        let _ = writeln!(out, "{}.status={}", prefix, result.status());
        let _ = writeln!(out, "{}.severity={}", prefix, result.severity());
        if let Some(code) = result.exit_code() {
            let _ = writeln!(out, "{}.exit_code={}", prefix, code);
        }
        let _ = writeln!(out, "{}.errors={}", prefix, result.error_count());
        let _ = writeln!(out, "{}.warnings={}", prefix, result.warning_count());
        let _ = writeln!(out, "{}.duration_ms={}", prefix, result.duration_ms());
        match result.failure_reason() {
            Some(FailureReason::ExecutionError { message }) => {
                let _ = writeln!(out, "{}.failure=execution_error", prefix);
                let _ = writeln!(out, "{}.failure_detail={}", prefix, single_line(message));
            }
            Some(FailureReason::Timeout { timeout_ms }) => {
                let _ = writeln!(out, "{}.failure=timeout", prefix);
                let _ = writeln!(out, "{}.failure_detail={}ms", prefix, timeout_ms);
            }
            None => {}
        }
        if let Some(note) = result.parse_note() {
            let _ = writeln!(out, "{}.parse_note={}", prefix, single_line(note));
        }
    }

    out
}
