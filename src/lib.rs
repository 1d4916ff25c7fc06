//! zerogate - Zero-Tolerance Quality Gate Aggregator
//!
//! Runs a project's quality checks (lint, typecheck, format, test, build)
//! as external commands, interprets their output, and reduces everything to
//! a single pass/fail verdict and process exit code.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`quality`] - Check model, aggregation, report, verdict and rendering
//! - [`runner`] - Command invocation boundary and the process runner
//! - [`parsers`] - Built-in output parsers (ESLint, tsc, Jest, Prettier, regex)
//! - [`config`] - `zerogate.toml` loading, validation and starter template
//! - [`history`] - Append-only JSON-lines run history
//! - [`sink`] - Report destinations (stdout, file)
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (scripted runner, assertions)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zerogate::{
//!     compute_verdict, render_report, CheckDefinition, ProcessRunner, QualityGateAggregator,
//!     ReportFormat, RunOptions, Severity,
//! };
//!
//! let checks = vec![
//!     CheckDefinition::shell("lint", "npx eslint . --format=json")
//!         .with_severity(Severity::Critical),
//!     CheckDefinition::shell("build", "npm run build"),
//! ];
//!
//! let aggregator = QualityGateAggregator::new(Arc::new(ProcessRunner::new()), RunOptions::new());
//! let report = aggregator.run_all(&checks).await?;
//! print!("{}", render_report(&report, ReportFormat::Text));
//! std::process::exit(compute_verdict(&report).exit_code);
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod parsers;
pub mod quality;
pub mod runner;
pub mod sink;
pub mod testing;

// Re-export commonly used types
pub use error::{GateError, Result};

// Re-export config types
pub use config::{
    select_checks, ConfigOverrides, ConfigValidator, GateConfig, ValidationReport,
    DEFAULT_CONFIG_FILE,
};

// Re-export quality gate types
pub use quality::{
    compute_verdict, render_report, validate_checks, CheckCommand, CheckDefinition, CheckResult,
    CheckStatus, ExecutionMode, FailureReason, IssueCounts, OutputParser, ParseError,
    QualityGateAggregator, QualityReport, ReportFormat, RunOptions, Severity, Verdict,
};

// Re-export runner types
pub use runner::{CommandOutput, CommandRunner, InvocationError, ProcessRunner};

pub use history::{HistoryEntry, HistoryLog, DEFAULT_HISTORY_FILE};
pub use parsers::ParserSpec;
pub use sink::{FileSink, ReportSink, StdoutSink};
