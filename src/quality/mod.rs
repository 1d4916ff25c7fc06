//! Quality gate aggregation core.
//!
//! - [`check`] - Check definitions and per-check results
//! - [`parser`] - Output parser strategy trait
//! - [`aggregator`] - Runs checks sequentially or in parallel
//! - [`report`] - Aggregate report and zero-tolerance verdict
//! - [`render`] - Deterministic text/JSON/key-value rendering
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐      ┌───────────────┐
//! │ QualityGateAggregator │─────▶│ CommandRunner │  (process / scripted)
//! │  - run_all()          │      └───────────────┘
//! └──────────┬────────────┘
//!            │ CheckResult per check (OutputParser applied)
//!            ▼
//! ┌───────────────────────┐
//! │ QualityReport         │──▶ compute_verdict() ──▶ exit code
//! │                       │──▶ render_report()   ──▶ ReportSink
//! └───────────────────────┘
//! ```
//!
//! # Zero Tolerance
//!
//! A check passes only if it exited `0` and its parser (if any) counted no
//! errors. The gate passes only if every check passed. Warnings are counted
//! and reported but never fail a check.

pub mod aggregator;
pub mod check;
pub mod parser;
pub mod render;
pub mod report;

pub use aggregator::{validate_checks, ExecutionMode, QualityGateAggregator, RunOptions};
pub use check::{CheckCommand, CheckDefinition, CheckResult, CheckStatus, FailureReason, Severity};
pub use parser::{apply_parser, IssueCounts, OutputParser, ParseError};
pub use render::{render_report, ReportFormat};
pub use report::{compute_verdict, QualityReport, Verdict};
