//! Output parsing strategy for checks.
//!
//! The aggregator never interprets tool output itself. A check may carry an
//! [`OutputParser`] that turns the captured output into an [`IssueCounts`];
//! checks without one are judged on exit code alone.
//!
//! # Example
//!
//! ```rust
//! use zerogate::quality::parser::{IssueCounts, OutputParser, ParseError};
//! use zerogate::runner::CommandOutput;
//!
//! struct CountFailLines;
//!
//! impl OutputParser for CountFailLines {
//!     fn name(&self) -> &str {
//!         "fail-lines"
//!     }
//!
//!     fn parse(&self, output: &CommandOutput) -> Result<IssueCounts, ParseError> {
//!         let errors = output.stdout.lines().filter(|l| l.starts_with("FAIL")).count();
//!         Ok(IssueCounts::new(errors as u32, 0))
//!     }
//! }
//!
//! let output = CommandOutput::new(1, "FAIL a\nok b\nFAIL c\n", "");
//! assert_eq!(CountFailLines.parse(&output).unwrap().errors, 2);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::CommandOutput;

/// Error and warning totals extracted from one check's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub errors: u32,
    pub warnings: u32,
}

impl IssueCounts {
    #[must_use]
    pub fn new(errors: u32, warnings: u32) -> Self {
        Self { errors, warnings }
    }

    /// Counts used when output was not, or could not be, parsed: one error
    /// for a non-zero exit, nothing otherwise.
    #[must_use]
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            errors: u32::from(exit_code != 0),
            warnings: 0,
        }
    }
}

/// The parser could not interpret a check's output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{parser}: {message}")]
pub struct ParseError {
    pub parser: String,
    pub message: String,
}

impl ParseError {
    pub fn new(parser: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parser: parser.into(),
            message: message.into(),
        }
    }
}

/// Strategy mapping raw process output to issue counts.
///
/// Implementations must be `Send + Sync` so checks can run on separate
/// tasks in parallel mode.
pub trait OutputParser: Send + Sync {
    /// Short identifier shown in diagnostics.
    fn name(&self) -> &str;

    /// Count errors and warnings in the captured output.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the output is not in the expected format.
    /// The aggregator then falls back to exit-code-only judgement.
    fn parse(&self, output: &CommandOutput) -> Result<IssueCounts, ParseError>;
}

/// Apply an optional parser, falling back to exit-code counts on failure.
///
/// Returns the counts and, when the parser failed, a note describing why.
pub fn apply_parser(
    parser: Option<&dyn OutputParser>,
    output: &CommandOutput,
) -> (IssueCounts, Option<String>) {
    match parser {
        None => (IssueCounts::default(), None),
        Some(parser) => match parser.parse(output) {
            Ok(counts) => (counts, None),
            Err(e) => (
                IssueCounts::from_exit_code(output.exit_code),
                Some(e.to_string()),
            ),
        },
    }
}
