//! Line-counting parser driven by user-supplied regular expressions.

use regex::Regex;

use super::typescript::saturate;
use crate::error::{GateError, Result};
use crate::quality::{IssueCounts, OutputParser, ParseError};
use crate::runner::CommandOutput;

/// Counts output lines matching an error pattern and, optionally, a warning
/// pattern. A line matching both counts as an error only.
#[derive(Debug, Clone)]
pub struct RegexCountParser {
    error_re: Regex,
    warning_re: Option<Regex>,
}

impl RegexCountParser {
    /// Compile the patterns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is not a valid regex.
    pub fn new(error_pattern: &str, warning_pattern: Option<&str>) -> Result<Self> {
        let error_re = Regex::new(error_pattern)
            .map_err(|e| GateError::invalid("parser.error_pattern", e.to_string()))?;
        let warning_re = warning_pattern
            .map(Regex::new)
            .transpose()
            .map_err(|e| GateError::invalid("parser.warning_pattern", e.to_string()))?;

        Ok(Self {
            error_re,
            warning_re,
        })
    }
}

impl OutputParser for RegexCountParser {
    fn name(&self) -> &str {
        "regex"
    }

    fn parse(&self, output: &CommandOutput) -> std::result::Result<IssueCounts, ParseError> {
        let combined = output.combined();
        let mut errors = 0usize;
        let mut warnings = 0usize;

        for line in combined.lines() {
            if self.error_re.is_match(line) {
                errors += 1;
            } else if self
                .warning_re
                .as_ref()
                .is_some_and(|re| re.is_match(line))
            {
                warnings += 1;
            }
        }

        Ok(IssueCounts::new(saturate(errors), saturate(warnings)))
    }
}
