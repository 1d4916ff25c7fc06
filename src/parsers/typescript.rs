//! Parsers for the JavaScript/TypeScript toolchain: ESLint, tsc, Jest and
//! Prettier.

use crate::quality::{IssueCounts, OutputParser, ParseError};
use crate::runner::CommandOutput;

// ============================================================================
// ESLint
// ============================================================================

/// Counts `eslint --format=json` messages: severity 2 is an error, 1 a
/// warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct EslintJsonParser;

impl OutputParser for EslintJsonParser {
    fn name(&self) -> &str {
        "eslint-json"
    }

    fn parse(&self, output: &CommandOutput) -> Result<IssueCounts, ParseError> {
        // ESLint JSON format: [{filePath, messages: [{ruleId, severity, message, line, column}]}]
        let files: Vec<EslintFileResult> = serde_json::from_str(output.stdout.trim())
            .map_err(|e| ParseError::new(self.name(), format!("invalid ESLint JSON: {}", e)))?;

        let mut counts = IssueCounts::default();
        for msg in files.iter().flat_map(|f| &f.messages) {
            match msg.severity {
                2 => counts.errors += 1,
                1 => counts.warnings += 1,
                _ => {}
            }
        }
        Ok(counts)
    }
}

/// ESLint file result structure.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFileResult {
    messages: Vec<EslintMessage>,
}

/// ESLint message structure.
#[derive(Debug, serde::Deserialize)]
struct EslintMessage {
    severity: u8,
}

// ============================================================================
// tsc
// ============================================================================

/// Whether a line carries a `<kind> TS<digits>:` diagnostic.
fn is_ts_diagnostic(line: &str, kind: &str) -> bool {
    let marker = format!("{} TS", kind);
    line.match_indices(&marker).any(|(pos, _)| {
        let boundary = line[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let rest = &line[pos + marker.len()..];
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        boundary && digits > 0 && rest[digits..].starts_with(':')
    })
}

/// Counts `tsc` diagnostics such as
/// `src/a.ts(10,5): error TS2322: Type 'string' is not assignable...`.
///
/// Lines without a location (`error TS5058: ...`) count too.
#[derive(Debug, Clone, Copy, Default)]
pub struct TscParser;

impl OutputParser for TscParser {
    fn name(&self) -> &str {
        "tsc"
    }

    fn parse(&self, output: &CommandOutput) -> Result<IssueCounts, ParseError> {
        let combined = output.combined();
        let errors = combined
            .lines()
            .filter(|l| is_ts_diagnostic(l, "error"))
            .count();
        let warnings = combined
            .lines()
            .filter(|l| is_ts_diagnostic(l, "warning"))
            .count();

        if output.exit_code != 0 && errors == 0 {
            return Err(ParseError::new(
                self.name(),
                format!(
                    "exited with code {} but reported no TS diagnostics",
                    output.exit_code
                ),
            ));
        }

        Ok(IssueCounts::new(saturate(errors), saturate(warnings)))
    }
}

// ============================================================================
// Jest
// ============================================================================

/// Reads `jest --json`: failed tests plus suites that failed to run count as
/// errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JestJsonParser;

impl OutputParser for JestJsonParser {
    fn name(&self) -> &str {
        "jest-json"
    }

    fn parse(&self, output: &CommandOutput) -> Result<IssueCounts, ParseError> {
        let trimmed = output.stdout.trim();
        let summary = serde_json::from_str::<JestSummary>(trimmed).or_else(|first_err| {
            // Console output can precede the JSON blob.
            match (trimmed.find('{'), trimmed.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str::<JestSummary>(&trimmed[start..=end])
                }
                _ => Err(first_err),
            }
        });

        let summary = summary
            .map_err(|e| ParseError::new(self.name(), format!("invalid Jest JSON: {}", e)))?;

        Ok(IssueCounts::new(
            summary
                .num_failed_tests
                .saturating_add(summary.num_runtime_error_test_suites),
            0,
        ))
    }
}

/// Jest `--json` summary fields.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct JestSummary {
    num_failed_tests: u32,
    #[serde(default)]
    num_runtime_error_test_suites: u32,
}

// ============================================================================
// Prettier
// ============================================================================

/// Counts files reported by `prettier --check`.
///
/// Each `[warn] <file>` line is one unformatted file (an error under zero
/// tolerance); the trailing "Code style issues found" summary is ignored.
/// `[error]` lines (syntax errors) also count.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettierCheckParser;

impl OutputParser for PrettierCheckParser {
    fn name(&self) -> &str {
        "prettier-check"
    }

    fn parse(&self, output: &CommandOutput) -> Result<IssueCounts, ParseError> {
        let combined = output.combined();
        let errors = combined
            .lines()
            .map(str::trim)
            .filter(|l| {
                (l.starts_with("[warn]") && !l.contains("Code style issues"))
                    || l.starts_with("[error]")
            })
            .count();

        if output.exit_code != 0 && errors == 0 {
            return Err(ParseError::new(
                self.name(),
                format!(
                    "exited with code {} but reported no files",
                    output.exit_code
                ),
            ));
        }

        Ok(IssueCounts::new(saturate(errors), 0))
    }
}

pub(crate) fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
