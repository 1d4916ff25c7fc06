//! Configuration management for zerogate.
//!
//! Checks and run settings live in `zerogate.toml`:
//!
//! ```toml
//! [settings]
//! mode = "parallel"
//! fail_fast = false
//! timeout_ms = 600000
//!
//! [[check]]
//! name = "lint"
//! run = "npx eslint . --format=json"
//! severity = "critical"
//! parser = { kind = "eslint-json" }
//! ```
//!
//! Command-line flags are applied on top through [`ConfigOverrides`].

pub mod starter;
pub mod validation;

pub use starter::{write_starter, STARTER_CONFIG};
pub use validation::{ConfigValidator, ValidationReport};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GateError, Result};
use crate::parsers::ParserSpec;
use crate::quality::{CheckCommand, CheckDefinition, ExecutionMode, RunOptions, Severity};

/// File name looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "zerogate.toml";

/// `[settings]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub fail_fast: bool,
    /// Default per-check timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// One `[[check]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    pub name: String,
    /// Shell command line. Mutually exclusive with `program`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    /// Program started directly with `args`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<ParserSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Working directory, relative to the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl CheckConfig {
    fn command(&self) -> Result<CheckCommand> {
        let field = format!("check.{}", self.name);
        match (&self.run, &self.program) {
            (Some(line), None) => {
                if line.trim().is_empty() {
                    return Err(GateError::invalid(field, "`run` is empty"));
                }
                if !self.args.is_empty() {
                    return Err(GateError::invalid(
                        field,
                        "`args` only applies together with `program`",
                    ));
                }
                Ok(CheckCommand::Shell(line.clone()))
            }
            (None, Some(program)) => {
                if program.trim().is_empty() {
                    return Err(GateError::invalid(field, "`program` is empty"));
                }
                Ok(CheckCommand::Exec {
                    program: program.clone(),
                    args: self.args.clone(),
                })
            }
            (Some(_), Some(_)) => Err(GateError::invalid(
                field,
                "set either `run` or `program`, not both",
            )),
            (None, None) => Err(GateError::invalid(field, "missing `run` or `program`")),
        }
    }

    /// Build the runtime definition, resolving `cwd` against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty name, a missing or
    /// ambiguous command, a zero timeout, or an invalid parser pattern.
    pub fn to_definition(&self, base_dir: &Path) -> Result<CheckDefinition> {
        if self.name.trim().is_empty() {
            return Err(GateError::invalid("check.name", "must not be empty"));
        }

        let mut check =
            CheckDefinition::with_command(&self.name, self.command()?).with_severity(self.severity);

        if let Some(ms) = self.timeout_ms {
            let field = format!("check.{}.timeout_ms", self.name);
            check = check.with_timeout(positive_timeout(&field, ms)?);
        }
        if let Some(ref cwd) = self.cwd {
            check = check.with_cwd(base_dir.join(cwd));
        }
        for (key, value) in &self.env {
            check = check.with_env(key, value);
        }
        if let Some(ref spec) = self.parser {
            check = check.with_parser(spec.build()?);
        }

        Ok(check)
    }
}

fn positive_timeout(field: &str, ms: u64) -> Result<Duration> {
    if ms == 0 {
        return Err(GateError::invalid(field, "timeout must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub mode: Option<ExecutionMode>,
    pub fail_fast: Option<bool>,
    pub timeout_ms: Option<u64>,
}

/// Parsed `zerogate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "check")]
    pub checks: Vec<CheckConfig>,
}

impl GateConfig {
    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::config_with_path(
                format!("cannot read {}: {}", path.display(), e),
                path.to_path_buf(),
            )
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            GateError::Toml(err) => GateError::config_with_path(
                format!("cannot parse {}: {}", path.display(), err),
                path.to_path_buf(),
            ),
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Toml`] on syntax or schema errors.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(mode) = overrides.mode {
            self.settings.mode = mode;
        }
        if let Some(fail_fast) = overrides.fail_fast {
            self.settings.fail_fast = fail_fast;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.settings.timeout_ms = Some(timeout_ms);
        }
        self
    }

    /// Run options from `[settings]`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero default timeout.
    pub fn run_options(&self) -> Result<RunOptions> {
        let mut options = RunOptions::new()
            .with_mode(self.settings.mode)
            .with_fail_fast(self.settings.fail_fast);
        if let Some(ms) = self.settings.timeout_ms {
            options = options.with_default_timeout(positive_timeout("settings.timeout_ms", ms)?);
        }
        Ok(options)
    }

    /// Build check definitions in configuration order.
    ///
    /// Duplicate names and empty lists are left to
    /// [`validate_checks`](crate::quality::validate_checks).
    ///
    /// # Errors
    ///
    /// Returns the first per-check configuration error.
    pub fn check_definitions(&self, base_dir: &Path) -> Result<Vec<CheckDefinition>> {
        self.checks
            .iter()
            .map(|check| check.to_definition(base_dir))
            .collect()
    }
}

/// Keep only the named checks, in configuration order.
///
/// An empty `only` keeps everything.
///
/// # Errors
///
/// Returns [`GateError::UnknownCheck`] for a name not in `checks`.
pub fn select_checks(
    checks: Vec<CheckDefinition>,
    only: &[String],
) -> Result<Vec<CheckDefinition>> {
    if only.is_empty() {
        return Ok(checks);
    }

    if let Some(missing) = only.iter().find(|n| !checks.iter().any(|c| &c.name == *n)) {
        return Err(GateError::UnknownCheck {
            name: missing.clone(),
        });
    }

    Ok(checks
        .into_iter()
        .filter(|c| only.contains(&c.name))
        .collect())
}
