//! Configuration validation for `zerogate validate`.
//!
//! Goes one step beyond loading: the check list must be runnable (non-empty,
//! unique names), and each check's program is looked up on `PATH`. A
//! missing program is only a warning, since it will surface as an execution
//! error in the report anyway.
//!
//! # Example
//!
//! ```rust,ignore
//! use zerogate::config::ConfigValidator;
//! use std::path::Path;
//!
//! let report = ConfigValidator::new(Path::new("zerogate.toml")).validate();
//! if !report.is_valid() {
//!     for error in &report.errors {
//!         eprintln!("Error: {}", error);
//!     }
//!     std::process::exit(report.exit_code());
//! }
//! ```

use std::path::{Path, PathBuf};

use super::GateConfig;
use crate::quality::validate_checks;
use crate::runner::resolve_program;

/// Result of configuration validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Errors that prevent a run from starting.
    pub errors: Vec<String>,
    /// Problems that will show up as failed checks.
    pub warnings: Vec<String>,
    /// `(check name, resolved program)` for every check that loaded.
    pub programs: Vec<(String, Option<PathBuf>)>,
}

impl ValidationReport {
    /// Create a new empty validation report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Exit code: `0` when valid, `2` (configuration error) otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() {
            0
        } else {
            2
        }
    }
}

/// Validates a configuration file.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    path: PathBuf,
}

impl ConfigValidator {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Run all validations, collecting problems instead of stopping at the
    /// first one where possible.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        let config = match GateConfig::load(&self.path) {
            Ok(config) => config,
            Err(e) => {
                report.errors.push(e.to_string());
                return report;
            }
        };

        if let Err(e) = config.run_options() {
            report.errors.push(e.to_string());
        }

        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut checks = Vec::new();
        for entry in &config.checks {
            match entry.to_definition(base_dir) {
                Ok(check) => checks.push(check),
                Err(e) => report.errors.push(e.to_string()),
            }
        }

        if report.is_valid() {
            if let Err(e) = validate_checks(&checks) {
                report.errors.push(e.to_string());
            }
        }

        for check in &checks {
            let resolved = resolve_program(&check.command);
            if resolved.is_none() {
                report.warnings.push(format!(
                    "check '{}': program `{}` not found on PATH",
                    check.name,
                    check.command.program()
                ));
            }
            report.programs.push((check.name.clone(), resolved));
        }

        report
    }
}
