//! Starter configuration written by `zerogate init`.

use std::path::Path;

use crate::error::{GateError, Result};

/// Zero-tolerance gate for a typical Node/TypeScript web project.
pub const STARTER_CONFIG: &str = r#"# zerogate quality gate configuration.
# Every check must exit 0 with zero errors for the gate to pass.

[settings]
mode = "sequential"     # or "parallel"
fail_fast = false
timeout_ms = 600000     # default per-check timeout (10 minutes)

[[check]]
name = "lint"
run = "npx eslint . --format=json --max-warnings 0"
severity = "critical"
parser = { kind = "eslint-json" }

[[check]]
name = "typecheck"
run = "npx tsc --noEmit --pretty false"
severity = "critical"
parser = { kind = "tsc" }

[[check]]
name = "format"
run = "npx prettier --check ."
severity = "high"
parser = { kind = "prettier-check" }

[[check]]
name = "test"
run = "npx jest --ci --json"
severity = "high"
parser = { kind = "jest-json" }
env = { CI = "true" }

[[check]]
name = "build"
run = "npm run build"
severity = "high"
"#;

/// Write [`STARTER_CONFIG`] to `path`.
///
/// # Errors
///
/// Refuses to replace an existing file unless `force` is set; returns I/O
/// errors from writing.
pub fn write_starter(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(GateError::config_with_path(
            format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ),
            path.to_path_buf(),
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, STARTER_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::quality::validate_checks;
    use tempfile::TempDir;

    #[test]
    fn test_starter_config_is_valid() {
        let config = GateConfig::from_toml_str(STARTER_CONFIG).unwrap();
        let checks = config.check_definitions(Path::new(".")).unwrap();

        let names: Vec<&str> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["lint", "typecheck", "format", "test", "build"]);
        assert!(validate_checks(&checks).is_ok());
        assert!(config.run_options().is_ok());
    }

    #[test]
    fn test_write_starter_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("zerogate.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(write_starter(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        write_starter(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STARTER_CONFIG);
    }
}
