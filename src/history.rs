//! Append-only run history.
//!
//! Each completed run becomes one JSON line in the history file. Writers
//! take an exclusive lock on a sidecar `.lock` file so concurrent gates in
//! the same repository never interleave lines.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{GateError, Result};
use crate::quality::{CheckStatus, ExecutionMode, QualityReport};

/// Default history file, relative to the working directory.
pub const DEFAULT_HISTORY_FILE: &str = ".zerogate/history.jsonl";

/// Lock file suffix for concurrent access prevention.
const LOCK_SUFFIX: &str = ".lock";

/// Summary of one run as stored in the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mode: ExecutionMode,
    pub passed: bool,
    pub total_errors: u64,
    pub total_warnings: u64,
    pub total_duration_ms: u64,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub checks_skipped: usize,
    /// Names of failed checks in configuration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

impl HistoryEntry {
    /// Summarize a report.
    #[must_use]
    pub fn from_report(report: &QualityReport) -> Self {
        Self {
            run_id: report.run_id(),
            timestamp: report.timestamp(),
            mode: report.mode(),
            passed: report.overall_passed(),
            total_errors: report.total_errors(),
            total_warnings: report.total_warnings(),
            total_duration_ms: report.total_duration_ms(),
            checks_passed: report.count_by_status(CheckStatus::Passed),
            checks_failed: report.count_by_status(CheckStatus::Failed),
            checks_skipped: report.count_by_status(CheckStatus::Skipped),
            failed: report
                .results()
                .iter()
                .filter(|r| r.status() == CheckStatus::Failed)
                .map(|r| r.name().to_string())
                .collect(),
        }
    }
}

/// JSON-lines history file.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(LOCK_SUFFIX);
        PathBuf::from(name)
    }

    fn io_error(&self, e: std::io::Error) -> GateError {
        GateError::history(&self.path, e.to_string())
    }

    /// Append a summary of `report`, creating the file and its directory
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::History`] if the lock cannot be taken or the
    /// line cannot be written.
    pub fn append(&self, report: &QualityReport) -> Result<HistoryEntry> {
        let entry = HistoryEntry::from_report(report);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let lock_file = File::create(self.lock_file_path()).map_err(|e| self.io_error(e))?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| {
            GateError::history(&self.path, format!("failed to acquire history lock: {e}"))
        })?;

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;

        FileExt::unlock(&lock_file).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), run_id = %entry.run_id, "Appended history entry");

        Ok(entry)
    }

    /// Read every entry, oldest first. A missing file is an empty history;
    /// corrupted lines are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::History`] if the file exists but cannot be read.
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    "Skipping corrupted history line {} in {}: {}",
                    index + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }

    /// The newest `limit` entries, newest first.
    ///
    /// # Errors
    ///
    /// See [`HistoryLog::read_all`].
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{CheckResult, IssueCounts, Severity};
    use tempfile::TempDir;

    fn report(errors: u32) -> QualityReport {
        let exit = i32::from(errors > 0);
        QualityReport::new(
            ExecutionMode::Sequential,
            false,
            vec![
                CheckResult::completed("lint", Severity::Critical, 0, IssueCounts::new(0, 2), 5, None),
                CheckResult::completed(
                    "typecheck",
                    Severity::High,
                    exit,
                    IssueCounts::new(errors, 0),
                    7,
                    None,
                ),
            ],
        )
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("history.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_read() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("nested").join("history.jsonl"));

        let first = log.append(&report(3)).unwrap();
        log.append(&report(0)).unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], first);
        assert!(!entries[0].passed);
        assert_eq!(entries[0].total_errors, 3);
        assert_eq!(entries[0].total_warnings, 2);
        assert_eq!(entries[0].failed, vec!["typecheck".to_string()]);
        assert!(entries[1].passed);
        assert_eq!(entries[1].checks_passed, 2);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("history.jsonl"));
        for errors in [1, 2, 3] {
            log.append(&report(errors)).unwrap();
        }

        let recent = log.recent(2).unwrap();
        let errors: Vec<u64> = recent.iter().map(|e| e.total_errors).collect();
        assert_eq!(errors, vec![3, 2]);
    }

    #[test]
    fn test_corrupted_lines_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.jsonl");
        let log = HistoryLog::new(&path);
        log.append(&report(0)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        drop(file);
        log.append(&report(1)).unwrap();

        assert_eq!(log.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_unwritable_path_is_history_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let log = HistoryLog::new(blocker.join("history.jsonl"));

        let err = log.append(&report(0)).unwrap_err();
        assert!(matches!(err, GateError::History { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
