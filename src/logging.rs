//! Append-only error log for non-fatal failures.
//!
//! When `Settings.log` is enabled, every recovered error (skipped URL, bad
//! selector query, failed fetch) is appended here with a timestamp, one
//! line per event. Disabled logs swallow records silently.

use crate::error::ScrapeError;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Default log file name, created next to the output document.
pub const LOG_FILE: &str = "logs.log";

/// Shared append-only error log.
pub struct ErrorLog {
    file: Option<Mutex<File>>,
}

impl ErrorLog {
    /// Open (or create) the log file at `path`. When `enabled` is false the
    /// log is a no-op and no file is touched.
    pub fn open(path: &Path, enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(ErrorLog { file: None });
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open error log: {}", path.display()))?;
        Ok(ErrorLog {
            file: Some(Mutex::new(file)),
        })
    }

    /// A disabled log, for callers that do not want one.
    pub fn disabled() -> Self {
        ErrorLog { file: None }
    }

    /// Append one error. Log-write failures are intentionally ignored; the
    /// log must never take down the run it is reporting on.
    pub fn record(&self, err: &ScrapeError) {
        let Some(file) = &self.file else { return };
        if let Ok(mut file) = file.lock() {
            let _ = writeln!(file, "{} {err}", Utc::now().to_rfc3339());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        let log = ErrorLog::open(&path, false).unwrap();
        log.record(&ScrapeError::InvalidUrl("::".into()));
        assert!(!path.exists());
    }

    #[test]
    fn test_enabled_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        let log = ErrorLog::open(&path, true).unwrap();
        log.record(&ScrapeError::InvalidUrl("::".into()));
        log.record(&ScrapeError::Fetch {
            url: "http://x/".into(),
            reason: "timeout".into(),
        });
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("invalid URL"));
        assert!(lines[1].contains("http://x/"));
    }
}
