//! Audit log writer: append-only JSONL.
//!
//! One JSON object per line, flushed after every write.

use crate::audit::types::LogEntry;
use crate::audit::AuditSink;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct AuditLogger {
    log_path: PathBuf,
    file: Mutex<File>,
    entry_count: AtomicUsize,
}

impl AuditLogger {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

        Ok(Self {
            log_path,
            file: Mutex::new(file),
            entry_count: AtomicUsize::new(0),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Entries written through this logger since it was opened.
    pub fn entry_count(&self) -> usize {
        self.entry_count.load(Ordering::SeqCst)
    }

    /// Default log location (`~/.approvedrevs/approval.jsonl`).
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".approvedrevs").join("approval.jsonl"))
    }
}

impl AuditSink for AuditLogger {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let json = serde_json::to_string(entry).context("Failed to serialize log entry")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("Audit log lock poisoned"))?;
        writeln!(file, "{}", json).context("Failed to write log entry")?;
        file.flush().context("Failed to flush log file")?;
        self.entry_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::AuditAction;
    use chrono::Utc;
    use tempfile::TempDir;

    fn entry(title: &str, action: AuditAction) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            context_id: "ctx".to_string(),
            action,
            title: title.to_string(),
            pointer: Some("revision 4".to_string()),
            performer: Some("Alice".to_string()),
        }
    }

    #[test]
    fn test_write_and_read_log() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("nested").join("approval.jsonl");
        let logger = AuditLogger::with_path(&log_path).unwrap();

        logger.append(&entry("Main Page", AuditAction::Approve)).unwrap();
        assert_eq!(logger.entry_count(), 1);

        let content = fs::read_to_string(&log_path).unwrap();
        let parsed: LogEntry = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.title, "Main Page");
        assert_eq!(parsed.action, AuditAction::Approve);
    }

    #[test]
    fn test_append_only_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("approval.jsonl");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        logger.append(&entry("A", AuditAction::Approve)).unwrap();
        drop(logger);

        let logger = AuditLogger::with_path(&log_path).unwrap();
        logger.append(&entry("B", AuditAction::Unapprove)).unwrap();
        logger.append(&entry("C", AuditAction::Approve)).unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.trim().lines().count(), 3);
    }

    #[test]
    fn test_unapprove_entry_omits_pointer() {
        let mut e = entry("A", AuditAction::Unapprove);
        e.pointer = None;
        let json = serde_json::to_string(&e).unwrap();
        assert!(!json.contains("pointer"));
        assert!(json.contains("\"unapprove\""));
    }
}
