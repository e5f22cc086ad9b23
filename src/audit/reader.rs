//! Audit log reader: filter, summarize and display approval history.

use crate::audit::types::*;
use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub struct AuditReader {
    log_path: PathBuf,
}

impl AuditReader {
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            log_path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every entry. A log that was never written reads as empty.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.log_path)
            .with_context(|| format!("Failed to read log file: {}", self.log_path.display()))?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse log entry at line {}", i + 1))
            })
            .collect()
    }

    /// Matching entries in log order. With a limit, the most recent ones are kept.
    pub fn filter_entries(entries: &[LogEntry], filter: &LogFilter) -> Vec<LogEntry> {
        let matched: Vec<&LogEntry> = entries
            .iter()
            .filter(|e| {
                if let Some(ref title) = filter.title {
                    if e.title != *title {
                        return false;
                    }
                }
                if let Some(action) = filter.action {
                    if e.action != action {
                        return false;
                    }
                }
                true
            })
            .collect();

        let skip = match filter.limit {
            Some(limit) => matched.len().saturating_sub(limit),
            None => 0,
        };
        matched.into_iter().skip(skip).cloned().collect()
    }

    /// The most recent approval of `title`, if it was approved at all.
    pub fn latest_approval<'a>(entries: &'a [LogEntry], title: &str) -> Option<&'a LogEntry> {
        entries
            .iter()
            .rev()
            .find(|e| e.title == title && e.action == AuditAction::Approve)
    }

    pub fn summarize(entries: &[LogEntry]) -> AuditSummary {
        let mut summary = AuditSummary {
            total: entries.len(),
            start_time: entries.first().map(|e| e.timestamp),
            end_time: entries.last().map(|e| e.timestamp),
            ..Default::default()
        };

        let mut titles = BTreeSet::new();
        for entry in entries {
            titles.insert(entry.title.as_str());
            match entry.action {
                AuditAction::Approve => {
                    summary.approvals += 1;
                    if entry.is_automatic() {
                        summary.automatic += 1;
                    }
                }
                AuditAction::Unapprove => summary.unapprovals += 1,
            }
        }
        summary.titles = titles.len();
        summary
    }

    /// Pretty-print an entry for terminal display.
    pub fn format_entry(entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let action = match entry.action {
            AuditAction::Approve => "APPROVED".green().to_string(),
            AuditAction::Unapprove => "UNAPPROVED".yellow().to_string(),
        };

        let mut line = format!("[{}] {} {}", timestamp.dimmed(), action, entry.title.bold());
        if let Some(ref pointer) = entry.pointer {
            line.push_str(&format!(" ({})", pointer));
        }
        match entry.performer {
            Some(ref who) => line.push_str(&format!(" by {}", who)),
            None => line.push_str(&format!(" {}", "automatic".dimmed())),
        }
        line
    }
}
