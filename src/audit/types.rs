//! Types for the approval audit log.
//!
//! Every approve and unapprove gets one entry, whether a person or the
//! system performed it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Approve,
    Unapprove,
}

impl AuditAction {
    pub fn from_str_loose(s: &str) -> Option<AuditAction> {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" | "approval" => Some(AuditAction::Approve),
            "unapprove" | "unapproved" | "unapproval" => Some(AuditAction::Unapprove),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Approve => write!(f, "approve"),
            AuditAction::Unapprove => write!(f, "unapprove"),
        }
    }
}

/// A single entry in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,

    /// Id of the processing context that made the change
    pub context_id: String,

    pub action: AuditAction,

    /// Prefixed title, e.g. `File:Logo.png`
    pub title: String,

    /// What was approved; absent for unapprovals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    /// Who did it; absent for automatic approvals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
}

impl LogEntry {
    pub fn is_automatic(&self) -> bool {
        self.performer.is_none()
    }
}

/// Summary statistics over a set of audit entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: usize,
    pub approvals: usize,
    pub automatic: usize,
    pub unapprovals: usize,
    pub titles: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl AuditSummary {
    pub fn one_line(&self) -> String {
        format!(
            "{} entries | {} approvals ({} automatic) | {} unapprovals | {} titles",
            self.total, self.approvals, self.automatic, self.unapprovals, self.titles
        )
    }
}

/// Filter criteria for querying the audit log.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Prefixed title to match exactly
    pub title: Option<String>,
    pub action: Option<AuditAction>,
    /// Keep only the most recent `limit` matches
    pub limit: Option<usize>,
}
