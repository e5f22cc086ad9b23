//! Report buckets and rows.

use crate::wiki::types::*;
use serde::Serialize;
use std::fmt;

/// The four report buckets. Together they partition every title that is
/// in scope or has an approval record, per content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Approved, in scope, and the approval is the latest revision.
    Current,
    /// Approved and in scope, but edited since.
    Stale,
    /// In scope without an approval.
    Unapproved,
    /// Approved, but no longer in scope.
    Invalid,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Current,
        Bucket::Stale,
        Bucket::Unapproved,
        Bucket::Invalid,
    ];

    pub fn from_str_loose(s: &str) -> Option<Bucket> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "current" | "all" | "approved" => Some(Bucket::Current),
            "stale" | "notlatest" => Some(Bucket::Stale),
            "unapproved" => Some(Bucket::Unapproved),
            "invalid" => Some(Bucket::Invalid),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Bucket::Current => "approved, showing the latest revision",
            Bucket::Stale => "approved, but the latest revision is not approved",
            Bucket::Unapproved => "approvable, without an approved revision",
            Bucket::Invalid => "approved, but no longer approvable",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Current => write!(f, "current"),
            Bucket::Stale => write!(f, "stale"),
            Bucket::Unapproved => write!(f, "unapproved"),
            Bucket::Invalid => write!(f, "invalid"),
        }
    }
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub title: Title,
    pub approved: Option<RevisionPointer>,
    /// What "approve latest" would approve.
    pub latest: Option<RevisionPointer>,
    pub approver: Option<UserId>,
}

impl ReportRow {
    pub fn is_latest(&self) -> bool {
        self.approved.is_some() && self.approved == self.latest
    }

    pub fn cursor(&self) -> ReportCursor {
        ReportCursor {
            namespace: self.title.namespace,
            db_key: self.title.db_key.clone(),
        }
    }
}

/// Position after which the next page starts. Rows are ordered by
/// (namespace, title).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportCursor {
    pub namespace: Namespace,
    pub db_key: String,
}

impl ReportCursor {
    /// Parse a prefixed title like `Help:Editing`.
    pub fn parse(prefixed: &str) -> Self {
        let title = Title::parse(prefixed);
        Self {
            namespace: title.namespace,
            db_key: title.db_key,
        }
    }
}

impl fmt::Display for ReportCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Title::new(self.namespace, &self.db_key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPage {
    pub rows: Vec<ReportRow>,
    /// Set when more rows may follow.
    pub next: Option<ReportCursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_aliases() {
        assert_eq!(Bucket::from_str_loose("notlatest"), Some(Bucket::Stale));
        assert_eq!(Bucket::from_str_loose("Unapproved"), Some(Bucket::Unapproved));
        assert_eq!(Bucket::from_str_loose("bogus"), None);
    }

    #[test]
    fn test_cursor_roundtrip_display() {
        let cursor = ReportCursor::parse("Help:Editing pages");
        assert_eq!(cursor.namespace, Namespace::HELP);
        assert_eq!(cursor.db_key, "Editing_pages");
        assert_eq!(cursor.to_string(), "Help:Editing pages");
    }

    #[test]
    fn test_row_is_latest() {
        let row = ReportRow {
            title: Title::new(Namespace::MAIN, "A"),
            approved: Some(RevisionPointer::Page(RevisionId(2))),
            latest: Some(RevisionPointer::Page(RevisionId(2))),
            approver: None,
        };
        assert!(row.is_latest());

        let unapproved = ReportRow {
            approved: None,
            ..row
        };
        assert!(!unapproved.is_latest());
    }
}
