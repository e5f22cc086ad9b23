//! Approval records.

use crate::wiki::types::{ContentKind, PageId, RevisionPointer, Title, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an approvable title: page id for pages, file name for files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKey {
    Page(PageId),
    File(String),
}

impl ApprovalKey {
    /// `None` for a page-kind title that does not exist yet.
    pub fn for_title(title: &Title) -> Option<ApprovalKey> {
        match title.content_kind() {
            ContentKind::Page => title.page_id.map(ApprovalKey::Page),
            ContentKind::File => Some(ApprovalKey::File(title.db_key.clone())),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ApprovalKey::Page(_) => ContentKind::Page,
            ApprovalKey::File(_) => ContentKind::File,
        }
    }
}

impl fmt::Display for ApprovalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalKey::Page(id) => write!(f, "page #{}", id.0),
            ApprovalKey::File(name) => write!(f, "file {}", name),
        }
    }
}

/// The approved revision of one title. At most one per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub key: ApprovalKey,
    pub pointer: RevisionPointer,
    /// `None` for automatic approvals.
    pub approver: Option<UserId>,
    pub approved_at: DateTime<Utc>,
}

impl ApprovalRecord {
    pub fn new(key: ApprovalKey, pointer: RevisionPointer, approver: Option<UserId>) -> Self {
        Self {
            key,
            pointer,
            approver,
            approved_at: Utc::now(),
        }
    }

    /// Key and pointer must be of the same content kind.
    pub fn is_consistent(&self) -> bool {
        self.key.kind() == self.pointer.kind()
    }
}
