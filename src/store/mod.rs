//! Persisted approval records.
//!
//! The store is the single source of truth for what is approved. Everything
//! derived from an approval (link tables, search text) may lag behind it.

pub mod memory;
pub mod sqlite;
pub mod types;

pub use memory::MemoryApprovalStore;
pub use sqlite::SqliteApprovalStore;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("approval store unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("approval store unavailable: {0}")]
    Unavailable(String),

    #[error("approval record for {key} points at a {pointer_kind} revision")]
    KindMismatch {
        key: ApprovalKey,
        pointer_kind: crate::wiki::ContentKind,
    },
}

/// Upsert/delete/lookup of approval records, keyed by title identity.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn get(&self, key: &ApprovalKey) -> Result<Option<ApprovalRecord>, StoreError>;

    /// Insert or overwrite the record for `record.key`.
    async fn upsert(&self, record: &ApprovalRecord) -> Result<(), StoreError>;

    /// Returns whether a record existed.
    async fn delete(&self, key: &ApprovalKey) -> Result<bool, StoreError>;
}

pub(crate) fn check_consistent(record: &ApprovalRecord) -> Result<(), StoreError> {
    if record.is_consistent() {
        Ok(())
    } else {
        Err(StoreError::KindMismatch {
            key: record.key.clone(),
            pointer_kind: record.pointer.kind(),
        })
    }
}
