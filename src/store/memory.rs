//! In-memory approval store.

use crate::store::{check_consistent, ApprovalKey, ApprovalRecord, ApprovalStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryApprovalStore {
    records: RwLock<HashMap<ApprovalKey, ApprovalRecord>>,
    offline: AtomicBool,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store: every call fails until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("record map lock poisoned".to_string())
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn get(&self, key: &ApprovalKey) -> Result<Option<ApprovalRecord>, StoreError> {
        self.check_online()?;
        Ok(self.records.read().map_err(poisoned)?.get(key).cloned())
    }

    async fn upsert(&self, record: &ApprovalRecord) -> Result<(), StoreError> {
        self.check_online()?;
        check_consistent(record)?;
        self.records
            .write()
            .map_err(poisoned)?
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &ApprovalKey) -> Result<bool, StoreError> {
        self.check_online()?;
        Ok(self.records.write().map_err(poisoned)?.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::types::{PageId, RevisionId, RevisionPointer, UserId};

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = MemoryApprovalStore::new();
        let key = ApprovalKey::Page(PageId(1));
        store
            .upsert(&ApprovalRecord::new(key.clone(), RevisionPointer::Page(RevisionId(1)), Some(UserId(3))))
            .await
            .unwrap();
        store
            .upsert(&ApprovalRecord::new(key.clone(), RevisionPointer::Page(RevisionId(2)), None))
            .await
            .unwrap();

        let record = store.get(&key).await.unwrap().unwrap();
        assert_eq!(record.pointer, RevisionPointer::Page(RevisionId(2)));
        assert_eq!(record.approver, None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryApprovalStore::new();
        let key = ApprovalKey::Page(PageId(1));
        assert!(!store.delete(&key).await.unwrap());
        store
            .upsert(&ApprovalRecord::new(key.clone(), RevisionPointer::Page(RevisionId(1)), None))
            .await
            .unwrap();
        assert!(store.delete(&key).await.unwrap());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_rejected() {
        let store = MemoryApprovalStore::new();
        let record = ApprovalRecord::new(
            ApprovalKey::File("Logo.png".into()),
            RevisionPointer::Page(RevisionId(1)),
            None,
        );
        assert!(matches!(
            store.upsert(&record).await,
            Err(StoreError::KindMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = MemoryApprovalStore::new();
        store.set_offline(true);
        assert!(store.get(&ApprovalKey::Page(PageId(1))).await.is_err());
    }
}
