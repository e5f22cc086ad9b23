//! SQLite-backed approval store, plus the pool helpers shared with the
//! host adapter and the reporting classifier.

use crate::store::{check_consistent, ApprovalKey, ApprovalRecord, ApprovalStore, StoreError};
use crate::wiki::types::{FileVersion, PageId, RevisionId, RevisionPointer, UserId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{query, Row};
use std::str::FromStr;

pub type Pool = SqlitePool;

/// Open a connection pool, creating the database file if it is missing.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never recycled.
pub async fn connection_pool(url: &str, max_connections: u32) -> Result<Pool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// Create the host corpus and approval tables if they don't exist yet.
pub async fn run_pending_migrations(pool: &Pool) -> Result<()> {
    migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone, Debug)]
pub struct SqliteApprovalStore {
    pool: Pool,
}

impl SqliteApprovalStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl ApprovalStore for SqliteApprovalStore {
    async fn get(&self, key: &ApprovalKey) -> Result<Option<ApprovalRecord>, StoreError> {
        match key {
            ApprovalKey::Page(page_id) => {
                let row = query(
                    "SELECT rev_id, approver_id, approved_at
                     FROM approved_revs WHERE page_id = ?",
                )
                .bind(page_id.0)
                .fetch_optional(&self.pool)
                .await?;

                let Some(row) = row else {
                    return Ok(None);
                };
                Ok(Some(ApprovalRecord {
                    key: key.clone(),
                    pointer: RevisionPointer::Page(RevisionId(row.try_get("rev_id")?)),
                    approver: row.try_get::<Option<i64>, _>("approver_id")?.map(UserId),
                    approved_at: row.try_get::<DateTime<Utc>, _>("approved_at")?,
                }))
            }
            ApprovalKey::File(name) => {
                let row = query(
                    "SELECT approved_sha1, approved_timestamp, approver_id, approved_at
                     FROM approved_revs_files WHERE file_title = ?",
                )
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

                let Some(row) = row else {
                    return Ok(None);
                };
                Ok(Some(ApprovalRecord {
                    key: key.clone(),
                    pointer: RevisionPointer::File(FileVersion {
                        sha1: row.try_get("approved_sha1")?,
                        timestamp: row.try_get("approved_timestamp")?,
                    }),
                    approver: row.try_get::<Option<i64>, _>("approver_id")?.map(UserId),
                    approved_at: row.try_get::<DateTime<Utc>, _>("approved_at")?,
                }))
            }
        }
    }

    async fn upsert(&self, record: &ApprovalRecord) -> Result<(), StoreError> {
        check_consistent(record)?;
        let approver = record.approver.map(|id| id.0);

        match (&record.key, &record.pointer) {
            (ApprovalKey::Page(PageId(page_id)), RevisionPointer::Page(rev)) => {
                query(
                    "INSERT INTO approved_revs (page_id, rev_id, approver_id, approved_at)
                     VALUES (?, ?, ?, ?)
                     ON CONFLICT (page_id) DO UPDATE SET
                        rev_id = excluded.rev_id,
                        approver_id = excluded.approver_id,
                        approved_at = excluded.approved_at",
                )
                .bind(page_id)
                .bind(rev.0)
                .bind(approver)
                .bind(record.approved_at)
                .execute(&self.pool)
                .await?;
            }
            (ApprovalKey::File(name), RevisionPointer::File(version)) => {
                query(
                    "INSERT INTO approved_revs_files
                        (file_title, approved_sha1, approved_timestamp, approver_id, approved_at)
                     VALUES (?, ?, ?, ?, ?)
                     ON CONFLICT (file_title) DO UPDATE SET
                        approved_sha1 = excluded.approved_sha1,
                        approved_timestamp = excluded.approved_timestamp,
                        approver_id = excluded.approver_id,
                        approved_at = excluded.approved_at",
                )
                .bind(name)
                .bind(&version.sha1)
                .bind(&version.timestamp)
                .bind(approver)
                .bind(record.approved_at)
                .execute(&self.pool)
                .await?;
            }
            // check_consistent rejected every other combination
            _ => {}
        }
        Ok(())
    }

    async fn delete(&self, key: &ApprovalKey) -> Result<bool, StoreError> {
        let result = match key {
            ApprovalKey::Page(page_id) => {
                query("DELETE FROM approved_revs WHERE page_id = ?")
                    .bind(page_id.0)
                    .execute(&self.pool)
                    .await?
            }
            ApprovalKey::File(name) => {
                query("DELETE FROM approved_revs_files WHERE file_title = ?")
                    .bind(name)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }
}
