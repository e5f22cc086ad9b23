//! Paginated, read-only listing of the report buckets.

use crate::config::Config;
use crate::report::query::{bucket_query, count_query};
use crate::report::types::*;
use crate::store::sqlite::Pool;
use crate::wiki::types::*;
use anyhow::{Context, Result};
use futures_util::stream::{self, Stream, TryStreamExt};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

pub struct ReportingClassifier {
    pool: Pool,
    config: Arc<Config>,
}

impl ReportingClassifier {
    pub fn new(pool: Pool, config: Arc<Config>) -> Self {
        Self { pool, config }
    }

    /// Up to `limit` rows of `bucket`, starting after `after`.
    pub async fn page(
        &self,
        kind: ContentKind,
        bucket: Bucket,
        after: Option<&ReportCursor>,
        limit: u32,
    ) -> Result<ReportPage> {
        let limit = limit.max(1);
        let sql = bucket_query(&self.config, kind, bucket, after.is_some());

        let mut query = sqlx::query(&sql);
        if let Some(cursor) = after {
            query = query
                .bind(cursor.namespace.0)
                .bind(cursor.namespace.0)
                .bind(&cursor.db_key);
        }
        let rows = query
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} {}s", bucket, kind))?;

        let rows = rows
            .iter()
            .map(|row| decode_row(kind, row))
            .collect::<Result<Vec<_>>>()?;
        debug!("Report {} {}: {} rows after {:?}", kind, bucket, rows.len(), after);

        let next = if rows.len() == limit as usize {
            rows.last().map(ReportRow::cursor)
        } else {
            None
        };
        Ok(ReportPage { rows, next })
    }

    /// Every row of `bucket`, fetched `batch` rows at a time.
    pub fn stream(
        &self,
        kind: ContentKind,
        bucket: Bucket,
        batch: u32,
    ) -> impl Stream<Item = Result<ReportRow>> + '_ {
        stream::try_unfold(Some(None::<ReportCursor>), move |state| async move {
            let Some(after) = state else {
                return Ok::<_, anyhow::Error>(None);
            };
            let page = self.page(kind, bucket, after.as_ref(), batch).await?;
            let rows = stream::iter(page.rows.into_iter().map(Ok::<_, anyhow::Error>));
            Ok(Some((rows, page.next.map(Some))))
        })
        .try_flatten()
    }

    pub async fn count(&self, kind: ContentKind, bucket: Bucket) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&count_query(&self.config, kind, bucket))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {} {}s", bucket, kind))?;
        Ok(count)
    }
}

fn decode_row(kind: ContentKind, row: &SqliteRow) -> Result<ReportRow> {
    let namespace = Namespace(row.try_get("ns")?);
    let db_key: String = row.try_get("title")?;
    let title = Title {
        namespace,
        db_key,
        page_id: Some(PageId(row.try_get("page_id")?)),
    };
    let approver = row.try_get::<Option<i64>, _>("approver_id")?.map(UserId);

    let (approved, latest) = match kind {
        ContentKind::Page => {
            let latest: i64 = row.try_get("latest_rev")?;
            let approved: Option<i64> = row.try_get("approved_rev")?;
            (
                approved.map(|id| RevisionPointer::Page(RevisionId(id))),
                (latest > 0).then(|| RevisionPointer::Page(RevisionId(latest))),
            )
        }
        ContentKind::File => {
            let latest = RevisionPointer::File(FileVersion {
                sha1: row.try_get("latest_sha1")?,
                timestamp: row.try_get("latest_timestamp")?,
            });
            let approved_sha1: Option<String> = row.try_get("approved_sha1")?;
            let approved_timestamp: Option<String> = row.try_get("approved_timestamp")?;
            let approved = match (approved_sha1, approved_timestamp) {
                (Some(sha1), Some(timestamp)) => {
                    Some(RevisionPointer::File(FileVersion { sha1, timestamp }))
                }
                _ => None,
            };
            (approved, Some(latest))
        }
    };

    Ok(ReportRow {
        title,
        approved,
        latest,
        approver,
    })
}
