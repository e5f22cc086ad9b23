//! Host wiki adapter over the SQLite host corpus tables.
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`), so the
//! crate builds without a database at hand.

use crate::scope::PropertyKey;
use crate::store::sqlite::Pool;
use crate::wiki::parser::{ContentParser, DirectiveParser, ParseOutput};
use crate::wiki::types::*;
use crate::wiki::{LinkIndexer, PropertySource, RevisionSource, SearchIndexer};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;

#[derive(Clone, Debug)]
pub struct SqliteWiki {
    pool: Pool,
}

impl SqliteWiki {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn page_id(&self, title: &Title) -> Result<Option<PageId>> {
        if let Some(id) = title.page_id {
            return Ok(Some(id));
        }
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT page_id FROM page WHERE page_namespace = ? AND page_title = ?",
        )
        .bind(title.namespace.0)
        .bind(&title.db_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id.map(PageId))
    }

    async fn require_page_id(&self, title: &Title) -> Result<PageId> {
        self.page_id(title)
            .await?
            .ok_or_else(|| anyhow!("No such page: {}", title))
    }

    /// Look a user up by name, with their group memberships.
    pub async fn find_user(&self, name: &str) -> Result<Option<User>> {
        let name = normalize_user_name(name);
        let id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM user WHERE user_name = ?")
            .bind(&name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(id) = id else {
            return Ok(None);
        };

        let groups = sqlx::query_scalar::<_, String>(
            "SELECT ug_group FROM user_groups WHERE ug_user = ? ORDER BY ug_group",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(User::new(UserId(id), &name).with_groups(groups)))
    }

    pub async fn user_name(&self, id: UserId) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT user_name FROM user WHERE user_id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    /// Register a user (or add groups to an existing one).
    pub async fn add_user(&self, name: &str, groups: &[&str]) -> Result<User> {
        let name = normalize_user_name(name);
        sqlx::query("INSERT INTO user (user_name) VALUES (?) ON CONFLICT (user_name) DO NOTHING")
            .bind(&name)
            .execute(&self.pool)
            .await?;
        let id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM user WHERE user_name = ?")
            .bind(&name)
            .fetch_one(&self.pool)
            .await?;
        for group in groups {
            sqlx::query("INSERT OR IGNORE INTO user_groups (ug_user, ug_group) VALUES (?, ?)")
                .bind(id)
                .bind(group.to_lowercase())
                .execute(&self.pool)
                .await?;
        }
        self.find_user(&name)
            .await?
            .context("User vanished right after insert")
    }

    /// Create a page with its first revision. Returns the resolved title.
    pub async fn add_page(&self, title: &Title, author: &str, text: &str) -> Result<Title> {
        self.add_revision(title, author, text).await?;
        RevisionSource::resolve(self, title).await
    }

    /// Save a new revision, creating the page if needed.
    ///
    /// Like a host save, the new text is parsed and its properties and links
    /// replace the page's current ones.
    pub async fn add_revision(&self, title: &Title, author: &str, text: &str) -> Result<RevisionId> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO page (page_namespace, page_title) VALUES (?, ?)
             ON CONFLICT (page_namespace, page_title) DO NOTHING",
        )
        .bind(title.namespace.0)
        .bind(&title.db_key)
        .execute(&mut *tx)
        .await?;
        let page_id = sqlx::query_scalar::<_, i64>(
            "SELECT page_id FROM page WHERE page_namespace = ? AND page_title = ?",
        )
        .bind(title.namespace.0)
        .bind(&title.db_key)
        .fetch_one(&mut *tx)
        .await?;

        let rev_id = sqlx::query(
            "INSERT INTO revision (rev_page, rev_user_text, rev_timestamp, rev_text)
             VALUES (?, ?, ?, ?)",
        )
        .bind(page_id)
        .bind(normalize_user_name(author))
        .bind(Utc::now().format("%Y%m%d%H%M%S").to_string())
        .bind(text)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE page SET page_latest = ? WHERE page_id = ?")
            .bind(rev_id)
            .bind(page_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let resolved = title.clone().with_page_id(PageId(page_id));
        let output = DirectiveParser::new().parse(&resolved, text, Some(RevisionId(rev_id)));
        self.push(&resolved, &output).await?;

        Ok(RevisionId(rev_id))
    }

    /// Upload a new file version. The previous current version moves to the
    /// file history; the description page is created on first upload.
    pub async fn upload_file(
        &self,
        title: &Title,
        sha1: &str,
        timestamp: &str,
        author: &str,
    ) -> Result<Title> {
        if self.page_id(title).await?.is_none() {
            self.add_revision(title, author, "").await?;
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO oldimage (oi_name, oi_sha1, oi_timestamp)
             SELECT img_name, img_sha1, img_timestamp FROM image WHERE img_name = ?",
        )
        .bind(&title.db_key)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO image (img_name, img_sha1, img_timestamp) VALUES (?, ?, ?)
             ON CONFLICT (img_name) DO UPDATE SET
                img_sha1 = excluded.img_sha1,
                img_timestamp = excluded.img_timestamp",
        )
        .bind(&title.db_key)
        .bind(sha1)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        RevisionSource::resolve(self, title).await
    }

    /// Text last pushed to the search index for a page.
    pub async fn indexed_text(&self, title: &Title) -> Result<Option<String>> {
        let page_id = self.require_page_id(title).await?;
        let text = sqlx::query_scalar::<_, String>(
            "SELECT si_text FROM searchindex WHERE si_page = ?",
        )
        .bind(page_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(text)
    }

    /// Category memberships currently recorded for a page.
    pub async fn categories(&self, title: &Title) -> Result<Vec<String>> {
        let page_id = self.require_page_id(title).await?;
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT cl_to FROM categorylinks WHERE cl_from = ? ORDER BY cl_to",
        )
        .bind(page_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}

#[async_trait]
impl RevisionSource for SqliteWiki {
    async fn resolve(&self, title: &Title) -> Result<Title> {
        let mut unresolved = title.clone();
        unresolved.page_id = None;
        let mut resolved = title.clone();
        resolved.page_id = self.page_id(&unresolved).await?;
        Ok(resolved)
    }

    async fn page_text(
        &self,
        title: &Title,
        revision: Option<RevisionId>,
    ) -> Result<Option<String>> {
        let Some(page_id) = self.page_id(title).await? else {
            return Ok(None);
        };
        let text = match revision {
            Some(rev) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT rev_text FROM revision WHERE rev_id = ? AND rev_page = ?",
                )
                .bind(rev.0)
                .bind(page_id.0)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, String>(
                    "SELECT r.rev_text FROM revision r
                     JOIN page p ON p.page_latest = r.rev_id
                     WHERE p.page_id = ?",
                )
                .bind(page_id.0)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(text)
    }

    async fn revisions(&self, title: &Title) -> Result<Vec<RevisionInfo>> {
        let Some(page_id) = self.page_id(title).await? else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT rev_id, rev_user_text, rev_timestamp FROM revision
             WHERE rev_page = ? ORDER BY rev_timestamp, rev_id",
        )
        .bind(page_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, author, timestamp)| RevisionInfo {
                id: RevisionId(id),
                author,
                timestamp,
            })
            .collect())
    }

    async fn file_versions(&self, title: &Title) -> Result<Vec<FileVersion>> {
        if title.content_kind() != ContentKind::File {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT oi_sha1, oi_timestamp FROM oldimage WHERE oi_name = ?
             UNION ALL
             SELECT img_sha1, img_timestamp FROM image WHERE img_name = ?
             ORDER BY 2",
        )
        .bind(&title.db_key)
        .bind(&title.db_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sha1, timestamp)| FileVersion { sha1, timestamp })
            .collect())
    }

    async fn latest(&self, title: &Title) -> Result<Option<RevisionPointer>> {
        match title.content_kind() {
            ContentKind::Page => {
                let Some(page_id) = self.page_id(title).await? else {
                    return Ok(None);
                };
                let latest = sqlx::query_scalar::<_, i64>(
                    "SELECT page_latest FROM page WHERE page_id = ? AND page_latest > 0",
                )
                .bind(page_id.0)
                .fetch_optional(&self.pool)
                .await?;
                Ok(latest.map(|id| RevisionPointer::Page(RevisionId(id))))
            }
            ContentKind::File => {
                let row = sqlx::query_as::<_, (String, String)>(
                    "SELECT img_sha1, img_timestamp FROM image WHERE img_name = ?",
                )
                .bind(&title.db_key)
                .fetch_optional(&self.pool)
                .await?;
                Ok(row.map(|(sha1, timestamp)| {
                    RevisionPointer::File(FileVersion { sha1, timestamp })
                }))
            }
        }
    }
}

#[async_trait]
impl PropertySource for SqliteWiki {
    async fn property(&self, title: &Title, key: PropertyKey) -> Result<Option<String>> {
        let Some(page_id) = self.page_id(title).await? else {
            return Ok(None);
        };
        let value = sqlx::query_scalar::<_, String>(
            "SELECT pp_value FROM page_props WHERE pp_page = ? AND pp_propname = ?",
        )
        .bind(page_id.0)
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set_property(
        &self,
        title: &Title,
        key: PropertyKey,
        value: Option<&str>,
    ) -> Result<()> {
        let page_id = self.require_page_id(title).await?;
        match value {
            Some(value) => {
                sqlx::query(
                    "INSERT INTO page_props (pp_page, pp_propname, pp_value) VALUES (?, ?, ?)
                     ON CONFLICT (pp_page, pp_propname) DO UPDATE SET pp_value = excluded.pp_value",
                )
                .bind(page_id.0)
                .bind(key.as_str())
                .bind(value)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM page_props WHERE pp_page = ? AND pp_propname = ?")
                    .bind(page_id.0)
                    .bind(key.as_str())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LinkIndexer for SqliteWiki {
    /// Replace the page's properties, categories and links with the parse output.
    async fn push(&self, title: &Title, output: &ParseOutput) -> Result<()> {
        let page_id = self.require_page_id(title).await?.0;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM page_props WHERE pp_page = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;
        for (key, value) in &output.properties {
            sqlx::query("INSERT INTO page_props (pp_page, pp_propname, pp_value) VALUES (?, ?, ?)")
                .bind(page_id)
                .bind(key.as_str())
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM categorylinks WHERE cl_from = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;
        for category in &output.categories {
            sqlx::query("INSERT INTO categorylinks (cl_from, cl_to) VALUES (?, ?)")
                .bind(page_id)
                .bind(category)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM pagelinks WHERE pl_from = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;
        for link in &output.links {
            sqlx::query("INSERT INTO pagelinks (pl_from, pl_target) VALUES (?, ?)")
                .bind(page_id)
                .bind(link)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to update links for {}", title))?;
        Ok(())
    }
}

#[async_trait]
impl SearchIndexer for SqliteWiki {
    async fn index(&self, title: &Title, text: &str) -> Result<()> {
        let page_id = self.require_page_id(title).await?;
        sqlx::query(
            "INSERT INTO searchindex (si_page, si_text) VALUES (?, ?)
             ON CONFLICT (si_page) DO UPDATE SET si_text = excluded.si_text",
        )
        .bind(page_id.0)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
