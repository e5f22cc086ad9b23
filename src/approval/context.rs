//! The processing context: every cache the approval logic uses, and nothing
//! that outlives one request.
//!
//! Within a context each answer is computed once and then served from
//! memory, including approval records. A change made by another context is
//! seen only by contexts created after it. Changes made through this context
//! update its own caches.

use crate::approval::deferred::DeferredUpdates;
use crate::permission::{Grant, PermissionResolver};
use crate::scope::{ScopeClassifier, ScopeDecision};
use crate::store::ApprovalKey;
use crate::wiki::types::*;
use crate::wiki::Platform;
use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

type ActorKey = (UserId, String);

pub struct ApprovalContext<'a> {
    id: Uuid,
    pub(crate) platform: &'a Platform,
    scope: HashMap<TitleKey, ScopeDecision>,
    pub(crate) revisions: HashMap<TitleKey, Option<RevisionPointer>>,
    pub(crate) approvers: HashMap<TitleKey, Option<UserId>>,
    pub(crate) contents: HashMap<TitleKey, Option<String>>,
    permissions: HashMap<(ActorKey, TitleKey), Option<Grant>>,
    pub(crate) deferred: DeferredUpdates,
}

impl<'a> ApprovalContext<'a> {
    pub fn new(platform: &'a Platform) -> Self {
        let id = Uuid::new_v4();
        debug!("[{}] New approval context", id);
        Self {
            id,
            platform,
            scope: HashMap::new(),
            revisions: HashMap::new(),
            approvers: HashMap::new(),
            contents: HashMap::new(),
            permissions: HashMap::new(),
            deferred: DeferredUpdates::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn platform(&self) -> &'a Platform {
        self.platform
    }

    /// Fill in the page id if the caller didn't.
    pub async fn resolve(&self, title: &Title) -> Result<Title> {
        if title.exists() {
            return Ok(title.clone());
        }
        self.platform.revisions.resolve(title).await
    }

    /// Scope decision with provenance, memoized per title.
    pub async fn scope(&mut self, title: &Title) -> Result<ScopeDecision> {
        let key = title.key();
        if let Some(decision) = self.scope.get(&key) {
            return Ok(*decision);
        }

        let title = self.resolve(title).await?;
        let platform = self.platform;
        let decision = ScopeClassifier::new(
            &platform.config,
            platform.properties.as_ref(),
            platform.scope_override.as_deref(),
        )
        .classify(&title)
        .await?;

        debug!("[{}] {}: {}", self.id, title, decision);
        self.scope.insert(key, decision);
        Ok(decision)
    }

    pub async fn is_approvable(&mut self, title: &Title) -> Result<bool> {
        Ok(self.scope(title).await?.approvable)
    }

    /// The approved pointer, or `None` when unapproved or out of scope.
    /// Out-of-scope titles never reach the store.
    pub async fn approved_revision(&mut self, title: &Title) -> Result<Option<RevisionPointer>> {
        let key = title.key();
        if let Some(pointer) = self.revisions.get(&key) {
            return Ok(pointer.clone());
        }

        if !self.is_approvable(title).await? {
            self.revisions.insert(key.clone(), None);
            self.approvers.insert(key, None);
            return Ok(None);
        }

        let title = self.resolve(title).await?;
        let record = match ApprovalKey::for_title(&title) {
            Some(store_key) => self.platform.store.get(&store_key).await?,
            None => None,
        };
        debug!(
            "[{}] Loaded approval of {}: {:?}",
            self.id,
            title,
            record.as_ref().map(|r| &r.pointer)
        );

        let (pointer, approver) = match record {
            Some(record) => (Some(record.pointer), record.approver),
            None => (None, None),
        };
        self.revisions.insert(key.clone(), pointer.clone());
        self.approvers.insert(key, approver);
        Ok(pointer)
    }

    pub async fn approved_revision_id(&mut self, title: &Title) -> Result<Option<RevisionId>> {
        Ok(self
            .approved_revision(title)
            .await?
            .and_then(|p| p.revision_id()))
    }

    pub async fn has_approved_revision(&mut self, title: &Title) -> Result<bool> {
        Ok(self.approved_revision(title).await?.is_some())
    }

    /// Who approved the title. `None` for automatic approvals too.
    pub async fn approver(&mut self, title: &Title) -> Result<Option<UserId>> {
        let key = title.key();
        if !self.approvers.contains_key(&key) {
            self.approved_revision(title).await?;
        }
        Ok(self.approvers.get(&key).copied().flatten())
    }

    /// Text readers of an approvable page get by default: the approved
    /// revision's text, or, when there is none, blank or the latest text
    /// depending on `blank_if_unapproved`. `None` for out-of-scope titles
    /// and for files.
    pub async fn approved_content(&mut self, title: &Title) -> Result<Option<String>> {
        let key = title.key();
        if let Some(content) = self.contents.get(&key) {
            return Ok(content.clone());
        }
        if title.content_kind() == ContentKind::File || !self.is_approvable(title).await? {
            self.contents.insert(key, None);
            return Ok(None);
        }

        let title = self.resolve(title).await?;
        let content = match self.approved_revision(&title).await? {
            Some(pointer) => {
                self.platform
                    .revisions
                    .page_text(&title, pointer.revision_id())
                    .await?
            }
            None => self.unapproved_text(&title).await?,
        };
        self.contents.insert(key, content.clone());
        Ok(content)
    }

    /// What an unapproved page shows and indexes.
    pub(crate) async fn unapproved_text(&self, title: &Title) -> Result<Option<String>> {
        if self.platform.config.blank_if_unapproved {
            return Ok(Some(String::new()));
        }
        self.platform.revisions.page_text(title, None).await
    }

    /// Whether `user` may approve or unapprove `title`. Titles out of
    /// scope can't be approved by anyone.
    pub async fn can_approve(&mut self, user: &User, title: &Title) -> Result<bool> {
        Ok(self.approval_grant(user, title).await?.is_some())
    }

    /// The rule that lets `user` approve `title`, memoized per (user, title).
    pub async fn approval_grant(&mut self, user: &User, title: &Title) -> Result<Option<Grant>> {
        let memo_key = ((user.id, user.name.clone()), title.key());
        if let Some(grant) = self.permissions.get(&memo_key) {
            return Ok(grant.clone());
        }

        let grant = if self.is_approvable(title).await? {
            let title = self.resolve(title).await?;
            let platform = self.platform;
            PermissionResolver::new(
                &platform.config,
                platform.authorizer.as_ref(),
                platform.properties.as_ref(),
                platform.revisions.as_ref(),
            )
            .resolve(user, &title)
            .await?
        } else {
            None
        };

        match &grant {
            Some(grant) => debug!("[{}] {} may approve {}: {}", self.id, user.name, title, grant),
            None => debug!("[{}] {} may not approve {}", self.id, user.name, title),
        }
        self.permissions.insert(memo_key, grant.clone());
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::config::Config;
    use crate::store::{ApprovalRecord, ApprovalStore, MemoryApprovalStore};
    use crate::wiki::memory::MemoryWiki;
    use crate::scope::PropertyKey;
    use crate::wiki::PropertySource;
    use std::sync::Arc;

    fn platform(config: Config) -> (Platform, Arc<MemoryWiki>, Arc<MemoryApprovalStore>) {
        let wiki = Arc::new(MemoryWiki::new());
        let store = Arc::new(MemoryApprovalStore::new());
        let platform = Platform::from_host(
            config,
            store.clone(),
            wiki.clone(),
            Arc::new(MemoryAuditSink::new()),
        );
        (platform, wiki, store)
    }

    #[tokio::test]
    async fn test_out_of_scope_never_reads_store() {
        let (platform, wiki, store) = platform(Config::default());
        let title = wiki.add_page(&Title::new(Namespace::TALK, "Chat"), "alice", "hi");
        store.set_offline(true);

        let mut ctx = ApprovalContext::new(&platform);
        assert!(!ctx.is_approvable(&title).await.unwrap());
        assert_eq!(ctx.approved_revision(&title).await.unwrap(), None);
        assert_eq!(ctx.approved_content(&title).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_records_are_snapshotted_per_context() {
        let (platform, wiki, store) = platform(Config::default());
        let title = wiki.add_page(&Title::new(Namespace::MAIN, "Home"), "alice", "v1");
        let rev = RevisionId(1);

        let mut ctx = ApprovalContext::new(&platform);
        assert!(!ctx.has_approved_revision(&title).await.unwrap());

        let key = ApprovalKey::for_title(&title).unwrap();
        store
            .upsert(&ApprovalRecord::new(key, RevisionPointer::Page(rev), Some(UserId(9))))
            .await
            .unwrap();

        // The first context keeps its answer, a fresh one sees the record.
        assert!(!ctx.has_approved_revision(&title).await.unwrap());
        let mut fresh = ApprovalContext::new(&platform);
        assert_eq!(fresh.approved_revision_id(&title).await.unwrap(), Some(rev));
        assert_eq!(fresh.approver(&title).await.unwrap(), Some(UserId(9)));
    }

    #[tokio::test]
    async fn test_unapproved_content_follows_blank_flag() {
        let config = Config {
            blank_if_unapproved: true,
            ..Config::default()
        };
        let (platform, wiki, _) = platform(config);
        let title = wiki.add_page(&Title::new(Namespace::MAIN, "Home"), "alice", "draft");

        let mut ctx = ApprovalContext::new(&platform);
        assert_eq!(ctx.approved_content(&title).await.unwrap().as_deref(), Some(""));

        let (platform, wiki, _) = self::platform(Config::default());
        let title = wiki.add_page(&Title::new(Namespace::MAIN, "Home"), "alice", "draft");
        let mut ctx = ApprovalContext::new(&platform);
        assert_eq!(ctx.approved_content(&title).await.unwrap().as_deref(), Some("draft"));
    }

    #[tokio::test]
    async fn test_can_approve_is_scope_gated() {
        let (platform, wiki, _) = platform(Config::default());
        let sysop = User::new(UserId(1), "Root").with_groups(["sysop"]);
        let chat = wiki.add_page(&Title::new(Namespace::TALK, "Chat"), "alice", "hi");
        let home = wiki.add_page(&Title::new(Namespace::MAIN, "Home"), "alice", "hi");

        let mut ctx = ApprovalContext::new(&platform);
        assert!(!ctx.can_approve(&sysop, &chat).await.unwrap());
        assert_eq!(
            ctx.approval_grant(&sysop, &home).await.unwrap(),
            Some(Grant::Capability)
        );
    }

    #[tokio::test]
    async fn test_permission_memo_is_per_user() {
        let (platform, wiki, _) = platform(Config::default());
        let title = wiki.add_page(&Title::new(Namespace::TALK, "Drafts"), "alice", "x");
        wiki.set_property(&title, PropertyKey::ApproverUsers, Some("Alice"))
            .await
            .unwrap();

        let alice = User::new(UserId(2), "Alice");
        let bob = User::new(UserId(3), "Bob");
        let mut ctx = ApprovalContext::new(&platform);
        assert!(ctx.can_approve(&alice, &title).await.unwrap());
        assert!(!ctx.can_approve(&bob, &title).await.unwrap());
        assert!(ctx.can_approve(&alice, &title).await.unwrap());
    }

    #[tokio::test]
    async fn test_unresolved_title_is_resolved() {
        let (platform, wiki, _) = platform(Config::default());
        wiki.add_page(&Title::new(Namespace::MAIN, "Home"), "alice", "x");

        let mut ctx = ApprovalContext::new(&platform);
        assert!(ctx.is_approvable(&Title::parse("Home")).await.unwrap());
        assert!(!ctx.is_approvable(&Title::parse("Missing")).await.unwrap());
    }
}
