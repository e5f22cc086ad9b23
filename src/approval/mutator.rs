//! Approve and unapprove.
//!
//! The record write is the only step whose failure reaches the caller.
//! Re-indexing is queued for [`ApprovalContext::run_deferred`], and the audit
//! entry and event are best-effort.

use crate::approval::deferred::DeferredUpdate;
use crate::approval::{ApprovalContext, ApprovalError};
use crate::audit::{AuditAction, LogEntry};
use crate::permission::Capability;
use crate::store::{ApprovalKey, ApprovalRecord};
use crate::wiki::events::ApprovalEvent;
use crate::wiki::types::*;
use chrono::Utc;
use tracing::{info, warn};

/// Who is performing a change.
#[derive(Debug, Clone, Copy)]
pub enum Approver<'u> {
    /// A person; must be allowed to approve the title.
    User(&'u User),
    /// Automatic approvals and maintenance. No check, no approver recorded.
    System,
}

impl<'u> Approver<'u> {
    fn user_id(&self) -> Option<UserId> {
        match self {
            Approver::User(user) => Some(user.id),
            Approver::System => None,
        }
    }

    fn name(&self) -> Option<String> {
        match self {
            Approver::User(user) => Some(user.name.clone()),
            Approver::System => None,
        }
    }
}

impl<'a> ApprovalContext<'a> {
    /// Record `pointer` as the approved revision of `title`.
    pub async fn approve(
        &mut self,
        title: &Title,
        pointer: RevisionPointer,
        approver: Approver<'_>,
    ) -> Result<(), ApprovalError> {
        let title = self.authorize(title, approver).await?;
        let key = self.approval_key(&title)?;
        self.check_pointer(&title, &pointer).await?;

        let record = ApprovalRecord::new(key, pointer.clone(), approver.user_id());
        self.platform.store.upsert(&record).await?;

        let cache_key = title.key();
        self.revisions.insert(cache_key.clone(), Some(pointer.clone()));
        self.approvers.insert(cache_key.clone(), record.approver);
        self.contents.remove(&cache_key);
        info!(
            "[{}] Approved {} of {} ({})",
            self.id(),
            pointer,
            title,
            approver.name().as_deref().unwrap_or("automatic")
        );

        if let Some(revision) = pointer.revision_id() {
            if !self.is_latest(&title, &pointer).await {
                match self.platform.revisions.page_text(&title, Some(revision)).await {
                    Ok(Some(text)) => self.queue_reindex(&title, &text, Some(revision)),
                    Ok(None) => warn!(
                        "[{}] Revision {} of {} has no text, skipping re-index",
                        self.id(),
                        revision,
                        title
                    ),
                    Err(e) => warn!(
                        "[{}] Could not load revision {} of {}: {:#}",
                        self.id(),
                        revision,
                        title,
                        e
                    ),
                }
            }
        }

        self.audit(AuditAction::Approve, &title, Some(&pointer), approver);
        self.platform.events.publish(ApprovalEvent::Approved { title, pointer });
        Ok(())
    }

    /// Approve whatever is currently the latest revision or file version.
    pub async fn approve_latest(
        &mut self,
        title: &Title,
        approver: Approver<'_>,
    ) -> Result<RevisionPointer, ApprovalError> {
        let title = self.resolve(title).await?;
        let latest = self
            .platform
            .revisions
            .latest(&title)
            .await?
            .ok_or_else(|| ApprovalError::CannotApprove {
                title: title.prefixed_text(),
            })?;
        self.approve(&title, latest.clone(), approver).await?;
        Ok(latest)
    }

    /// Remove the approval of `title`. Returns whether there was one.
    pub async fn unapprove(
        &mut self,
        title: &Title,
        approver: Approver<'_>,
    ) -> Result<bool, ApprovalError> {
        let title = match approver {
            Approver::System => self.resolve(title).await?,
            Approver::User(user) => {
                let resolved = self.resolve(title).await?;
                // Records of titles that fell out of scope can still be
                // cleared by anyone holding the approve right.
                let out_of_scope_approver = !self.is_approvable(&resolved).await?
                    && self.platform.authorizer.has_capability(
                        user,
                        Capability::ApproveRevisions,
                        Some(&resolved),
                    );
                if out_of_scope_approver {
                    resolved
                } else {
                    self.authorize(&resolved, approver).await?
                }
            }
        };
        let key = self.approval_key(&title)?;

        let existed = self.platform.store.delete(&key).await?;

        let cache_key = title.key();
        self.revisions.insert(cache_key.clone(), None);
        self.approvers.insert(cache_key.clone(), None);
        self.contents.remove(&cache_key);
        info!(
            "[{}] Unapproved {} ({})",
            self.id(),
            title,
            approver.name().as_deref().unwrap_or("automatic")
        );

        if title.content_kind() == ContentKind::Page {
            match self.unapproved_text(&title).await {
                Ok(Some(text)) => self.queue_reindex(&title, &text, None),
                Ok(None) => {}
                Err(e) => warn!(
                    "[{}] Could not load text of {} for re-index: {:#}",
                    self.id(),
                    title,
                    e
                ),
            }
        }

        self.audit(AuditAction::Unapprove, &title, None, approver);
        self.platform.events.publish(ApprovalEvent::Unapproved { title });
        Ok(existed)
    }

    /// Automatic approval hook for a fresh save or upload.
    ///
    /// The new latest revision is approved as a system approval when
    /// automatic approvals are on and `author` could have approved it by
    /// hand. Returns whether it was approved.
    pub async fn on_revision_saved(
        &mut self,
        title: &Title,
        pointer: RevisionPointer,
        author: &User,
    ) -> Result<bool, ApprovalError> {
        if !self.platform.config.automatic_approvals {
            return Ok(false);
        }
        let title = self.resolve(title).await?;
        if !self.can_approve(author, &title).await? {
            return Ok(false);
        }
        self.approve(&title, pointer, Approver::System).await?;
        Ok(true)
    }

    /// Resolve the title and refuse it unless it's in scope and, for a
    /// person, they may approve it.
    async fn authorize(&mut self, title: &Title, approver: Approver<'_>) -> Result<Title, ApprovalError> {
        let title = self.resolve(title).await?;
        let allowed = match approver {
            Approver::User(user) => self.can_approve(user, &title).await?,
            Approver::System => self.is_approvable(&title).await?,
        };
        if !allowed {
            return Err(ApprovalError::CannotApprove {
                title: title.prefixed_text(),
            });
        }
        Ok(title)
    }

    /// The pointer must name an existing revision (pages) or an uploaded
    /// version (files) of this very title.
    async fn check_pointer(&self, title: &Title, pointer: &RevisionPointer) -> Result<(), ApprovalError> {
        let known = match (title.content_kind(), pointer) {
            (ContentKind::Page, RevisionPointer::Page(id)) => self
                .platform
                .revisions
                .revisions(title)
                .await?
                .iter()
                .any(|rev| rev.id == *id),
            (ContentKind::File, RevisionPointer::File(version)) => self
                .platform
                .revisions
                .file_versions(title)
                .await?
                .contains(version),
            _ => false,
        };
        if !known {
            return Err(ApprovalError::UnknownRevision {
                title: title.prefixed_text(),
                pointer: pointer.to_string(),
            });
        }
        Ok(())
    }

    fn approval_key(&self, title: &Title) -> Result<ApprovalKey, ApprovalError> {
        ApprovalKey::for_title(title).ok_or_else(|| ApprovalError::CannotApprove {
            title: title.prefixed_text(),
        })
    }

    /// Only a confirmed match counts; a failed lookup means "maybe not".
    async fn is_latest(&self, title: &Title, pointer: &RevisionPointer) -> bool {
        match self.platform.revisions.latest(title).await {
            Ok(latest) => latest.as_ref() == Some(pointer),
            Err(e) => {
                warn!("[{}] Could not load latest revision of {}: {:#}", self.id(), title, e);
                false
            }
        }
    }

    fn queue_reindex(&mut self, title: &Title, text: &str, revision: Option<RevisionId>) {
        let output = self.platform.parser.parse(title, text, revision);
        self.deferred.push(DeferredUpdate::Links {
            title: title.clone(),
            output,
        });
        self.deferred.push(DeferredUpdate::Search {
            title: title.clone(),
            text: text.to_string(),
        });
    }

    fn audit(
        &self,
        action: AuditAction,
        title: &Title,
        pointer: Option<&RevisionPointer>,
        approver: Approver<'_>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            context_id: self.id().to_string(),
            action,
            title: title.prefixed_text(),
            pointer: pointer.map(|p| p.to_string()),
            performer: approver.name(),
        };
        if let Err(e) = self.platform.audit.append(&entry) {
            warn!("[{}] Failed to write audit entry for {}: {:#}", self.id(), title, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::config::Config;
    use crate::store::{ApprovalStore, MemoryApprovalStore, StoreError};
    use crate::scope::PropertyKey;
    use crate::wiki::memory::MemoryWiki;
    use crate::wiki::{BroadcastEvents, Platform, PropertySource};
    use std::sync::Arc;

    struct Fixture {
        platform: Platform,
        wiki: Arc<MemoryWiki>,
        store: Arc<MemoryApprovalStore>,
        audit: Arc<MemoryAuditSink>,
        events: Arc<BroadcastEvents>,
    }

    fn fixture(config: Config) -> Fixture {
        let wiki = Arc::new(MemoryWiki::new());
        let store = Arc::new(MemoryApprovalStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let events = Arc::new(BroadcastEvents::default());
        let platform = Platform::from_host(config, store.clone(), wiki.clone(), audit.clone())
            .with_events(events.clone());
        Fixture {
            platform,
            wiki,
            store,
            audit,
            events,
        }
    }

    fn sysop() -> User {
        User::new(UserId(1), "Root").with_groups(["sysop"])
    }

    #[tokio::test]
    async fn test_approve_old_revision_queues_reindex() {
        let f = fixture(Config::default());
        let title = Title::new(Namespace::MAIN, "Guide");
        let page = f.wiki.add_page(&title, "alice", "[[Category:Old]]");
        let r1 = RevisionId(1);
        f.wiki.add_revision(&title, "bob", "[[Category:New]]");
        let mut events = f.events.subscribe();

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        ctx.approve(&page, RevisionPointer::Page(r1), Approver::User(&root))
            .await
            .unwrap();

        assert_eq!(ctx.pending_updates(), 2);
        let report = ctx.run_deferred().await;
        assert_eq!(report, crate::approval::DeferredReport { ran: 2, failed: 0 });

        let pushed = f.wiki.pushed();
        assert!(pushed[0].1.categories.contains("Old"));
        assert_eq!(f.wiki.indexed()[0].1, "[[Category:Old]]");

        let entries = f.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].performer.as_deref(), Some("Root"));

        let event = events.try_recv().unwrap();
        assert_eq!(event.name(), "approved");
    }

    #[tokio::test]
    async fn test_approve_latest_skips_reindex() {
        let f = fixture(Config::default());
        let page = f.wiki.add_page(&Title::new(Namespace::MAIN, "Guide"), "alice", "v1");

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        let pointer = ctx.approve_latest(&page, Approver::User(&root)).await.unwrap();
        assert_eq!(pointer, RevisionPointer::Page(RevisionId(1)));
        assert_eq!(ctx.pending_updates(), 0);
        assert_eq!(ctx.approver(&page).await.unwrap(), Some(UserId(1)));
    }

    #[tokio::test]
    async fn test_denied_user_cannot_approve() {
        let f = fixture(Config::default());
        let page = f.wiki.add_page(&Title::new(Namespace::MAIN, "Guide"), "alice", "v1");
        let bob = User::new(UserId(5), "Bob");

        let mut ctx = ApprovalContext::new(&f.platform);
        let err = ctx
            .approve(&page, RevisionPointer::Page(RevisionId(1)), Approver::User(&bob))
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::CannotApprove { .. }));
        assert!(f.store.is_empty());
        assert!(f.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_scope_gives_the_same_error() {
        let f = fixture(Config::default());
        let page = f.wiki.add_page(&Title::new(Namespace::TALK, "Guide"), "alice", "v1");

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        let err = ctx
            .approve(&page, RevisionPointer::Page(RevisionId(1)), Approver::User(&root))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot approve this title: Talk:Guide");
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_before_side_effects() {
        let f = fixture(Config::default());
        let title = Title::new(Namespace::MAIN, "Guide");
        let page = f.wiki.add_page(&title, "alice", "v1");
        f.wiki.add_revision(&title, "alice", "v2");

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        ctx.is_approvable(&page).await.unwrap();
        f.store.set_offline(true);

        let err = ctx
            .approve(&page, RevisionPointer::Page(RevisionId(1)), Approver::User(&root))
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Persistence(StoreError::Unavailable(_))));
        assert_eq!(ctx.pending_updates(), 0);
        assert!(f.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn test_side_effect_failures_do_not_fail_approval() {
        let f = fixture(Config::default());
        let title = Title::new(Namespace::MAIN, "Guide");
        let page = f.wiki.add_page(&title, "alice", "v1");
        f.wiki.add_revision(&title, "alice", "v2");
        f.wiki.fail_indexing(true);
        f.audit.set_failing(true);

        let mut ctx = ApprovalContext::new(&f.platform);
        ctx.approve(&page, RevisionPointer::Page(RevisionId(1)), Approver::System)
            .await
            .unwrap();
        let report = ctx.run_deferred().await;
        assert_eq!(report.failed, 2);

        let key = ApprovalKey::for_title(&page).unwrap();
        assert!(f.store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unapprove_reindexes_blank_when_configured() {
        let config = Config {
            blank_if_unapproved: true,
            ..Config::default()
        };
        let f = fixture(config);
        let page = f.wiki.add_page(&Title::new(Namespace::MAIN, "Guide"), "alice", "v1");

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        ctx.approve_latest(&page, Approver::User(&root)).await.unwrap();
        assert!(ctx.unapprove(&page, Approver::User(&root)).await.unwrap());

        assert!(!ctx.has_approved_revision(&page).await.unwrap());
        assert_eq!(ctx.approved_content(&page).await.unwrap().as_deref(), Some(""));
        ctx.run_deferred().await;
        assert_eq!(f.wiki.indexed().last().map(|(_, t)| t.as_str()), Some(""));

        let actions: Vec<AuditAction> = f.audit.entries().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Approve, AuditAction::Unapprove]);
    }

    #[tokio::test]
    async fn test_automatic_approval_records_no_approver() {
        let f = fixture(Config::default());
        let title = Title::new(Namespace::MAIN, "Guide");
        let page = f.wiki.add_page(&title, "root", "v1");
        let rev = f.wiki.add_revision(&title, "root", "v2");

        let mut ctx = ApprovalContext::new(&f.platform);
        let approved = ctx
            .on_revision_saved(&page, RevisionPointer::Page(rev), &sysop())
            .await
            .unwrap();
        assert!(approved);
        assert_eq!(ctx.approved_revision_id(&page).await.unwrap(), Some(rev));
        assert_eq!(ctx.approver(&page).await.unwrap(), None);
        assert!(f.audit.entries()[0].is_automatic());

        let bob = User::new(UserId(5), "Bob");
        let rev3 = f.wiki.add_revision(&title, "bob", "v3");
        assert!(!ctx
            .on_revision_saved(&page, RevisionPointer::Page(rev3), &bob)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_automatic_approvals_can_be_disabled() {
        let config = Config {
            automatic_approvals: false,
            ..Config::default()
        };
        let f = fixture(config);
        let page = f.wiki.add_page(&Title::new(Namespace::MAIN, "Guide"), "root", "v1");

        let mut ctx = ApprovalContext::new(&f.platform);
        assert!(!ctx
            .on_revision_saved(&page, RevisionPointer::Page(RevisionId(1)), &sysop())
            .await
            .unwrap());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_file_approval_has_no_reindex() {
        let f = fixture(Config::default());
        let title = Title::new(Namespace::FILE, "Logo.png");
        f.wiki.upload_file(&title, "aaa", "20240101000000", "alice");
        let file = f.wiki.upload_file(&title, "bbb", "20240202000000", "alice");
        f.wiki
            .set_property(&file, PropertyKey::Marker, Some("y"))
            .await
            .unwrap();

        let old = RevisionPointer::File(FileVersion {
            sha1: "aaa".into(),
            timestamp: "20240101000000".into(),
        });
        let mut ctx = ApprovalContext::new(&f.platform);
        ctx.approve(&file, old.clone(), Approver::System).await.unwrap();
        assert_eq!(ctx.pending_updates(), 0);
        assert_eq!(ctx.approved_revision(&file).await.unwrap(), Some(old));
        assert_eq!(ctx.approved_content(&file).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revision_of_another_page_is_refused() {
        let f = fixture(Config::default());
        let guide = f.wiki.add_page(&Title::new(Namespace::MAIN, "Guide"), "alice", "v1");
        let other_rev = f.wiki.add_revision(&Title::new(Namespace::MAIN, "Other"), "alice", "x");

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        for pointer in [RevisionPointer::Page(other_rev), RevisionPointer::Page(RevisionId(9999))] {
            let err = ctx
                .approve(&guide, pointer, Approver::User(&root))
                .await
                .unwrap_err();
            assert!(matches!(err, ApprovalError::UnknownRevision { .. }));
        }
        assert_eq!(
            ctx.approve(&guide, RevisionPointer::Page(RevisionId(9999)), Approver::System)
                .await
                .unwrap_err()
                .to_string(),
            "revision 9999 does not belong to Guide"
        );

        assert!(f.store.is_empty());
        assert!(f.audit.entries().is_empty());
        let mut fresh = ApprovalContext::new(&f.platform);
        assert_eq!(fresh.approved_revision(&guide).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_pointer_must_be_an_uploaded_version() {
        let f = fixture(Config::default());
        let title = Title::new(Namespace::FILE, "Logo.png");
        let file = f.wiki.upload_file(&title, "aaa", "20240101000000", "alice");
        f.wiki
            .set_property(&file, PropertyKey::Marker, Some("y"))
            .await
            .unwrap();

        let mut ctx = ApprovalContext::new(&f.platform);
        let never_uploaded = RevisionPointer::File(FileVersion {
            sha1: "zzz".into(),
            timestamp: "20240101000000".into(),
        });
        for pointer in [never_uploaded, RevisionPointer::Page(RevisionId(1))] {
            let err = ctx.approve(&file, pointer, Approver::System).await.unwrap_err();
            assert!(matches!(err, ApprovalError::UnknownRevision { .. }));
        }
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_approver_clears_record_of_out_of_scope_title() {
        let f = fixture(Config::default());
        let page = f.wiki.add_page(&Title::new(Namespace::TALK, "Plan"), "alice", "v1");
        f.wiki
            .set_property(&page, PropertyKey::Marker, Some("y"))
            .await
            .unwrap();

        let root = sysop();
        let mut ctx = ApprovalContext::new(&f.platform);
        ctx.approve_latest(&page, Approver::User(&root)).await.unwrap();
        f.wiki.set_property(&page, PropertyKey::Marker, None).await.unwrap();

        let mut ctx = ApprovalContext::new(&f.platform);
        assert!(!ctx.is_approvable(&page).await.unwrap());
        let bob = User::new(UserId(5), "Bob");
        let err = ctx.unapprove(&page, Approver::User(&bob)).await.unwrap_err();
        assert!(matches!(err, ApprovalError::CannotApprove { .. }));
        assert!(!f.store.is_empty());

        assert!(ctx.unapprove(&page, Approver::User(&root)).await.unwrap());
        assert!(f.store.is_empty());
        let last = f.audit.entries().pop().unwrap();
        assert_eq!(last.action, AuditAction::Unapprove);
        assert_eq!(last.performer.as_deref(), Some("Root"));
    }
}
