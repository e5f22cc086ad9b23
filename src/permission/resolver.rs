//! Who may approve a title.
//!
//! Grants are checked **in order** and the first one wins:
//!
//! 1. the `approverevisions` capability, globally or for this title;
//! 2. the title's own approver lists (`#approvable_by`), by user name or group;
//! 3. ownership, only inside a self-owned namespace: your own user page, or a
//!    page whose first revision you wrote.
//!
//! Nothing else grants approval. Scope is not checked here; callers go
//! through [`ApprovalContext::can_approve`](crate::approval::ApprovalContext::can_approve),
//! which refuses out-of-scope titles before asking the resolver.

use crate::config::Config;
use crate::permission::authorizer::{Authorizer, Capability};
use crate::scope::{ApproverLists, PropertyKey};
use crate::wiki::types::{Namespace, Title, User};
use crate::wiki::{PropertySource, RevisionSource};
use anyhow::Result;
use std::fmt;

/// The rule that let a user approve a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    Capability,
    ApproverUser,
    ApproverGroup(String),
    OwnUserPage,
    PageCreator,
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::Capability => write!(f, "holds the approverevisions capability"),
            Grant::ApproverUser => write!(f, "listed as an approver of this page"),
            Grant::ApproverGroup(group) => write!(f, "member of approver group '{}'", group),
            Grant::OwnUserPage => write!(f, "owns this user page"),
            Grant::PageCreator => write!(f, "created this page"),
        }
    }
}

pub struct PermissionResolver<'a> {
    config: &'a Config,
    authorizer: &'a dyn Authorizer,
    properties: &'a dyn PropertySource,
    revisions: &'a dyn RevisionSource,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(
        config: &'a Config,
        authorizer: &'a dyn Authorizer,
        properties: &'a dyn PropertySource,
        revisions: &'a dyn RevisionSource,
    ) -> Self {
        Self {
            config,
            authorizer,
            properties,
            revisions,
        }
    }

    /// Walk the grant chain for `user` on `title`. `None` means denied.
    pub async fn resolve(&self, user: &User, title: &Title) -> Result<Option<Grant>> {
        if self
            .authorizer
            .has_capability(user, Capability::ApproveRevisions, Some(title))
        {
            return Ok(Some(Grant::Capability));
        }

        if let Some(grant) = self.declared_grant(user, title).await? {
            return Ok(Some(grant));
        }

        self.ownership_grant(user, title).await
    }

    async fn declared_grant(&self, user: &User, title: &Title) -> Result<Option<Grant>> {
        let users = self.properties.property(title, PropertyKey::ApproverUsers).await?;
        let groups = self.properties.property(title, PropertyKey::ApproverGroups).await?;
        let lists = ApproverLists::parse(users.as_deref(), groups.as_deref());
        if lists.is_empty() {
            return Ok(None);
        }

        if lists.names_user(&user.name) {
            return Ok(Some(Grant::ApproverUser));
        }
        let member_of = self.authorizer.groups(user);
        Ok(lists
            .first_listed_group(&member_of)
            .map(|g| Grant::ApproverGroup(g.to_string())))
    }

    async fn ownership_grant(&self, user: &User, title: &Title) -> Result<Option<Grant>> {
        if !self.config.is_self_owned_namespace(title.namespace) {
            return Ok(None);
        }

        if title.namespace == Namespace::USER {
            return Ok((title.text() == user.name).then_some(Grant::OwnUserPage));
        }

        let revisions = self.revisions.revisions(title).await?;
        Ok(match revisions.first() {
            Some(first) if first.author == user.name => Some(Grant::PageCreator),
            _ => None,
        })
    }
}
