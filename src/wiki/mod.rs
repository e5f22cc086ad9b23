//! The host wiki platform, seen only through the interfaces approval logic needs.
//!
//! Revision storage, page properties, parsing, link and search indexing, the
//! event bus and the permission substrate all belong to the host. This module
//! defines those seams as traits and ships two adapters: [`sqlite::SqliteWiki`]
//! over a minimal host schema, and [`memory::MemoryWiki`] for tests.

pub mod events;
pub mod memory;
pub mod parser;
pub mod sqlite;
pub mod types;

pub use events::{ApprovalEvent, BroadcastEvents, EventBus};
pub use parser::{ContentParser, DirectiveParser, ParseOutput};
pub use types::*;

use crate::audit::AuditSink;
use crate::config::Config;
use crate::permission::Authorizer;
use crate::scope::PropertyKey;
use crate::store::ApprovalStore;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to revisions and file versions.
#[async_trait]
pub trait RevisionSource: Send + Sync {
    /// Look the title up and fill in its page id if it exists.
    async fn resolve(&self, title: &Title) -> Result<Title>;

    /// Text of the page at `revision`, or at its latest revision when `None`.
    async fn page_text(&self, title: &Title, revision: Option<RevisionId>)
        -> Result<Option<String>>;

    /// All revisions of the page, earliest first.
    async fn revisions(&self, title: &Title) -> Result<Vec<RevisionInfo>>;

    /// Every uploaded version of a file, oldest first. Empty for pages.
    async fn file_versions(&self, title: &Title) -> Result<Vec<FileVersion>>;

    /// The latest revision (pages) or latest file version (files).
    async fn latest(&self, title: &Title) -> Result<Option<RevisionPointer>>;
}

/// String-valued content properties attached to a title by its own content.
#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn property(&self, title: &Title, key: PropertyKey) -> Result<Option<String>>;

    async fn set_property(&self, title: &Title, key: PropertyKey, value: Option<&str>)
        -> Result<()>;
}

/// Receives the link/category/property graph of a freshly parsed revision.
#[async_trait]
pub trait LinkIndexer: Send + Sync {
    async fn push(&self, title: &Title, output: &ParseOutput) -> Result<()>;
}

/// Full-text search index. Fire and forget from the approval side.
#[async_trait]
pub trait SearchIndexer: Send + Sync {
    async fn index(&self, title: &Title, text: &str) -> Result<()>;
}

/// External override of the approvability decision.
/// Returning `None` lets the normal classification run.
pub trait ScopeOverride: Send + Sync {
    fn is_approvable(&self, title: &Title) -> Option<bool>;
}

/// A host that provides every storage-side collaborator at once.
pub trait HostWiki: RevisionSource + PropertySource + LinkIndexer + SearchIndexer {}

impl<T> HostWiki for T where T: RevisionSource + PropertySource + LinkIndexer + SearchIndexer {}

/// Everything a processing context needs, wired once per process.
#[derive(Clone)]
pub struct Platform {
    pub config: Arc<Config>,
    pub store: Arc<dyn ApprovalStore>,
    pub revisions: Arc<dyn RevisionSource>,
    pub properties: Arc<dyn PropertySource>,
    pub parser: Arc<dyn ContentParser>,
    pub links: Arc<dyn LinkIndexer>,
    pub search: Arc<dyn SearchIndexer>,
    pub audit: Arc<dyn AuditSink>,
    pub events: Arc<dyn EventBus>,
    pub authorizer: Arc<dyn Authorizer>,
    pub scope_override: Option<Arc<dyn ScopeOverride>>,
}

impl Platform {
    /// Wire a platform from a single host adapter. Parser, event bus and
    /// authorizer get their defaults: [`DirectiveParser`], a fresh
    /// [`BroadcastEvents`], and group permissions from the config.
    pub fn from_host<H>(
        config: Config,
        store: Arc<dyn ApprovalStore>,
        host: Arc<H>,
        audit: Arc<dyn AuditSink>,
    ) -> Self
    where
        H: HostWiki + 'static,
    {
        let authorizer = Arc::new(crate::permission::GroupPermissions::from_config(&config));
        Self {
            config: Arc::new(config),
            store,
            revisions: host.clone(),
            properties: host.clone(),
            parser: Arc::new(DirectiveParser::new()),
            links: host.clone(),
            search: host,
            audit,
            events: Arc::new(BroadcastEvents::default()),
            authorizer,
            scope_override: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_scope_override(mut self, hook: Arc<dyn ScopeOverride>) -> Self {
        self.scope_override = Some(hook);
        self
    }
}
