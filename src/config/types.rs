//! Configuration of the approval regime.

use crate::permission::Capability;
use crate::wiki::types::Namespace;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Where the SQLite database lives when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "sqlite://approvedrevs.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Namespaces whose every existing title is approvable.
    pub namespaces: BTreeSet<Namespace>,

    /// Namespaces where the creator of a page (or, in the user namespace,
    /// the user the page belongs to) may approve it without any grant.
    pub self_owned_namespaces: BTreeSet<Namespace>,

    /// Unapproved pages show (and index) as blank instead of their latest text.
    pub blank_if_unapproved: bool,

    /// A save by someone who may approve the page approves the new revision.
    pub automatic_approvals: bool,

    /// Offer "approve latest" next to entries of the unapproved report.
    pub show_approve_latest: bool,

    /// Capabilities granted per user group. `*` applies to everyone,
    /// `user` to every registered account.
    pub group_permissions: BTreeMap<String, BTreeSet<Capability>>,

    /// SQLite URL of the approval records and host corpus.
    pub database: String,

    /// JSONL audit log location; `None` means the default under the home directory.
    pub audit_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut group_permissions = BTreeMap::new();
        group_permissions.insert(
            "sysop".to_string(),
            BTreeSet::from([Capability::ApproveRevisions]),
        );
        group_permissions.insert(
            "*".to_string(),
            BTreeSet::from([Capability::ViewLinkToLatest]),
        );

        Self {
            namespaces: BTreeSet::from([
                Namespace::MAIN,
                Namespace::USER,
                Namespace::PROJECT,
                Namespace::TEMPLATE,
                Namespace::HELP,
            ]),
            self_owned_namespaces: BTreeSet::new(),
            blank_if_unapproved: false,
            automatic_approvals: true,
            show_approve_latest: false,
            group_permissions,
            database: DEFAULT_DATABASE.to_string(),
            audit_log: None,
        }
    }
}

impl Config {
    pub fn is_approvable_namespace(&self, namespace: Namespace) -> bool {
        self.namespaces.contains(&namespace)
    }

    pub fn is_self_owned_namespace(&self, namespace: Namespace) -> bool {
        self.self_owned_namespaces.contains(&namespace)
    }

    /// True when every file is in scope by namespace alone.
    pub fn files_statically_approvable(&self) -> bool {
        self.is_approvable_namespace(Namespace::FILE)
    }

    /// Resolved audit log path.
    pub fn audit_log_path(&self) -> Result<PathBuf> {
        match &self.audit_log {
            Some(path) => Ok(path.clone()),
            None => crate::audit::AuditLogger::default_path(),
        }
    }

    /// One-line description used by `approvedrevs check` and `status`.
    pub fn describe(&self) -> String {
        let names = |set: &BTreeSet<Namespace>| {
            if set.is_empty() {
                "none".to_string()
            } else {
                set.iter().map(|ns| ns.to_string()).collect::<Vec<_>>().join(", ")
            }
        };
        format!(
            "approvable: {} | self-owned: {}",
            names(&self.namespaces),
            names(&self.self_owned_namespaces)
        )
    }
}
