//! The authorization substrate: capabilities and group membership.

use crate::config::Config;
use crate::wiki::types::{Title, User};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Capabilities the approval subsystem asks the host about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Approve or unapprove any approvable title.
    ApproveRevisions,
    /// See a link to the latest revision when it differs from the approved one.
    ViewLinkToLatest,
}

impl Capability {
    pub fn from_str_loose(s: &str) -> Option<Capability> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "approverevisions" | "approve" => Some(Capability::ApproveRevisions),
            "viewlinktolatest" => Some(Capability::ViewLinkToLatest),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ApproveRevisions => write!(f, "approverevisions"),
            Capability::ViewLinkToLatest => write!(f, "viewlinktolatest"),
        }
    }
}

/// Host permission checks. `title` is given when the check is about a
/// specific title, so hosts with per-title restrictions can honor them.
pub trait Authorizer: Send + Sync {
    fn has_capability(&self, user: &User, capability: Capability, title: Option<&Title>) -> bool;

    /// The groups the user belongs to.
    fn groups(&self, user: &User) -> Vec<String> {
        user.groups.clone()
    }
}

/// Capabilities granted per group, with the implicit `*` (everyone) and
/// `user` (registered accounts) groups.
#[derive(Debug, Clone, Default)]
pub struct GroupPermissions {
    grants: BTreeMap<String, BTreeSet<Capability>>,
}

impl GroupPermissions {
    pub fn new(grants: BTreeMap<String, BTreeSet<Capability>>) -> Self {
        let grants = grants
            .into_iter()
            .map(|(group, caps)| (group.trim().to_lowercase(), caps))
            .collect();
        Self { grants }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.group_permissions.clone())
    }

    fn effective_groups(&self, user: &User) -> Vec<String> {
        let mut groups = vec!["*".to_string()];
        if user.is_registered() {
            groups.push("user".to_string());
        }
        groups.extend(user.groups.iter().map(|g| g.trim().to_lowercase()));
        groups
    }
}

impl Authorizer for GroupPermissions {
    fn has_capability(&self, user: &User, capability: Capability, _title: Option<&Title>) -> bool {
        self.effective_groups(user).iter().any(|group| {
            self.grants
                .get(group)
                .map_or(false, |caps| caps.contains(&capability))
        })
    }
}
