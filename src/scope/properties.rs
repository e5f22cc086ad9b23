//! Typed content properties that put a title in scope and name its approvers.
//!
//! The host stores page properties as string keys with string values. Only
//! three keys matter here, so they are an enum, and the approver lists have
//! one set of parse rules:
//!
//! - entries are separated by `,`;
//! - each entry is trimmed; empty entries are dropped;
//! - entries containing characters that can never appear in a user or group
//!   name (`|#<>[]{}`) are malformed and skipped;
//! - user names are normalized like host user names (spaces, upper-cased
//!   first letter); group names are lower-cased.

use crate::wiki::types::normalize_user_name;
use std::collections::BTreeSet;
use std::fmt;

/// The affirmative value of the opt-in marker property.
pub const MARKER_AFFIRMATIVE: &str = "y";

const LIST_DELIMITER: char = ',';
const INVALID_NAME_CHARS: &[char] = &['|', '#', '<', '>', '[', ']', '{', '}'];

/// Content property keys recognized by the approval subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    /// Set by the `__APPROVEDREVS__` magic word.
    Marker,
    /// Comma-separated user names allowed to approve this title.
    ApproverUsers,
    /// Comma-separated group names allowed to approve this title.
    ApproverGroups,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 3] = [
        PropertyKey::Marker,
        PropertyKey::ApproverUsers,
        PropertyKey::ApproverGroups,
    ];

    /// Property name as stored by the host.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::Marker => "approvedrevs",
            PropertyKey::ApproverUsers => "approvedrevs-approver-users",
            PropertyKey::ApproverGroups => "approvedrevs-approver-groups",
        }
    }

    pub fn from_name(name: &str) -> Option<PropertyKey> {
        PropertyKey::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed approver lists of one title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApproverLists {
    pub users: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}

impl ApproverLists {
    pub fn parse(users: Option<&str>, groups: Option<&str>) -> Self {
        Self {
            users: users
                .map(|v| parse_list(v, normalize_user_name))
                .unwrap_or_default(),
            groups: groups
                .map(|v| parse_list(v, normalize_group_name))
                .unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    pub fn names_user(&self, user_name: &str) -> bool {
        self.users.contains(&normalize_user_name(user_name))
    }

    /// Returns the first of `groups` that is listed, if any.
    pub fn first_listed_group<'g>(&self, groups: &'g [String]) -> Option<&'g str> {
        groups
            .iter()
            .find(|g| self.groups.contains(&normalize_group_name(g)))
            .map(|g| g.as_str())
    }
}

pub fn normalize_group_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn parse_list(value: &str, normalize: fn(&str) -> String) -> BTreeSet<String> {
    value
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| !entry.contains(INVALID_NAME_CHARS))
        .map(normalize)
        .collect()
}

/// Join names back into the stored list form.
pub fn join_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
