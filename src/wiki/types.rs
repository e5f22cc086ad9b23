//! Core types shared by every layer: namespaces, titles, revisions, users.
//!
//! A [`Title`] is the unit everything is decided for. Its identity is the
//! `(namespace, db_key)` pair; the page id is only known once the host has
//! resolved the title, and a title without one does not exist.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wiki namespace number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(pub i32);

impl Namespace {
    pub const MAIN: Namespace = Namespace(0);
    pub const TALK: Namespace = Namespace(1);
    pub const USER: Namespace = Namespace(2);
    pub const USER_TALK: Namespace = Namespace(3);
    pub const PROJECT: Namespace = Namespace(4);
    pub const FILE: Namespace = Namespace(6);
    pub const MEDIAWIKI: Namespace = Namespace(8);
    pub const TEMPLATE: Namespace = Namespace(10);
    pub const HELP: Namespace = Namespace(12);
    pub const CATEGORY: Namespace = Namespace(14);

    const NAMED: [(Namespace, &'static str); 10] = [
        (Namespace::MAIN, "Main"),
        (Namespace::TALK, "Talk"),
        (Namespace::USER, "User"),
        (Namespace::USER_TALK, "User talk"),
        (Namespace::PROJECT, "Project"),
        (Namespace::FILE, "File"),
        (Namespace::MEDIAWIKI, "MediaWiki"),
        (Namespace::TEMPLATE, "Template"),
        (Namespace::HELP, "Help"),
        (Namespace::CATEGORY, "Category"),
    ];

    /// Parse a namespace from a config value or title prefix.
    /// Accepts canonical names in any case, underscores for spaces, and numbers.
    pub fn from_str_loose(s: &str) -> Option<Namespace> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i32>() {
            return Some(Namespace(n));
        }
        let wanted = s.replace('_', " ").to_lowercase();
        if wanted == "main" || wanted == "(main)" || wanted.is_empty() {
            return Some(Namespace::MAIN);
        }
        if wanted == "image" {
            return Some(Namespace::FILE);
        }
        Self::NAMED
            .iter()
            .find(|(_, name)| name.to_lowercase() == wanted)
            .map(|(ns, _)| *ns)
    }

    /// Canonical name, or `None` for namespaces this crate has no name for.
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(ns, _)| ns == self)
            .map(|(_, name)| *name)
    }

    /// The title prefix for this namespace ("" for the main namespace).
    fn prefix(&self) -> String {
        match self.name() {
            Some("Main") => String::new(),
            Some(name) => format!("{}:", name),
            None => format!("{}:", self.0),
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        if *self == Namespace::FILE {
            ContentKind::File
        } else {
            ContentKind::Page
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Whether a title's approvable content is wikitext revisions or file versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    File,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Page => write!(f, "page"),
            ContentKind::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub i64);

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user account id. The approval subsystem only ever holds this weak
/// reference; `0` is the anonymous user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub const ANONYMOUS: UserId = UserId(0);
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hashable identity of a title, used as the key of every per-context cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TitleKey {
    pub namespace: Namespace,
    pub db_key: String,
}

/// A page or file title, optionally resolved against the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub namespace: Namespace,
    /// Title text in storage form: underscores for spaces, first letter upper-cased.
    pub db_key: String,
    /// Set once the host has resolved the title; `None` means it does not exist.
    pub page_id: Option<PageId>,
}

impl Title {
    /// Build an unresolved title from a namespace and title text.
    pub fn new(namespace: Namespace, text: &str) -> Self {
        Self {
            namespace,
            db_key: to_db_key(text),
            page_id: None,
        }
    }

    /// Parse a prefixed title like `File:Some picture.png` or `Main Page`.
    /// Unknown prefixes are treated as part of a main-namespace title.
    pub fn parse(prefixed: &str) -> Self {
        let prefixed = prefixed.trim();
        if let Some((prefix, rest)) = prefixed.split_once(':') {
            if let Some(ns) = Namespace::from_str_loose(prefix) {
                if !prefix.trim().is_empty() && prefix.parse::<i32>().is_err() {
                    return Title::new(ns, rest);
                }
            }
        }
        Title::new(Namespace::MAIN, prefixed)
    }

    pub fn with_page_id(mut self, page_id: PageId) -> Self {
        self.page_id = Some(page_id);
        self
    }

    pub fn exists(&self) -> bool {
        self.page_id.is_some()
    }

    pub fn key(&self) -> TitleKey {
        TitleKey {
            namespace: self.namespace,
            db_key: self.db_key.clone(),
        }
    }

    /// Title text without namespace, with spaces.
    pub fn text(&self) -> String {
        self.db_key.replace('_', " ")
    }

    /// Full display form, e.g. `User:Alice`.
    pub fn prefixed_text(&self) -> String {
        format!("{}{}", self.namespace.prefix(), self.text())
    }

    pub fn content_kind(&self) -> ContentKind {
        self.namespace.content_kind()
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefixed_text())
    }
}

/// Normalize title text to storage form.
pub fn to_db_key(text: &str) -> String {
    let trimmed = text.trim().replace(' ', "_");
    upper_first(&trimmed)
}

/// Normalize a user name the way the host stores it: spaces, not
/// underscores, and an upper-cased first letter.
pub fn normalize_user_name(name: &str) -> String {
    let spaced = name.trim().replace('_', " ");
    upper_first(&spaced)
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One version of an uploaded file: content hash plus upload timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileVersion {
    pub sha1: String,
    /// Upload timestamp in host storage form (`YYYYMMDDHHMMSS`).
    pub timestamp: String,
}

/// What an approval points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPointer {
    Page(RevisionId),
    File(FileVersion),
}

impl RevisionPointer {
    pub fn revision_id(&self) -> Option<RevisionId> {
        match self {
            RevisionPointer::Page(id) => Some(*id),
            RevisionPointer::File(_) => None,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            RevisionPointer::Page(_) => ContentKind::Page,
            RevisionPointer::File(_) => ContentKind::File,
        }
    }
}

impl fmt::Display for RevisionPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionPointer::Page(id) => write!(f, "revision {}", id),
            RevisionPointer::File(v) => {
                let short: String = v.sha1.chars().take(8).collect();
                write!(f, "file {} @ {}", short, v.timestamp)
            }
        }
    }
}

/// Metadata of one page revision, as listed by the revision source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    pub id: RevisionId,
    /// Name of the author as recorded on the revision.
    pub author: String,
    pub timestamp: String,
}

/// An acting user, with the groups the host loaded for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub groups: Vec<String>,
}

impl User {
    pub fn new(id: UserId, name: &str) -> Self {
        Self {
            id,
            name: normalize_user_name(name),
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_registered(&self) -> bool {
        self.id != UserId::ANONYMOUS
    }
}
