//! The configuration `approvedrevs init` writes.
//!
//! Mirrors [`Config::default`](crate::config::Config): the content
//! namespaces are approvable, nobody owns their own pages, and only
//! administrators (`sysop`) may approve.

pub const DEFAULT_CONFIG_YAML: &str = r#"# approvedrevs configuration
#
# Titles in these namespaces always have an approval regime. Titles elsewhere
# opt in with __APPROVEDREVS__ or {{#approvable_by: users=... | groups=...}}.
namespaces: [Main, User, Project, Template, Help]

# Pages in these namespaces may be approved by whoever created them
# (in User:, by the user the page belongs to).
self_owned_namespaces: []

# Set to true to make every file approvable by namespace.
file_namespace_approvable: false

# Show unapproved pages as blank instead of their latest text.
blank_if_unapproved: false

# A save by someone allowed to approve the page approves it immediately.
automatic_approvals: true

# Offer an "approve latest" hint in the unapproved report.
show_approve_latest: false

group_permissions:
  sysop: [approverevisions]
  "*": [viewlinktolatest]

database: sqlite://approvedrevs.db
"#;
