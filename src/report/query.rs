//! SQL for the report buckets.
//!
//! With `A` = "has an approval record" and `S` = "in scope":
//!
//! | bucket     | condition                      |
//! |------------|--------------------------------|
//! | current    | A and S and approved = latest  |
//! | stale      | A and S and approved != latest |
//! | unapproved | not A and S                    |
//! | invalid    | A and not S                    |
//!
//! `S` is the static namespace list or a scope property on the page. The
//! override hook is code, not data, so it can't take part here.

use crate::config::Config;
use crate::report::types::Bucket;
use crate::scope::properties::MARKER_AFFIRMATIVE;
use crate::scope::PropertyKey;
use crate::wiki::types::{ContentKind, Namespace};

/// Scope predicate over the page alias `p`.
pub fn scope_predicate(config: &Config) -> String {
    let property_scope = format!(
        "EXISTS (SELECT 1 FROM page_props pp WHERE pp.pp_page = p.page_id AND \
         ((pp.pp_propname = '{marker}' AND pp.pp_value = '{yes}') \
         OR pp.pp_propname IN ('{users}', '{groups}')))",
        marker = PropertyKey::Marker.as_str(),
        yes = MARKER_AFFIRMATIVE,
        users = PropertyKey::ApproverUsers.as_str(),
        groups = PropertyKey::ApproverGroups.as_str(),
    );

    if config.namespaces.is_empty() {
        return format!("({})", property_scope);
    }
    let namespaces: Vec<String> = config.namespaces.iter().map(|ns| ns.0.to_string()).collect();
    format!(
        "(p.page_namespace IN ({}) OR {})",
        namespaces.join(", "),
        property_scope
    )
}

fn bucket_condition(config: &Config, kind: ContentKind, bucket: Bucket) -> String {
    let scope = scope_predicate(config);
    let (approved, same) = match kind {
        ContentKind::Page => ("ar.page_id IS NOT NULL", "ar.rev_id = p.page_latest"),
        ContentKind::File => (
            "ar.file_title IS NOT NULL",
            "(ar.approved_sha1 = img.img_sha1 AND ar.approved_timestamp = img.img_timestamp)",
        ),
    };

    match bucket {
        Bucket::Current => format!("{} AND {} AND {}", approved, scope, same),
        Bucket::Stale => format!("{} AND {} AND NOT {}", approved, scope, same),
        Bucket::Unapproved => format!("NOT ({}) AND {}", approved, scope),
        // Every file is in scope, so nothing can be out of it.
        Bucket::Invalid if kind == ContentKind::File && config.files_statically_approvable() => {
            "0".to_string()
        }
        Bucket::Invalid => format!("{} AND NOT {}", approved, scope),
    }
}

/// Select clause and joins per kind. Columns: `ns`, `title`, `page_id`,
/// `approver_id`, then the pointer columns of the kind.
fn from_clause(kind: ContentKind) -> String {
    match kind {
        ContentKind::Page => format!(
            "SELECT p.page_namespace AS ns, p.page_title AS title, p.page_id AS page_id, \
             ar.approver_id AS approver_id, p.page_latest AS latest_rev, ar.rev_id AS approved_rev \
             FROM page p \
             LEFT JOIN approved_revs ar ON ar.page_id = p.page_id \
             WHERE p.page_namespace <> {file}",
            file = Namespace::FILE.0
        ),
        ContentKind::File => format!(
            "SELECT p.page_namespace AS ns, p.page_title AS title, p.page_id AS page_id, \
             ar.approver_id AS approver_id, \
             img.img_sha1 AS latest_sha1, img.img_timestamp AS latest_timestamp, \
             ar.approved_sha1 AS approved_sha1, ar.approved_timestamp AS approved_timestamp \
             FROM page p \
             JOIN image img ON img.img_name = p.page_title \
             LEFT JOIN approved_revs_files ar ON ar.file_title = p.page_title \
             WHERE p.page_namespace = {file}",
            file = Namespace::FILE.0
        ),
    }
}

/// A page of one bucket. Binds, in order: with a cursor, namespace,
/// namespace, title; then the limit.
pub fn bucket_query(config: &Config, kind: ContentKind, bucket: Bucket, after: bool) -> String {
    let mut sql = format!(
        "{} AND {}",
        from_clause(kind),
        bucket_condition(config, kind, bucket)
    );
    if after {
        sql.push_str(" AND (p.page_namespace > ? OR (p.page_namespace = ? AND p.page_title > ?))");
    }
    sql.push_str(" ORDER BY p.page_namespace, p.page_title LIMIT ?");
    sql
}

/// Row count of one bucket.
pub fn count_query(config: &Config, kind: ContentKind, bucket: Bucket) -> String {
    format!(
        "SELECT COUNT(*) FROM ({} AND {})",
        from_clause(kind),
        bucket_condition(config, kind, bucket)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_scope_predicate_lists_namespaces() {
        let sql = scope_predicate(&Config::default());
        assert!(sql.starts_with("(p.page_namespace IN (0, 2, 4, 10, 12) OR EXISTS"));
        assert!(sql.contains("'approvedrevs-approver-groups'"));
    }

    #[test]
    fn test_scope_predicate_without_namespaces() {
        let config = Config {
            namespaces: BTreeSet::new(),
            ..Config::default()
        };
        assert!(!scope_predicate(&config).contains("IN (0"));
    }

    #[test]
    fn test_file_invalid_is_empty_when_files_static() {
        let mut config = Config::default();
        config.namespaces.insert(Namespace::FILE);
        let sql = bucket_query(&config, ContentKind::File, Bucket::Invalid, false);
        assert!(sql.contains("AND 0 ORDER BY"));

        let sql = bucket_query(&Config::default(), ContentKind::File, Bucket::Invalid, false);
        assert!(sql.contains("AND NOT (p.page_namespace IN"));
    }

    #[test]
    fn test_cursor_clause_only_when_asked() {
        let config = Config::default();
        assert!(!bucket_query(&config, ContentKind::Page, Bucket::Stale, false).contains("page_title > ?"));
        assert!(bucket_query(&config, ContentKind::Page, Bucket::Stale, true).contains("page_title > ?"));
    }
}
