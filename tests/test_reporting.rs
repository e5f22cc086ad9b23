//! Report buckets over a small corpus: partitioning, pagination and files.

use approvedrevs::approval::{ApprovalContext, Approver};
use approvedrevs::audit::MemoryAuditSink;
use approvedrevs::config::{parse_config_str, Config};
use approvedrevs::report::{Bucket, ReportCursor, ReportingClassifier};
use approvedrevs::store::sqlite::{connection_pool, run_pending_migrations};
use approvedrevs::store::SqliteApprovalStore;
use approvedrevs::wiki::sqlite::SqliteWiki;
use approvedrevs::wiki::types::*;
use approvedrevs::wiki::Platform;
use futures_util::TryStreamExt;
use std::sync::Arc;

async fn corpus(config: Config) -> (Platform, Arc<SqliteWiki>, ReportingClassifier) {
    let pool = connection_pool("sqlite::memory:", 1).await.unwrap();
    run_pending_migrations(&pool).await.unwrap();
    let wiki = Arc::new(SqliteWiki::new(pool.clone()));
    let store = Arc::new(SqliteApprovalStore::new(pool.clone()));
    let platform = Platform::from_host(config, store, wiki.clone(), Arc::new(MemoryAuditSink::new()));
    let reports = ReportingClassifier::new(pool, platform.config.clone());
    (platform, wiki, reports)
}

#[tokio::test]
async fn test_buckets_partition_approvable_pages() {
    let (platform, wiki, reports) = corpus(Config::default()).await;
    let root = wiki.add_user("Root", &["sysop"]).await.unwrap();

    let current = wiki.add_page(&Title::new(Namespace::MAIN, "Current"), "Root", "a").await.unwrap();
    let stale_title = Title::new(Namespace::MAIN, "Stale");
    let stale = wiki.add_page(&stale_title, "Root", "a").await.unwrap();
    wiki.add_page(&Title::new(Namespace::HELP, "Unreviewed"), "Root", "a").await.unwrap();
    // Neither in an approvable namespace nor marked: in no bucket at all.
    wiki.add_page(&Title::new(Namespace::TALK, "Chatter"), "Root", "a").await.unwrap();

    let mut ctx = ApprovalContext::new(&platform);
    ctx.approve_latest(&current, Approver::User(&root)).await.unwrap();
    ctx.approve_latest(&stale, Approver::User(&root)).await.unwrap();
    wiki.add_revision(&stale_title, "Root", "b").await.unwrap();

    let mut counts = Vec::new();
    for bucket in Bucket::ALL {
        counts.push((bucket, reports.count(ContentKind::Page, bucket).await.unwrap()));
    }
    assert_eq!(
        counts,
        vec![
            (Bucket::Current, 1),
            (Bucket::Stale, 1),
            (Bucket::Unapproved, 1),
            (Bucket::Invalid, 0),
        ]
    );

    let stale_rows = reports
        .page(ContentKind::Page, Bucket::Stale, None, 10)
        .await
        .unwrap()
        .rows;
    assert_eq!(stale_rows.len(), 1);
    assert!(!stale_rows[0].is_latest());
    assert_eq!(stale_rows[0].approved, Some(RevisionPointer::Page(RevisionId(2))));
    assert_eq!(stale_rows[0].latest, Some(RevisionPointer::Page(RevisionId(5))));
}

#[tokio::test]
async fn test_pages_report_excludes_files() {
    let (_platform, wiki, reports) = corpus(parse_config_str("namespaces: [Main, File]\n").unwrap()).await;
    wiki.add_page(&Title::new(Namespace::MAIN, "Guide"), "Root", "a").await.unwrap();
    wiki.upload_file(&Title::new(Namespace::FILE, "Logo.png"), "aaaa", "20240101000000", "Root")
        .await
        .unwrap();

    let pages = reports.page(ContentKind::Page, Bucket::Unapproved, None, 10).await.unwrap();
    assert_eq!(pages.rows.len(), 1);
    assert_eq!(pages.rows[0].title.prefixed_text(), "Guide");

    let files = reports.page(ContentKind::File, Bucket::Unapproved, None, 10).await.unwrap();
    assert_eq!(files.rows.len(), 1);
    assert_eq!(files.rows[0].title.prefixed_text(), "File:Logo.png");
}

#[tokio::test]
async fn test_pagination_walks_every_row_once() {
    let (_platform, wiki, reports) = corpus(Config::default()).await;
    for name in ["Echo", "Alpha", "Delta", "Bravo", "Charlie"] {
        wiki.add_page(&Title::new(Namespace::MAIN, name), "Root", "x").await.unwrap();
    }
    wiki.add_page(&Title::new(Namespace::HELP, "Aardvark"), "Root", "x").await.unwrap();

    let first = reports.page(ContentKind::Page, Bucket::Unapproved, None, 2).await.unwrap();
    let names: Vec<String> = first.rows.iter().map(|r| r.title.prefixed_text()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo"]);
    let next = first.next.clone().unwrap();
    assert_eq!(next.to_string(), "Bravo");

    // Cursors survive a round trip through their printed form.
    let resumed = ReportCursor::parse(&next.to_string());
    let second = reports
        .page(ContentKind::Page, Bucket::Unapproved, Some(&resumed), 2)
        .await
        .unwrap();
    let names: Vec<String> = second.rows.iter().map(|r| r.title.prefixed_text()).collect();
    assert_eq!(names, vec!["Charlie", "Delta"]);

    let all: Vec<String> = reports
        .stream(ContentKind::Page, Bucket::Unapproved, 2)
        .map_ok(|row| row.title.prefixed_text())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(all, vec!["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Help:Aardvark"]);
}

#[tokio::test]
async fn test_marked_page_outside_approvable_namespaces_is_reported() {
    let (_platform, wiki, reports) = corpus(Config::default()).await;
    wiki.add_page(&Title::new(Namespace::TALK, "Plan"), "Root", "__APPROVEDREVS__").await.unwrap();
    wiki.add_page(
        &Title::new(Namespace::CATEGORY, "Policies"),
        "Root",
        "{{#approvable_by: users=Alice}}",
    )
    .await
    .unwrap();
    wiki.add_page(&Title::new(Namespace::TALK, "Other"), "Root", "nothing").await.unwrap();

    let rows = reports.page(ContentKind::Page, Bucket::Unapproved, None, 10).await.unwrap().rows;
    let names: Vec<String> = rows.iter().map(|r| r.title.prefixed_text()).collect();
    assert_eq!(names, vec!["Talk:Plan", "Category:Policies"]);
}

#[tokio::test]
async fn test_file_invalid_bucket_is_empty_when_files_are_approvable_by_namespace() {
    let (platform, wiki, reports) =
        corpus(parse_config_str("file_namespace_approvable: true\n").unwrap()).await;
    let root = wiki.add_user("Root", &["sysop"]).await.unwrap();
    let file = wiki
        .upload_file(&Title::new(Namespace::FILE, "Map.svg"), "cccc", "20240101000000", "Root")
        .await
        .unwrap();

    let mut ctx = ApprovalContext::new(&platform);
    ctx.approve_latest(&file, Approver::User(&root)).await.unwrap();

    assert_eq!(reports.count(ContentKind::File, Bucket::Current).await.unwrap(), 1);
    assert_eq!(reports.count(ContentKind::File, Bucket::Invalid).await.unwrap(), 0);
    assert!(reports
        .page(ContentKind::File, Bucket::Invalid, None, 10)
        .await
        .unwrap()
        .rows
        .is_empty());
}

#[tokio::test]
async fn test_file_loses_its_approvers() {
    let (platform, wiki, reports) = corpus(Config::default()).await;
    let root = wiki.add_user("Root", &["sysop"]).await.unwrap();
    let title = Title::new(Namespace::FILE, "Chart.png");
    wiki.upload_file(&title, "dddd", "20240101000000", "Root").await.unwrap();
    let file = wiki
        .add_page(&title, "Root", "{{#approvable_by: groups=sysop}}")
        .await
        .unwrap();

    let mut ctx = ApprovalContext::new(&platform);
    ctx.approve_latest(&file, Approver::User(&root)).await.unwrap();
    assert_eq!(reports.count(ContentKind::File, Bucket::Current).await.unwrap(), 1);

    wiki.add_revision(&title, "Root", "no longer reviewed").await.unwrap();
    let rows = reports.page(ContentKind::File, Bucket::Invalid, None, 10).await.unwrap().rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].approver, Some(root.id));
}
