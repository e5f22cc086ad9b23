//! `approvedrevs report`: list the titles of one report bucket.

use crate::approval::ApprovalContext;
use crate::audit::AuditReader;
use crate::cli::Workspace;
use crate::permission::Capability;
use crate::report::{Bucket, ReportCursor, ReportRow, ReportingClassifier};
use crate::wiki::types::*;
use anyhow::{anyhow, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

pub struct ReportOptions {
    pub files: bool,
    pub bucket: String,
    pub limit: u32,
    pub after: Option<String>,
    /// Viewer; decides whether "approve latest" hints are shown.
    pub user: Option<String>,
}

pub async fn run_report(config_path: &Path, options: ReportOptions) -> Result<()> {
    let bucket = Bucket::from_str_loose(&options.bucket).ok_or_else(|| {
        anyhow!(
            "Unknown bucket '{}'. Available: current, stale, unapproved, invalid",
            options.bucket
        )
    })?;
    let kind = if options.files {
        ContentKind::File
    } else {
        ContentKind::Page
    };

    let ws = Workspace::load(config_path).await?;
    let classifier = ReportingClassifier::new(ws.pool.clone(), ws.platform.config.clone());
    let after = options.after.as_deref().map(ReportCursor::parse);
    let page = classifier.page(kind, bucket, after.as_ref(), options.limit).await?;
    let total = classifier.count(kind, bucket).await?;

    let viewer = match options.user.as_deref() {
        Some(name) => Some(ws.user(name).await?),
        None => None,
    };
    let hint_latest = bucket == Bucket::Unapproved
        && ws.platform.config.show_approve_latest
        && viewer.as_ref().is_some_and(|user| {
            ws.platform
                .authorizer
                .has_capability(user, Capability::ApproveRevisions, None)
        });

    println!();
    println!(
        "  {} {} ({}): {} {}",
        "Report".bold(),
        bucket.to_string().cyan(),
        bucket.description(),
        total,
        if kind == ContentKind::File { "files" } else { "pages" }
    );
    println!();

    if page.rows.is_empty() {
        println!("  {}", "Nothing here.".dimmed());
        println!();
        return Ok(());
    }

    let entries = AuditReader::with_path(&ws.audit_path).read_all()?;
    let mut names: HashMap<UserId, Option<String>> = HashMap::new();
    let mut ctx = ApprovalContext::new(&ws.platform);

    for row in &page.rows {
        let approver = match row.approver {
            Some(id) => {
                if !names.contains_key(&id) {
                    names.insert(id, ws.wiki.user_name(id).await?);
                }
                names.get(&id).cloned().flatten()
            }
            None => None,
        };
        println!("  {}", format_row(row, approver.as_deref()));

        if row.approved.is_some() {
            if let Some(entry) = AuditReader::latest_approval(&entries, &row.title.prefixed_text()) {
                println!("      {}", AuditReader::format_entry(entry));
            }
        }
        if hint_latest {
            if let Some(user) = &viewer {
                if ctx.can_approve(user, &row.title).await? {
                    if let Some(latest) = &row.latest {
                        println!(
                            "      {} approvedrevs approve \"{}\" --user \"{}\"  ({})",
                            "approve latest:".dimmed(),
                            row.title,
                            user.name,
                            latest
                        );
                    }
                }
            }
        }
    }

    if let Some(next) = &page.next {
        println!();
        println!(
            "  {} --after \"{}\"",
            "More rows follow; continue with".dimmed(),
            next
        );
    }
    println!();
    Ok(())
}

fn format_row(row: &ReportRow, approver: Option<&str>) -> String {
    let mut line = row.title.to_string().bold().to_string();
    match (&row.approved, &row.latest) {
        (Some(approved), Some(latest)) if approved != latest => {
            line.push_str(&format!(
                " approved {} {}",
                approved.to_string().cyan(),
                format!("(latest {})", latest).yellow()
            ));
        }
        (Some(approved), _) => {
            line.push_str(&format!(" approved {}", approved.to_string().cyan()));
        }
        (None, Some(latest)) => {
            line.push_str(&format!(" latest {}", latest.to_string().dimmed()));
        }
        (None, None) => {}
    }
    if row.approved.is_some() {
        match approver {
            Some(name) => line.push_str(&format!(" by {}", name)),
            None => line.push_str(&format!(" {}", "automatic".dimmed())),
        }
    }
    line
}
