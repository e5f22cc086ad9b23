//! `approvedrevs status`: the approval state of one title.

use crate::approval::ApprovalContext;
use crate::audit::AuditReader;
use crate::cli::Workspace;
use crate::wiki::types::*;
use anyhow::{bail, Result};
use colored::Colorize;
use similar::TextDiff;
use std::path::Path;

pub async fn run_status(config_path: &Path, title: &str, show_diff: bool) -> Result<()> {
    let ws = Workspace::load(config_path).await?;
    let mut ctx = ApprovalContext::new(&ws.platform);

    let title = ctx.resolve(&Title::parse(title)).await?;
    if !title.exists() {
        bail!("No such page: {}", title);
    }

    let scope = ctx.scope(&title).await?;
    let approved = ctx.approved_revision(&title).await?;
    let approver = match ctx.approver(&title).await? {
        Some(id) => ws.wiki.user_name(id).await?,
        None => None,
    };
    let latest = ws.platform.revisions.latest(&title).await?;

    println!();
    println!("  {}", title.to_string().bold());
    println!("  {}", "━".repeat(40).dimmed());
    let scope_line = if scope.approvable {
        scope.to_string().green()
    } else {
        scope.to_string().dimmed()
    };
    println!("  Scope:    {}", scope_line);

    match &approved {
        Some(pointer) => {
            let by = match &approver {
                Some(name) => format!(" by {}", name),
                None => " automatically".to_string(),
            };
            println!("  Approved: {}{}", pointer.to_string().cyan(), by);
        }
        None if scope.approvable => println!("  Approved: {}", "none".yellow()),
        None => {}
    }
    match &latest {
        Some(pointer) => {
            let marker = if approved.as_ref() == Some(pointer) {
                " (approved)".green().to_string()
            } else {
                String::new()
            };
            println!("  Latest:   {}{}", pointer, marker);
        }
        None => println!("  Latest:   {}", "none".dimmed()),
    }

    let entries = AuditReader::with_path(&ws.audit_path).read_all()?;
    if let Some(entry) = AuditReader::latest_approval(&entries, &title.prefixed_text()) {
        println!("  Last approval logged: {}", AuditReader::format_entry(entry));
    }

    if show_diff {
        print_diff(&ctx, &title, approved.as_ref(), latest.as_ref()).await?;
    }
    println!();
    Ok(())
}

async fn print_diff(
    ctx: &ApprovalContext<'_>,
    title: &Title,
    approved: Option<&RevisionPointer>,
    latest: Option<&RevisionPointer>,
) -> Result<()> {
    let (Some(RevisionPointer::Page(approved)), Some(RevisionPointer::Page(latest))) =
        (approved, latest)
    else {
        println!();
        println!("  {}", "Nothing to compare.".dimmed());
        return Ok(());
    };
    if approved == latest {
        println!();
        println!("  {}", "The approved revision is the latest.".dimmed());
        return Ok(());
    }

    let revisions = &ctx.platform().revisions;
    let old = revisions.page_text(title, Some(*approved)).await?.unwrap_or_default();
    let new = revisions.page_text(title, Some(*latest)).await?.unwrap_or_default();

    let header_before = format!("approved/revision-{}", approved);
    let header_after = format!("latest/revision-{}", latest);
    let patch = TextDiff::from_lines(&old, &new)
        .unified_diff()
        .context_radius(3)
        .header(&header_before, &header_after)
        .to_string();

    println!();
    for line in patch.lines() {
        let styled = if line.starts_with("---") || line.starts_with("+++") {
            line.bold()
        } else if line.starts_with("@@") {
            line.cyan()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else {
            line.normal()
        };
        println!("  {}", styled);
    }
    Ok(())
}
