//! `approvedrevs approve`, `unapprove` and `can-approve`.

use crate::approval::{ApprovalContext, Approver};
use crate::cli::Workspace;
use crate::wiki::types::*;
use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;

pub async fn run_approve(
    config_path: &Path,
    title: &str,
    user: &str,
    revision: Option<i64>,
) -> Result<()> {
    let ws = Workspace::load(config_path).await?;
    let user = ws.user(user).await?;
    let mut ctx = ApprovalContext::new(&ws.platform);
    let title = ctx.resolve(&Title::parse(title)).await?;

    let pointer = match (revision, title.content_kind()) {
        (Some(id), ContentKind::Page) => {
            let pointer = RevisionPointer::Page(RevisionId(id));
            ctx.approve(&title, pointer.clone(), Approver::User(&user)).await?;
            pointer
        }
        (Some(_), ContentKind::File) => {
            bail!("--rev only applies to pages; {} approves its latest file version", title)
        }
        (None, _) => ctx.approve_latest(&title, Approver::User(&user)).await?,
    };

    let report = ctx.run_deferred().await;
    println!();
    println!(
        "  {} Approved {} of {}",
        "✓".green().bold(),
        pointer.to_string().cyan(),
        title.to_string().bold()
    );
    if report.failed > 0 {
        println!(
            "  {} {} of {} re-index updates failed; approving again will retry them.",
            "⚠".yellow(),
            report.failed,
            report.ran
        );
    }
    println!();
    Ok(())
}

pub async fn run_unapprove(config_path: &Path, title: &str, user: &str) -> Result<()> {
    let ws = Workspace::load(config_path).await?;
    let user = ws.user(user).await?;
    let mut ctx = ApprovalContext::new(&ws.platform);
    let title = Title::parse(title);

    let existed = ctx.unapprove(&title, Approver::User(&user)).await?;
    ctx.run_deferred().await;

    println!();
    if existed {
        println!("  {} Unapproved {}", "✓".green().bold(), title.to_string().bold());
    } else {
        println!(
            "  {} {} had no approved revision",
            "ℹ".blue(),
            title.to_string().bold()
        );
    }
    println!();
    Ok(())
}

pub async fn run_can_approve(config_path: &Path, title: &str, user: &str) -> Result<()> {
    let ws = Workspace::load(config_path).await?;
    let user = ws.user(user).await?;
    let mut ctx = ApprovalContext::new(&ws.platform);
    let title = Title::parse(title);

    println!();
    match ctx.approval_grant(&user, &title).await? {
        Some(grant) => println!(
            "  {} {} can approve {}: {}",
            "✓".green().bold(),
            user.name.bold(),
            title.to_string().bold(),
            grant
        ),
        None => println!(
            "  {} {} cannot approve this title",
            "✗".red().bold(),
            user.name.bold()
        ),
    }
    println!();
    Ok(())
}
