//! `approvedrevs log`: browse the approval audit log.

use crate::audit::{AuditAction, AuditReader, LogFilter};
use crate::cli::load_config;
use crate::wiki::types::Title;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn run_log(
    config_path: &Path,
    title: Option<&str>,
    action: Option<&str>,
    limit: Option<usize>,
    summary_only: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let log_path = config.audit_log_path()?;
    let entries = AuditReader::with_path(&log_path)
        .read_all()
        .context("Failed to read the audit log")?;

    if entries.is_empty() {
        println!();
        println!("  {} No approvals logged yet.", "ℹ".blue());
        println!("  Approve a page first:");
        println!("    {}", "approvedrevs approve <TITLE> --user <NAME>".dimmed());
        println!();
        return Ok(());
    }

    let filter = LogFilter {
        title: title.map(|t| Title::parse(t).prefixed_text()),
        action: action.and_then(AuditAction::from_str_loose),
        limit,
    };
    let filtered = AuditReader::filter_entries(&entries, &filter);
    let summary = AuditReader::summarize(&filtered);

    println!();
    if summary_only {
        println!(
            "  {} total | {} approvals ({} automatic) | {} unapprovals | {} titles",
            summary.total.to_string().bold(),
            summary.approvals.to_string().green().bold(),
            summary.automatic,
            summary.unapprovals.to_string().yellow().bold(),
            summary.titles
        );
        if let (Some(start), Some(end)) = (summary.start_time, summary.end_time) {
            println!(
                "  From {} to {}",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M")
            );
        }
    } else {
        for entry in &filtered {
            println!("  {}", AuditReader::format_entry(entry));
        }
        println!();
        println!("  {} {}", "─".repeat(40).dimmed(), summary.one_line().dimmed());
    }
    println!();
    Ok(())
}
