//! `approvedrevs check`: validate a config file and show what it means.

use crate::config::parse_config_file;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run_check(config_path: &Path) -> Result<()> {
    let config = parse_config_file(config_path)?;

    println!();
    println!("  {} Config is valid!", "✓".green().bold());
    println!("  {}", config.describe());
    println!();
    println!("  Blank if unapproved:  {}", yes_no(config.blank_if_unapproved));
    println!("  Automatic approvals:  {}", yes_no(config.automatic_approvals));
    println!("  Show approve latest:  {}", yes_no(config.show_approve_latest));
    println!("  Database:             {}", config.database.dimmed());
    if let Ok(path) = config.audit_log_path() {
        println!("  Audit log:            {}", path.display().to_string().dimmed());
    }

    if !config.group_permissions.is_empty() {
        println!();
        println!("  Group permissions:");
        for (group, capabilities) in &config.group_permissions {
            let caps: Vec<String> = capabilities.iter().map(|c| c.to_string()).collect();
            println!("    {} {}", format!("{:<12}", group).bold(), caps.join(", "));
        }
    }
    println!();
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag {
        "yes".green().to_string()
    } else {
        "no".dimmed().to_string()
    }
}
