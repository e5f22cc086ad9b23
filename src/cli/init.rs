//! `approvedrevs init`: write a starter configuration.

use crate::cli::DEFAULT_CONFIG_FILE;
use crate::config::defaults::DEFAULT_CONFIG_YAML;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

pub fn run_init(output_path: Option<&str>, force: bool) -> Result<()> {
    let output_file = match output_path {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir()
            .context("Failed to get current directory")?
            .join(DEFAULT_CONFIG_FILE),
    };

    if output_file.exists() && !force {
        println!(
            "  {} A config file already exists at {}",
            "⚠".yellow(),
            output_file.display()
        );
        println!("  Use --force to overwrite it, or edit it directly.");
        return Ok(());
    }

    std::fs::write(&output_file, DEFAULT_CONFIG_YAML)
        .with_context(|| format!("Failed to write {}", output_file.display()))?;

    println!();
    println!(
        "  {} Created {}",
        "✓".green().bold(),
        output_file.display().to_string().cyan()
    );
    println!();
    println!("  Next steps:");
    println!("    1. Review the approvable namespaces and group permissions");
    println!("    2. Point {} at your wiki database", "database:".bold());
    println!("    3. Run {}", "approvedrevs check".bold());
    println!();
    Ok(())
}
