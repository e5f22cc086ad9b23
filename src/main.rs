//! approvedrevs: approved revisions for wiki content.
//!
//! Quick start:
//!   approvedrevs init                               # write approvedrevs.yaml
//!   approvedrevs status "Main Page"                 # approved vs latest
//!   approvedrevs approve "Main Page" --user Alice   # approve the latest revision
//!   approvedrevs report --bucket stale              # pages whose approval fell behind
//!
//! For more info: approvedrevs --help

use approvedrevs::cli;
use approvedrevs::report::{Bucket, ReportingClassifier};
use approvedrevs::wiki::types::ContentKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// approvedrevs: keep readers on the approved revision of each page.
#[derive(Parser)]
#[command(
    name = "approvedrevs",
    version,
    about = "Approved revisions for wiki content",
    long_about = "Tracks which revision of each wiki page (or which version of each\n\
                  file) is approved, who may approve it, and which titles still need review.\n\n\
                  Quick start:\n  \
                  approvedrevs                      # overview of every report bucket\n  \
                  approvedrevs approve <TITLE> -u <USER>\n  \
                  approvedrevs report               # what still needs review"
)]
struct Cli {
    /// Path to the config file
    #[arg(
        short,
        long,
        global = true,
        env = "APPROVEDREVS_CONFIG",
        default_value = cli::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the approval state of a title
    Status {
        /// Prefixed title, e.g. "Help:Editing"
        title: String,

        /// Show what changed between the approved and the latest revision
        #[arg(long)]
        diff: bool,
    },

    /// Approve a revision (the latest one unless --rev is given)
    Approve {
        title: String,

        /// Acting user
        #[arg(short, long)]
        user: String,

        /// Revision id to approve (pages only)
        #[arg(short, long)]
        rev: Option<i64>,
    },

    /// Remove the approval of a title
    Unapprove {
        title: String,

        #[arg(short, long)]
        user: String,
    },

    /// Tell whether a user may approve a title, and why
    CanApprove {
        title: String,

        #[arg(short, long)]
        user: String,
    },

    /// List the titles in one report bucket
    Report {
        /// Bucket: current, stale, unapproved, invalid
        #[arg(short, long, default_value = "unapproved")]
        bucket: String,

        /// Report on files instead of pages
        #[arg(long)]
        files: bool,

        /// Max rows to show
        #[arg(short, long, default_value_t = 50)]
        limit: u32,

        /// Continue after this title (from a previous run)
        #[arg(long)]
        after: Option<String>,

        /// Viewing user; enables "approve latest" hints
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Browse the approval log
    Log {
        /// Only entries for this title
        #[arg(short, long)]
        title: Option<String>,

        /// Filter: approve, unapprove
        #[arg(short, long)]
        action: Option<String>,

        /// Max entries to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show only the summary
        #[arg(long)]
        summary: bool,
    },

    /// Validate a config file (the --config one by default)
    Check {
        /// Config file to validate
        file: Option<PathBuf>,
    },

    /// Write a starter config file
    Init {
        #[arg(short, long)]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Quiet unless RUST_LOG asks for more
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("approvedrevs=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let args = Cli::parse();
    let config = args.config.as_path();

    let result = match args.command {
        None => show_overview(config).await,

        Some(Commands::Status { title, diff }) => cli::status::run_status(config, &title, diff).await,

        Some(Commands::Approve { title, user, rev }) => {
            cli::approve::run_approve(config, &title, &user, rev).await
        }

        Some(Commands::Unapprove { title, user }) => {
            cli::approve::run_unapprove(config, &title, &user).await
        }

        Some(Commands::CanApprove { title, user }) => {
            cli::approve::run_can_approve(config, &title, &user).await
        }

        Some(Commands::Report {
            bucket,
            files,
            limit,
            after,
            user,
        }) => {
            let options = cli::report::ReportOptions {
                files,
                bucket,
                limit,
                after,
                user,
            };
            cli::report::run_report(config, options).await
        }

        Some(Commands::Log {
            title,
            action,
            limit,
            summary,
        }) => cli::log::run_log(config, title.as_deref(), action.as_deref(), limit, summary),

        Some(Commands::Check { file }) => cli::check::run_check(file.as_deref().unwrap_or(config)),

        Some(Commands::Init { output, force }) => cli::init::run_init(output.as_deref(), force),
    };

    if let Err(e) = result {
        eprintln!();
        eprintln!("  {} {}", "✗".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        eprintln!();
        std::process::exit(1);
    }
}

/// `approvedrevs` with no subcommand: bucket counts for pages and files.
async fn show_overview(config_path: &Path) -> anyhow::Result<()> {
    let ws = cli::Workspace::load(config_path).await?;
    let classifier = ReportingClassifier::new(ws.pool.clone(), ws.platform.config.clone());

    println!();
    println!("  {}", "approvedrevs".bold());
    println!("  {}", "━".repeat(40).dimmed());
    println!("  {}", ws.platform.config.describe());
    println!();

    for kind in [ContentKind::Page, ContentKind::File] {
        let mut counts = Vec::with_capacity(Bucket::ALL.len());
        for bucket in Bucket::ALL {
            counts.push(format!("{} {}", classifier.count(kind, bucket).await?, bucket));
        }
        println!("  {:<6} {}", format!("{}s", kind), counts.join(" | "));
    }

    println!();
    println!("  {}", "Commands:".dimmed());
    println!("    {}     what still needs review", "approvedrevs report".bold());
    println!("    {}     approved vs latest for one title", "approvedrevs status".bold());
    println!("    {}        recent approvals", "approvedrevs log".bold());
    println!();
    Ok(())
}
