//! Command implementations for the `approvedrevs` binary.

pub mod approve;
pub mod check;
pub mod init;
pub mod log;
pub mod report;
pub mod status;

use crate::audit::AuditLogger;
use crate::config::{parse_config_file, Config};
use crate::store::sqlite::{connection_pool, run_pending_migrations, Pool};
use crate::store::SqliteApprovalStore;
use crate::wiki::sqlite::SqliteWiki;
use crate::wiki::types::User;
use crate::wiki::Platform;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config file name looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "approvedrevs.yaml";

/// Load the config at `path`. A missing default file means default settings;
/// an explicitly named file must exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
        tracing::debug!("No {} here, using defaults", DEFAULT_CONFIG_FILE);
        return Ok(Config::default());
    }
    parse_config_file(path)
}

/// Everything a command needs: the database, the host adapter and a wired platform.
pub struct Workspace {
    pub pool: Pool,
    pub wiki: Arc<SqliteWiki>,
    pub platform: Platform,
    pub audit_path: PathBuf,
}

impl Workspace {
    pub async fn open(config: Config) -> Result<Self> {
        let pool = connection_pool(&config.database, 4)
            .await
            .with_context(|| format!("Failed to open database {}", config.database))?;
        run_pending_migrations(&pool)
            .await
            .context("Failed to prepare database tables")?;

        let audit_path = config.audit_log_path()?;
        let audit = Arc::new(AuditLogger::with_path(&audit_path)?);
        let wiki = Arc::new(SqliteWiki::new(pool.clone()));
        let store = Arc::new(SqliteApprovalStore::new(pool.clone()));
        let platform = Platform::from_host(config, store, wiki.clone(), audit);

        Ok(Self {
            pool,
            wiki,
            platform,
            audit_path,
        })
    }

    pub async fn load(config_path: &Path) -> Result<Self> {
        Self::open(load_config(config_path)?).await
    }

    pub async fn user(&self, name: &str) -> Result<User> {
        self.wiki
            .find_user(name)
            .await?
            .with_context(|| format!("Unknown user: {}", name))
    }
}
