pub mod logger;
pub mod reader;
pub mod types;

pub use logger::AuditLogger;
pub use reader::AuditReader;
pub use types::*;

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Where approve/unapprove entries go.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<()>;
}

/// Keeps entries in memory. Used by tests and by hosts that ship audit
/// entries elsewhere themselves.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<LogEntry>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("audit log unavailable");
        }
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry.clone()),
            Err(_) => bail!("audit entry lock poisoned"),
        }
        Ok(())
    }
}
