//! Post-response work: re-indexing links and search after an approval change.
//!
//! The record write has already happened when these run. A failure is
//! logged and counted and nothing is retried or rolled back; running the
//! approval again rebuilds the same derived state.

use crate::approval::ApprovalContext;
use crate::wiki::parser::ParseOutput;
use crate::wiki::types::Title;
use std::collections::VecDeque;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredUpdate {
    /// Replace the title's link/category/property graph.
    Links { title: Title, output: ParseOutput },
    /// Replace the title's search text.
    Search { title: Title, text: String },
}

impl DeferredUpdate {
    pub fn title(&self) -> &Title {
        match self {
            DeferredUpdate::Links { title, .. } | DeferredUpdate::Search { title, .. } => title,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeferredUpdates {
    queue: VecDeque<DeferredUpdate>,
}

impl DeferredUpdates {
    pub(crate) fn push(&mut self, update: DeferredUpdate) {
        self.queue.push_back(update);
    }

    fn drain(&mut self) -> Vec<DeferredUpdate> {
        self.queue.drain(..).collect()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// What a deferred run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredReport {
    pub ran: usize,
    pub failed: usize,
}

impl<'a> ApprovalContext<'a> {
    /// Updates queued and not yet run.
    pub fn pending_updates(&self) -> usize {
        self.deferred.len()
    }

    /// Run every queued update, in queue order.
    pub async fn run_deferred(&mut self) -> DeferredReport {
        let mut report = DeferredReport::default();
        let platform = self.platform;

        for update in self.deferred.drain() {
            let result = match &update {
                DeferredUpdate::Links { title, output } => platform.links.push(title, output).await,
                DeferredUpdate::Search { title, text } => platform.search.index(title, text).await,
            };
            report.ran += 1;
            match result {
                Ok(()) => debug!("[{}] Re-indexed {}", self.id(), update.title()),
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "[{}] Deferred update for {} failed: {:#}",
                        self.id(),
                        update.title(),
                        e
                    );
                }
            }
        }
        report
    }
}
