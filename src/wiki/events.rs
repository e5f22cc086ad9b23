//! Approval events published to whoever listens.
//!
//! Listeners are not part of the approval contract: publishing never fails
//! and never waits.

use crate::wiki::types::{RevisionPointer, Title};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalEvent {
    Approved {
        title: Title,
        pointer: RevisionPointer,
    },
    Unapproved {
        title: Title,
    },
}

impl ApprovalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ApprovalEvent::Approved { .. } => "approved",
            ApprovalEvent::Unapproved { .. } => "unapproved",
        }
    }

    pub fn title(&self) -> &Title {
        match self {
            ApprovalEvent::Approved { title, .. } | ApprovalEvent::Unapproved { title } => title,
        }
    }
}

pub trait EventBus: Send + Sync {
    fn publish(&self, event: ApprovalEvent);
}

/// Event bus over a tokio broadcast channel.
pub struct BroadcastEvents {
    sender: broadcast::Sender<ApprovalEvent>,
}

impl BroadcastEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus for BroadcastEvents {
    fn publish(&self, event: ApprovalEvent) {
        let name = event.name();
        // An error only means nobody is subscribed.
        if self.sender.send(event).is_err() {
            tracing::debug!("No listeners for '{}' event", name);
        }
    }
}
