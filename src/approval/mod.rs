//! Approval state for one processing context: lookups, permission checks and
//! the approve/unapprove pipeline.

pub mod context;
pub mod deferred;
pub mod mutator;
pub mod view;

pub use context::ApprovalContext;
pub use deferred::{DeferredReport, DeferredUpdate};
pub use mutator::Approver;
pub use view::{ViewOutcome, ViewRequest};

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    /// Covers both "not in scope" and "not allowed"; callers can't tell them apart.
    #[error("cannot approve this title: {title}")]
    CannotApprove { title: String },

    #[error("{pointer} does not belong to {title}")]
    UnknownRevision { title: String, pointer: String },

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error("lookup failed before the approval was recorded: {0:#}")]
    Lookup(#[from] anyhow::Error),
}
