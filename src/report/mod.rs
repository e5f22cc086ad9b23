//! Corpus-wide approval reports: which titles are approved and current,
//! approved but stale, unapproved, or approved without being in scope.

pub mod classifier;
pub mod query;
pub mod types;

pub use classifier::ReportingClassifier;
pub use types::*;
