pub mod classifier;
pub mod directives;
pub mod properties;

pub use classifier::{Provenance, ScopeClassifier, ScopeDecision};
pub use properties::{ApproverLists, PropertyKey};
