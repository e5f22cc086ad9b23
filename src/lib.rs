//! approvedrevs: approved revisions for wiki content.
//!
//! Each page or file may have one approved revision that readers see instead
//! of the latest edit. The library decides which titles are under approval,
//! who may approve them, records approvals, and reports on the whole corpus.
//! The binary entrypoint is in `main.rs`.

pub mod approval;
pub mod audit;
pub mod cli;
pub mod config;
pub mod permission;
pub mod report;
pub mod scope;
pub mod store;
pub mod wiki;
