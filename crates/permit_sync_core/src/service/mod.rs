//! Proposal synchronization use-cases.
//!
//! # Responsibility
//! - Run the per-file pipeline: skip checks, load, change detection,
//!   grouping, canonical selection, rewrite, persist.
//! - Summarize a multi-file run for console and JSON output.
//!
//! # Invariants
//! - A fatal error for one file leaves that file untouched on disk.
//! - Files are processed one after another with no shared state.

pub mod report;
pub mod sync_service;
