//! Proposal-number synchronization for `permits.json` documents.
//!
//! Normalizes proposal tokens in permit notes to `Proposal DDDD-DD-DDDD` and
//! propagates one canonical number to every permit sharing a base id.

pub mod config;
pub mod logging;
pub mod model;
pub mod paths;
pub mod proposal;
pub mod repo;
pub mod revision;
pub mod service;

pub use config::SyncConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::permit::{base_id, CollectionShape, PermitCollection};
pub use model::proposal::{ProposalNumber, ProposalNumberError};
pub use paths::{discover_targets, is_backup_path};
pub use proposal::canonical::{select_canonical, AmbiguousChanged, CanonicalChoice, CanonicalReason};
pub use proposal::text::{canonicalize_text, normalize_prefixes, rewrite_note};
pub use repo::permit_file::{load_permits_file, LoadedPermits, PermitFileError};
pub use revision::{GitRevisionSource, RevisionError, RevisionResult, RevisionSource};
pub use service::report::{FileSummary, RunSummary, SelectionSummary};
pub use service::sync_service::{
    AppliedUpdate, ChangePolicy, FileOutcome, FileReport, GroupSelection, NoOpReason,
    ProposalSyncService, RunReport, SkipReason, SyncError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
