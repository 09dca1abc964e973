//! Run configuration passed explicitly into the synchronizer.

use crate::model::permit::DEFAULT_NOTE_FIELD;
use std::path::PathBuf;

/// File name matched during revision-diff discovery.
pub const DEFAULT_TARGET_FILE_NAME: &str = "permits.json";
/// Fallback targets, tried in order, when nothing else is selected.
pub const DEFAULT_TARGET_PATHS: &[&str] = &["permits.json", "data/permits.json"];

/// Settings for one synchronizer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Explicit targets. Empty means "discover".
    pub paths: Vec<PathBuf>,
    /// Revision the change set starts from.
    pub base_rev: Option<String>,
    /// Revision the change set ends at.
    pub head_rev: Option<String>,
    /// Note field written when a record has none of the known aliases.
    pub note_field: String,
    pub target_file_name: String,
    pub default_paths: Vec<PathBuf>,
    /// Report intended writes without touching files.
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            base_rev: None,
            head_rev: None,
            note_field: DEFAULT_NOTE_FIELD.to_string(),
            target_file_name: DEFAULT_TARGET_FILE_NAME.to_string(),
            default_paths: DEFAULT_TARGET_PATHS.iter().map(PathBuf::from).collect(),
            dry_run: false,
        }
    }
}

impl SyncConfig {
    /// Returns `(base, head)` when both revisions are set and non-blank.
    pub fn revision_range(&self) -> Option<(&str, &str)> {
        let base = self.base_rev.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let head = self.head_rev.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        Some((base, head))
    }
}
