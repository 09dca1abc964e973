//! Target selection and backup-folder protection.
//!
//! # Invariants
//! - A path with any component named `backup` (any case) is never a target.
//! - Explicit paths are returned as given; backup filtering for them happens
//!   per file so the skip is reported.

use crate::config::SyncConfig;
use crate::revision::{is_null_revision, RevisionSource};
use log::{info, warn};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

const BACKUP_DIR_NAME: &str = "backup";

/// Returns whether any component of `path` is a `backup` directory.
pub fn is_backup_path(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().eq_ignore_ascii_case(BACKUP_DIR_NAME),
        _ => false,
    })
}

/// Resolves the files one run should process.
///
/// Order of precedence:
/// 1. `config.paths` when non-empty.
/// 2. Files named `config.target_file_name` changed between the configured
///    revisions, backup paths excluded.
/// 3. The first existing, non-backup entry of `config.default_paths`.
pub fn discover_targets<R: RevisionSource + ?Sized>(config: &SyncConfig, revisions: &R) -> Vec<PathBuf> {
    if !config.paths.is_empty() {
        return config.paths.clone();
    }

    if let Some((base, head)) = config.revision_range() {
        let discovered = discover_changed_files(config, revisions, base, head);
        if !discovered.is_empty() {
            return discovered;
        }
    }

    config
        .default_paths
        .iter()
        .find(|path| !is_backup_path(path) && path.is_file())
        .cloned()
        .into_iter()
        .collect()
}

fn discover_changed_files<R: RevisionSource + ?Sized>(
    config: &SyncConfig,
    revisions: &R,
    base: &str,
    head: &str,
) -> Vec<PathBuf> {
    if is_null_revision(base) {
        info!("event=discover module=paths status=skip reason=null_base_revision");
        return Vec::new();
    }

    let changed = match revisions.changed_paths(base, head) {
        Ok(changed) => changed,
        Err(err) => {
            warn!(
                "event=revision_query module=paths status=error base={base} head={head} error={err}"
            );
            return Vec::new();
        }
    };

    let target_name = OsStr::new(config.target_file_name.as_str());
    let targets: Vec<PathBuf> = changed
        .iter()
        .map(PathBuf::from)
        .filter(|path| path.file_name() == Some(target_name))
        .filter(|path| !is_backup_path(path))
        .collect();
    info!(
        "event=discover module=paths status=ok base={base} head={head} changed={} targets={}",
        changed.len(),
        targets.len()
    );
    targets
}

#[cfg(test)]
mod tests {
    use super::is_backup_path;
    use std::path::Path;

    #[test]
    fn backup_detection_matches_whole_components_in_any_case() {
        assert!(is_backup_path(Path::new("archive/backup/permits.json")));
        assert!(is_backup_path(Path::new("BACKUP/permits.json")));
        assert!(is_backup_path(Path::new("./data/Backup/x/permits.json")));
        assert!(!is_backup_path(Path::new("backups/permits.json")));
        assert!(!is_backup_path(Path::new("data/permits.backup.json")));
        assert!(!is_backup_path(Path::new("permits.json")));
    }
}
