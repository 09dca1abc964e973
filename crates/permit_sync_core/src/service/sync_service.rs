//! Proposal synchronizer service.

use crate::config::SyncConfig;
use crate::model::permit::{base_id, note_value, permit_id, set_note_value, PermitCollection};
use crate::model::proposal::ProposalNumber;
use crate::paths::{discover_targets, is_backup_path};
use crate::proposal::canonical::{select_canonical, CanonicalChoice};
use crate::proposal::text::{first_number, rewrite_note};
use crate::repo::permit_file::{
    load_permits_file, parse_permits_text, write_atomically, PermitFileError,
};
use crate::revision::{is_null_revision, RevisionSource};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Fatal error for one file.
#[derive(Debug)]
pub enum SyncError {
    /// Read, parse, structure, or write failure.
    File(PermitFileError),
    /// Changed records of one base id carry different proposal numbers.
    AmbiguousCanonical {
        path: PathBuf,
        base_id: String,
        values: Vec<ProposalNumber>,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(err) => write!(f, "{err}"),
            Self::AmbiguousCanonical {
                path,
                base_id,
                values,
            } => {
                let joined = values
                    .iter()
                    .map(ProposalNumber::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{}: {base_id}: ambiguous-changed:{joined}", path.display())
            }
        }
    }
}

impl SyncError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(err) => err.path(),
            Self::AmbiguousCanonical { path, .. } => Some(path),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::File(err) => Some(err),
            Self::AmbiguousCanonical { .. } => None,
        }
    }
}

impl From<PermitFileError> for SyncError {
    fn from(value: PermitFileError) -> Self {
        Self::File(value)
    }
}

/// How the changed-note record set was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangePolicy {
    /// Compared against the document at the base revision.
    RevisionDiff,
    /// No before-state; every record carrying a proposal token counts.
    WholeFile,
}

/// Why a file was not opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BackupFolder,
    NotFound,
}

/// Why an opened file was left as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    NoChangedNotes,
    AlreadyNormalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped(SkipReason),
    NoOp(NoOpReason),
    /// Note values changed; `dry_run` means nothing was written.
    Updated { dry_run: bool },
}

/// Canonical selection for one impacted base id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSelection {
    pub base_id: String,
    pub choice: CanonicalChoice,
}

/// One record whose note value was rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate {
    pub permit_id: String,
    pub base_id: String,
    pub proposal: Option<ProposalNumber>,
    pub note: Value,
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub policy: Option<ChangePolicy>,
    pub changed_ids: BTreeSet<String>,
    pub selections: Vec<GroupSelection>,
    pub updates: Vec<AppliedUpdate>,
    pub outcome: FileOutcome,
}

impl FileReport {
    fn new(path: &Path, outcome: FileOutcome) -> Self {
        Self {
            path: path.to_path_buf(),
            policy: None,
            changed_ids: BTreeSet::new(),
            selections: Vec::new(),
            updates: Vec::new(),
            outcome,
        }
    }

    /// Whether the file was (or, in dry-run, would be) rewritten.
    pub fn changed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Updated { .. })
    }

    /// Console lines describing this file, in event order.
    pub fn console_lines(&self) -> Vec<String> {
        let path = self.path.display();
        let mut lines = Vec::new();
        match self.outcome {
            FileOutcome::Skipped(SkipReason::BackupFolder) => {
                lines.push(format!("SKIP: {path} (backup folder)"));
                return lines;
            }
            FileOutcome::Skipped(SkipReason::NotFound) => {
                lines.push(format!("SKIP: {path} (file not found in workspace)"));
                return lines;
            }
            FileOutcome::NoOp(NoOpReason::NoChangedNotes) => {
                lines.push(format!(
                    "NO-OP: {path} (no permit notes changed / added in diff)"
                ));
                return lines;
            }
            _ => {}
        }

        for selection in &self.selections {
            let canonical = selection
                .choice
                .number
                .as_ref()
                .map(ProposalNumber::as_str)
                .unwrap_or("None");
            lines.push(format!(
                "{path}: {}: canonical={canonical} ({})",
                selection.base_id, selection.choice.reason
            ));
        }
        for update in &self.updates {
            match &update.proposal {
                Some(number) => lines.push(format!("  - {}: {}", update.permit_id, number.prefixed())),
                None => lines.push(format!("  - {}: prefix normalized", update.permit_id)),
            }
        }

        match self.outcome {
            FileOutcome::NoOp(NoOpReason::AlreadyNormalized) => {
                lines.push(format!("NO-OP: {path} (already normalized)"));
            }
            FileOutcome::Updated { dry_run: true } => {
                lines.push(format!("DRY-RUN: {path} would be updated"));
            }
            FileOutcome::Updated { dry_run: false } => {
                lines.push(format!("UPDATED: {path}"));
            }
            _ => {}
        }
        lines
    }
}

/// Per-file results of one run, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<Result<FileReport, SyncError>>,
    pub dry_run: bool,
}

impl RunReport {
    pub fn any_changed(&self) -> bool {
        self.files
            .iter()
            .any(|file| file.as_ref().is_ok_and(FileReport::changed))
    }

    pub fn has_errors(&self) -> bool {
        self.files.iter().any(Result::is_err)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

enum BeforeState {
    Present(PermitCollection),
    /// The file did not exist at the base revision.
    Absent,
    /// Not requested, or the lookup failed.
    Unavailable,
}

/// Proposal synchronizer over a revision-control backend.
pub struct ProposalSyncService<R: RevisionSource> {
    revisions: R,
}

impl<R: RevisionSource> ProposalSyncService<R> {
    pub fn new(revisions: R) -> Self {
        Self { revisions }
    }

    /// Processes every target file of `config`.
    ///
    /// A fatal error for one file is recorded and the run moves on.
    pub fn run(&self, config: &SyncConfig) -> RunReport {
        let targets = discover_targets(config, &self.revisions);
        info!(
            "event=run_start module=service status=start targets={} dry_run={}",
            targets.len(),
            config.dry_run
        );

        let mut report = RunReport {
            files: Vec::with_capacity(targets.len()),
            dry_run: config.dry_run,
        };
        for target in &targets {
            let result = self.process_file(target, config);
            if let Err(err) = &result {
                error!(
                    "event=file_sync module=service status=error path={} error={}",
                    target.display(),
                    err
                );
            }
            report.files.push(result);
        }

        info!(
            "event=run_finish module=service status={} files={} changed={}",
            if report.has_errors() { "error" } else { "ok" },
            report.files.len(),
            report.any_changed()
        );
        report
    }

    /// Synchronizes proposal notes in one file.
    ///
    /// # Errors
    /// - `SyncError::File` for unreadable, malformed, or unwritable files.
    /// - `SyncError::AmbiguousCanonical` when changed siblings disagree; the
    ///   file is not written.
    pub fn process_file(&self, path: &Path, config: &SyncConfig) -> Result<FileReport, SyncError> {
        if is_backup_path(path) {
            info!(
                "event=file_skip module=service reason=backup_folder path={}",
                path.display()
            );
            return Ok(FileReport::new(path, FileOutcome::Skipped(SkipReason::BackupFolder)));
        }
        if !path.is_file() {
            info!(
                "event=file_skip module=service reason=not_found path={}",
                path.display()
            );
            return Ok(FileReport::new(path, FileOutcome::Skipped(SkipReason::NotFound)));
        }

        let mut loaded = load_permits_file(path)?;
        let note_field = config.note_field.as_str();

        let (policy, changed_ids) = match self.before_state(path, config) {
            BeforeState::Present(before) => (
                ChangePolicy::RevisionDiff,
                changed_since(Some(&before), &loaded.collection, note_field),
            ),
            BeforeState::Absent => (
                ChangePolicy::RevisionDiff,
                changed_since(None, &loaded.collection, note_field),
            ),
            BeforeState::Unavailable => (
                ChangePolicy::WholeFile,
                proposal_bearing_ids(&loaded.collection, note_field),
            ),
        };
        info!(
            "event=changed_set module=service path={} policy={:?} changed={}",
            path.display(),
            policy,
            changed_ids.len()
        );

        let mut report = FileReport::new(path, FileOutcome::NoOp(NoOpReason::NoChangedNotes));
        report.policy = Some(policy);
        if changed_ids.is_empty() {
            return Ok(report);
        }

        let groups = group_by_base_id(&loaded.collection);
        let impacted: BTreeSet<&str> = changed_ids.iter().map(|id| base_id(id)).collect();

        for group_id in &impacted {
            let members: Vec<&Map<String, Value>> = groups
                .get(*group_id)
                .map(|indices| {
                    indices
                        .iter()
                        .filter_map(|index| loaded.collection.entries()[*index].as_object())
                        .collect()
                })
                .unwrap_or_default();
            let choice = select_canonical(&members, &changed_ids, note_field).map_err(|err| {
                SyncError::AmbiguousCanonical {
                    path: path.to_path_buf(),
                    base_id: group_id.to_string(),
                    values: err.values,
                }
            })?;
            info!(
                "event=canonical_select module=service path={} base_id={} canonical={} reason={}",
                path.display(),
                group_id,
                choice.number.as_ref().map(ProposalNumber::as_str).unwrap_or("none"),
                choice.reason
            );
            report.selections.push(GroupSelection {
                base_id: group_id.to_string(),
                choice,
            });
        }

        for selection in &report.selections {
            let canonical = selection.choice.number.as_ref();
            let Some(indices) = groups.get(selection.base_id.as_str()) else {
                continue;
            };
            for index in indices {
                let Some(record) = loaded.collection.record_mut(*index) else {
                    continue;
                };
                let Some(updated) = rewrite_note(note_value(record, note_field), canonical) else {
                    continue;
                };
                set_note_value(record, updated.clone(), note_field);
                report.updates.push(AppliedUpdate {
                    permit_id: permit_id(record).unwrap_or_default().to_string(),
                    base_id: selection.base_id.clone(),
                    proposal: canonical.cloned(),
                    note: updated,
                });
            }
        }
        report.changed_ids = changed_ids;

        if report.updates.is_empty() {
            report.outcome = FileOutcome::NoOp(NoOpReason::AlreadyNormalized);
            return Ok(report);
        }

        let rendered = loaded.render()?;
        if config.dry_run {
            info!(
                "event=file_write module=service status=dry_run path={} updates={}",
                path.display(),
                report.updates.len()
            );
            report.outcome = FileOutcome::Updated { dry_run: true };
            return Ok(report);
        }

        write_atomically(path, &rendered)?;
        report.outcome = FileOutcome::Updated { dry_run: false };
        Ok(report)
    }

    fn before_state(&self, path: &Path, config: &SyncConfig) -> BeforeState {
        let Some((base, _head)) = config.revision_range() else {
            return BeforeState::Unavailable;
        };
        if is_null_revision(base) {
            return BeforeState::Unavailable;
        }

        match self.revisions.file_at(base, path) {
            Ok(Some(text)) => match parse_permits_text(path, &text) {
                Ok(before) => {
                    info!(
                        "event=before_state module=service status=ok path={} revision={base}",
                        path.display()
                    );
                    BeforeState::Present(before)
                }
                Err(err) => {
                    warn!(
                        "event=before_state module=service status=unusable path={} revision={base} error={err}",
                        path.display()
                    );
                    BeforeState::Unavailable
                }
            },
            Ok(None) => {
                info!(
                    "event=before_state module=service status=absent path={} revision={base}",
                    path.display()
                );
                BeforeState::Absent
            }
            Err(err) => {
                warn!(
                    "event=revision_query module=service status=error path={} revision={base} error={err}",
                    path.display()
                );
                BeforeState::Unavailable
            }
        }
    }
}

/// Ids of records that are new in `after` or whose note value differs.
fn changed_since(
    before: Option<&PermitCollection>,
    after: &PermitCollection,
    note_field: &str,
) -> BTreeSet<String> {
    let mut before_notes: BTreeMap<&str, Option<&Value>> = BTreeMap::new();
    if let Some(before) = before {
        for (_, record) in before.records() {
            if let Some(id) = permit_id(record) {
                before_notes.insert(id, comparable_note(record, note_field));
            }
        }
    }

    after
        .records()
        .filter_map(|(_, record)| {
            let id = permit_id(record)?;
            let current = comparable_note(record, note_field);
            match before_notes.get(id) {
                Some(previous) if *previous == current => None,
                _ => Some(id.to_string()),
            }
        })
        .collect()
}

/// `null` and a missing note field compare equal.
fn comparable_note<'r>(record: &'r Map<String, Value>, note_field: &str) -> Option<&'r Value> {
    note_value(record, note_field).filter(|value| !value.is_null())
}

/// Ids of records whose note carries at least one proposal token.
fn proposal_bearing_ids(collection: &PermitCollection, note_field: &str) -> BTreeSet<String> {
    collection
        .records()
        .filter(|(_, record)| first_number(note_value(record, note_field)).is_some())
        .filter_map(|(_, record)| permit_id(record).map(str::to_string))
        .collect()
}

/// Positions of identified records, keyed by base id, in file order.
fn group_by_base_id(collection: &PermitCollection) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, record) in collection.records() {
        if let Some(id) = permit_id(record) {
            groups.entry(base_id(id).to_string()).or_default().push(index);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::{changed_since, group_by_base_id, proposal_bearing_ids};
    use crate::model::permit::PermitCollection;
    use serde_json::json;

    fn collection(value: serde_json::Value) -> PermitCollection {
        PermitCollection::from_document(value).expect("supported fixture shape")
    }

    #[test]
    fn changed_since_reports_new_and_edited_records_only() {
        let before = collection(json!([
            {"permit_id": "A_1", "notes": "same"},
            {"permit_id": "A_2", "notes": "old"},
        ]));
        let after = collection(json!([
            {"permit_id": "A_1", "notes": "same"},
            {"permit_id": "A_2", "notes": "new"},
            {"permit_id": "A_3"},
            {"notes": "no id"},
        ]));
        let changed = changed_since(Some(&before), &after, "notes");
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec!["A_2".to_string(), "A_3".to_string()]
        );
    }

    #[test]
    fn changed_since_without_before_marks_every_identified_record() {
        let after = collection(json!({"permits": [
            {"permitId": "B_1"},
            {"permit_id": "B_2", "Notes": "x"},
        ]}));
        assert_eq!(changed_since(None, &after, "notes").len(), 2);
    }

    #[test]
    fn null_and_missing_note_compare_equal() {
        let before = collection(json!([{"permit_id": "C_1", "notes": null}]));
        let after = collection(json!([{"permit_id": "C_1"}]));
        assert!(changed_since(Some(&before), &after, "notes").is_empty());
    }

    #[test]
    fn whole_file_policy_selects_records_with_tokens() {
        let after = collection(json!([
            {"permit_id": "A_1", "notes": "x 1234-56-7890"},
            {"permit_id": "A_2", "notes": ""},
            {"permit_id": "B_1", "notes": ["Proposal 1111-22-3333"]},
        ]));
        let ids = proposal_bearing_ids(&after, "notes");
        assert!(ids.contains("A_1"));
        assert!(ids.contains("B_1"));
        assert!(!ids.contains("A_2"));
    }

    #[test]
    fn grouping_keeps_file_order_within_base_id() {
        let after = collection(json!([
            {"permit_id": "A_002"},
            "stray",
            {"permit_id": "B_001"},
            {"permit_id": "A_001"},
        ]));
        let groups = group_by_base_id(&after);
        assert_eq!(groups.get("A"), Some(&vec![0, 3]));
        assert_eq!(groups.get("B"), Some(&vec![2]));
    }
}
