//! Machine-readable run summary.

use crate::repo::permit_file::{write_atomically, PermitFileError};
use crate::service::sync_service::{
    ChangePolicy, FileOutcome, FileReport, NoOpReason, RunReport, SkipReason,
};
use serde::Serialize;
use std::path::Path;

/// JSON summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: Option<String>,
    /// `skipped|no_op|updated|dry_run|failed`
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ChangePolicy>,
    pub selections: Vec<SelectionSummary>,
    pub updated_permit_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub base_id: String,
    pub canonical: Option<String>,
    pub reason: String,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let files: Vec<FileSummary> = report
            .files
            .iter()
            .map(|file| match file {
                Ok(file) => FileSummary::from_file(file),
                Err(err) => FileSummary {
                    path: err.path().map(|path| path.display().to_string()),
                    status: "failed",
                    detail: Some(err.to_string()),
                    policy: None,
                    selections: Vec::new(),
                    updated_permit_ids: Vec::new(),
                },
            })
            .collect();
        let count = |status: &str| files.iter().filter(|file| file.status == status).count();

        Self {
            dry_run: report.dry_run,
            updated: count("updated") + count("dry_run"),
            skipped: count("skipped"),
            failed: count("failed"),
            files,
        }
    }

    /// Writes the summary as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), PermitFileError> {
        let mut rendered =
            serde_json::to_string_pretty(self).map_err(PermitFileError::Serialize)?;
        rendered.push('\n');
        write_atomically(path, &rendered)
    }
}

impl FileSummary {
    fn from_file(file: &FileReport) -> Self {
        let (status, detail) = match file.outcome {
            FileOutcome::Skipped(SkipReason::BackupFolder) => ("skipped", Some("backup folder")),
            FileOutcome::Skipped(SkipReason::NotFound) => ("skipped", Some("file not found")),
            FileOutcome::NoOp(NoOpReason::NoChangedNotes) => ("no_op", Some("no notes changed")),
            FileOutcome::NoOp(NoOpReason::AlreadyNormalized) => {
                ("no_op", Some("already normalized"))
            }
            FileOutcome::Updated { dry_run: true } => ("dry_run", None),
            FileOutcome::Updated { dry_run: false } => ("updated", None),
        };
        Self {
            path: Some(file.path.display().to_string()),
            status,
            detail: detail.map(str::to_string),
            policy: file.policy,
            selections: file
                .selections
                .iter()
                .map(|selection| SelectionSummary {
                    base_id: selection.base_id.clone(),
                    canonical: selection
                        .choice
                        .number
                        .as_ref()
                        .map(|number| number.as_str().to_string()),
                    reason: selection.choice.reason.to_string(),
                })
                .collect(),
            updated_permit_ids: file
                .updates
                .iter()
                .map(|update| update.permit_id.clone())
                .collect(),
        }
    }
}
