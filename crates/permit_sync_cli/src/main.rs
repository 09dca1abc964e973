//! `permit-sync` command-line entry point.
//!
//! # Responsibility
//! - Map flags and CI environment variables onto a `SyncConfig`.
//! - Print one console line per file event and a final summary line.
//!
//! # Exit codes
//! - `0`: success or no-op.
//! - `1`: logging or report bootstrap failure.
//! - `2`: at least one file failed (malformed JSON, ambiguous canonical, ...).

use clap::Parser;
use log::error;
use permit_sync_core::{
    default_log_level, init_logging, GitRevisionSource, ProposalSyncService, RunReport,
    RunSummary, SyncConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_BOOTSTRAP_FAILURE: u8 = 1;
const EXIT_SYNC_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "permit-sync", version)]
#[command(about = "Normalize and propagate proposal numbers across related permits")]
struct Cli {
    /// Explicit permits file(s). When omitted, changed files are discovered
    /// from the base/head revisions, then `permits.json` / `data/permits.json`.
    paths: Vec<PathBuf>,

    /// Same as the positional paths.
    #[arg(long = "paths", num_args = 1.., value_name = "PATH")]
    flagged_paths: Vec<PathBuf>,

    /// Preferred note field written when a permit has no note field.
    #[arg(long, env = "NOTE_FIELD", default_value = "notes")]
    note_field: String,

    /// Base revision for change detection (typically the pre-push commit).
    #[arg(long, env = "BASE_SHA")]
    base_sha: Option<String>,

    /// Head revision for change detection (typically the pushed commit).
    #[arg(long, env = "HEAD_SHA")]
    head_sha: Option<String>,

    /// File name matched during revision-diff discovery.
    #[arg(long, env = "PERMITS_FILE_NAME", default_value = "permits.json")]
    file_name: String,

    /// Report intended changes without writing.
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Diagnostic log level (trace|debug|info|warn|error).
    #[arg(long, env = "PERMIT_SYNC_LOG")]
    log_level: Option<String>,

    /// Absolute directory for rolling diagnostic logs (stderr when unset).
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Write a JSON run summary to this path.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl Cli {
    fn sync_config(&self) -> SyncConfig {
        let mut paths = self.paths.clone();
        paths.extend(self.flagged_paths.iter().cloned());
        SyncConfig {
            paths,
            base_rev: self.base_sha.clone(),
            head_rev: self.head_sha.clone(),
            note_field: self.note_field.clone(),
            target_file_name: self.file_name.clone(),
            dry_run: self.dry_run,
            ..SyncConfig::default()
        }
    }

    fn effective_log_level(&self) -> &str {
        match (&self.log_level, &self.log_dir) {
            (Some(level), _) => level.as_str(),
            (None, Some(_)) => default_log_level(),
            // Keep stderr quiet unless asked; console lines carry the report.
            (None, None) => "warn",
        }
    }
}

/// Prints per-file lines and the closing summary; fatal file errors go to `err`.
fn write_report(
    report: &RunReport,
    target_file_name: &str,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    if report.is_empty() {
        writeln!(out, "No {target_file_name} files to process.")?;
        return Ok(());
    }
    for file in &report.files {
        match file {
            Ok(file) => {
                for line in file.console_lines() {
                    writeln!(out, "{line}")?;
                }
            }
            Err(failure) => writeln!(err, "ERROR: {failure}")?,
        }
    }
    if report.any_changed() {
        writeln!(out, "DONE: updates applied.")
    } else {
        writeln!(out, "DONE: no updates necessary.")
    }
}

fn exit_status(report: &RunReport) -> u8 {
    if report.has_errors() {
        EXIT_SYNC_FAILURE
    } else {
        0
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.as_ref().map(|dir| dir.to_string_lossy().into_owned());
    if let Err(err) = init_logging(cli.effective_log_level(), log_dir.as_deref()) {
        eprintln!("ERROR: {err}");
        return ExitCode::from(EXIT_BOOTSTRAP_FAILURE);
    }

    let config = cli.sync_config();
    let service = ProposalSyncService::new(GitRevisionSource::new());
    let report = service.run(&config);

    if let Err(err) = write_report(
        &report,
        &config.target_file_name,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    ) {
        error!("event=console_write module=cli status=error error={err}");
    }

    if let Some(report_path) = &cli.report_json {
        if let Err(err) = RunSummary::from_report(&report).write_to(report_path) {
            error!("event=report_write module=cli status=error error={err}");
            eprintln!("ERROR: {err}");
            return ExitCode::from(EXIT_BOOTSTRAP_FAILURE);
        }
    }

    ExitCode::from(exit_status(&report))
}
