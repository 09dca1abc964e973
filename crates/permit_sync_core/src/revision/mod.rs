//! Revision-control lookups used to find which notes a change touched.
//!
//! # Responsibility
//! - Fetch a file's content at an older revision.
//! - List the files changed between two revisions.
//!
//! # Invariants
//! - Lookups never mutate the working tree.
//! - Callers treat any `RevisionError` as "no before-state available".

mod git;

pub use git::GitRevisionSource;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub type RevisionResult<T> = Result<T, RevisionError>;

/// Failure of a revision-control query.
#[derive(Debug)]
pub enum RevisionError {
    /// The tool could not be started.
    Spawn(io::Error),
    /// The tool ran and exited unsuccessfully.
    CommandFailed { command: String, stderr: String },
    /// The tool printed output that is not UTF-8.
    InvalidUtf8 { command: String },
    /// An absolute path lies outside the repository work tree.
    OutsideRepository { path: PathBuf },
}

impl Display for RevisionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to start revision tool: {err}"),
            Self::CommandFailed { command, stderr } => {
                write!(f, "`{command}` failed: {}", stderr.trim())
            }
            Self::InvalidUtf8 { command } => write!(f, "`{command}` printed non UTF-8 output"),
            Self::OutsideRepository { path } => {
                write!(f, "{} is outside the repository", path.display())
            }
        }
    }
}

impl Error for RevisionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::CommandFailed { .. }
            | Self::InvalidUtf8 { .. }
            | Self::OutsideRepository { .. } => None,
        }
    }
}

impl From<io::Error> for RevisionError {
    fn from(value: io::Error) -> Self {
        Self::Spawn(value)
    }
}

/// Read-only access to file history.
pub trait RevisionSource {
    /// Returns `path` as of `revision`, or `None` when it did not exist there.
    fn file_at(&self, revision: &str, path: &Path) -> RevisionResult<Option<String>>;

    /// Returns repository-relative paths changed between `base` and `head`.
    fn changed_paths(&self, base: &str, head: &str) -> RevisionResult<Vec<String>>;
}

/// Returns whether `revision` is the all-zero id pushed for new branches.
pub fn is_null_revision(revision: &str) -> bool {
    matches!(revision.len(), 40 | 64) && revision.bytes().all(|byte| byte == b'0')
}
