//! `git` subprocess implementation of `RevisionSource`.

use super::{RevisionError, RevisionResult, RevisionSource};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Queries the repository enclosing `workdir` (the process cwd by default).
#[derive(Debug, Clone, Default)]
pub struct GitRevisionSource {
    workdir: Option<PathBuf>,
}

impl GitRevisionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every query as `git -C <workdir> ...`.
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(workdir.into()),
        }
    }

    fn run(&self, args: &[&str]) -> RevisionResult<String> {
        let mut command = Command::new("git");
        if let Some(workdir) = &self.workdir {
            command.arg("-C").arg(workdir);
        }
        command.args(args);

        let rendered = format!("git {}", args.join(" "));
        debug!("event=revision_query module=revision status=start command={rendered}");
        let output = command.output()?;
        if !output.status.success() {
            return Err(RevisionError::CommandFailed {
                command: rendered,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| RevisionError::InvalidUtf8 { command: rendered })
    }
}

/// How a path is named inside `<rev>:<path>` and `ls-tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TreePath {
    /// Relative to the git process cwd, spelled `./...`.
    CwdRelative(String),
    /// Relative to the repository top-level.
    RootRelative(String),
}

/// Spells a relative `path` the way git expects for cwd-relative lookups.
fn cwd_tree_path(path: &Path) -> String {
    let text = slashed(path);
    if text.starts_with("./") || text.starts_with("../") {
        text
    } else {
        format!("./{text}")
    }
}

/// Returns `path` relative to the repository `top_level`, `None` when outside it.
fn repo_relative(path: &Path, top_level: &Path) -> Option<String> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let top_level = top_level
        .canonicalize()
        .unwrap_or_else(|_| top_level.to_path_buf());
    path.strip_prefix(&top_level)
        .ok()
        .map(slashed)
        .filter(|relative| !relative.is_empty())
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl GitRevisionSource {
    fn tree_path(&self, path: &Path) -> RevisionResult<TreePath> {
        if !path.is_absolute() {
            return Ok(TreePath::CwdRelative(cwd_tree_path(path)));
        }
        let top_level = self.run(&["rev-parse", "--show-toplevel"])?;
        repo_relative(path, Path::new(top_level.trim()))
            .map(TreePath::RootRelative)
            .ok_or_else(|| RevisionError::OutsideRepository {
                path: path.to_path_buf(),
            })
    }
}

impl RevisionSource for GitRevisionSource {
    fn file_at(&self, revision: &str, path: &Path) -> RevisionResult<Option<String>> {
        let (spelled, listed) = match self.tree_path(path)? {
            TreePath::CwdRelative(spelled) => {
                let listed =
                    self.run(&["ls-tree", "--name-only", revision, "--", spelled.as_str()])?;
                (spelled, listed)
            }
            TreePath::RootRelative(spelled) => {
                let listed = self.run(&[
                    "ls-tree",
                    "--full-tree",
                    "--name-only",
                    revision,
                    "--",
                    spelled.as_str(),
                ])?;
                (spelled, listed)
            }
        };
        if listed.trim().is_empty() {
            return Ok(None);
        }
        let object = format!("{revision}:{spelled}");
        self.run(&["show", object.as_str()]).map(Some)
    }

    fn changed_paths(&self, base: &str, head: &str) -> RevisionResult<Vec<String>> {
        let diff = self.run(&["diff", "--name-only", base, head])?;
        Ok(diff
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
