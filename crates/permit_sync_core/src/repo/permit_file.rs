//! Load/render/persist helpers for a single permits file.

use crate::model::permit::PermitCollection;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Indentation width used when none can be detected.
pub const DEFAULT_INDENT: usize = 2;

static INDENTED_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^([ \t]+)["{\[]"#).expect("valid indent regex"));

/// File-level failure for one permits document.
#[derive(Debug)]
pub enum PermitFileError {
    Io { path: PathBuf, source: io::Error },
    /// Input is not valid JSON.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// JSON parsed but is neither a list nor `{"permits": [...]}`.
    Structure { path: PathBuf },
    Serialize(serde_json::Error),
    Persist { path: PathBuf, source: io::Error },
}

impl Display for PermitFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: failed to read: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "{} is not valid JSON: {source}", path.display())
            }
            Self::Structure { path } => write!(
                f,
                "{}: unsupported permits structure: expected a list, or an object with a 'permits' list",
                path.display()
            ),
            Self::Serialize(source) => write!(f, "failed to serialize permits: {source}"),
            Self::Persist { path, source } => {
                write!(f, "{}: failed to write: {source}", path.display())
            }
        }
    }
}

impl Error for PermitFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Structure { .. } => None,
            Self::Serialize(source) => Some(source),
            Self::Persist { source, .. } => Some(source),
        }
    }
}

impl PermitFileError {
    /// File the error refers to, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::Structure { path }
            | Self::Persist { path, .. } => Some(path),
            Self::Serialize(_) => None,
        }
    }
}

/// A permits document as read from disk.
#[derive(Debug, Clone)]
pub struct LoadedPermits {
    pub path: PathBuf,
    pub original_text: String,
    pub indent: usize,
    pub collection: PermitCollection,
}

impl LoadedPermits {
    /// Renders the (possibly edited) collection in the original file's format.
    pub fn render(&self) -> Result<String, PermitFileError> {
        render_document(
            self.collection.document(),
            self.indent,
            self.original_text.ends_with('\n'),
        )
    }
}

/// Reads and parses one permits file.
///
/// # Errors
/// - `Io` when the file cannot be read.
/// - `Parse` when the content is not JSON.
/// - `Structure` when the JSON layout is unsupported.
pub fn load_permits_file(path: &Path) -> Result<LoadedPermits, PermitFileError> {
    let original_text = std::fs::read_to_string(path).map_err(|source| PermitFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let collection = parse_permits_text(path, &original_text)?;
    let indent = detect_indent(&original_text);
    info!(
        "event=file_load module=repo status=ok path={} shape={:?} records={} indent={}",
        path.display(),
        collection.shape(),
        collection.entries().len(),
        indent
    );
    Ok(LoadedPermits {
        path: path.to_path_buf(),
        original_text,
        indent,
        collection,
    })
}

/// Parses permits JSON text; `path` is only used for error context.
pub fn parse_permits_text(path: &Path, text: &str) -> Result<PermitCollection, PermitFileError> {
    let document: Value = serde_json::from_str(text).map_err(|source| PermitFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    PermitCollection::from_document(document).ok_or_else(|| PermitFileError::Structure {
        path: path.to_path_buf(),
    })
}

/// Returns the indentation width of the first indented value line.
///
/// Falls back to [`DEFAULT_INDENT`] for single-line documents.
pub fn detect_indent(text: &str) -> usize {
    text.lines()
        .find_map(|line| INDENTED_LINE_RE.captures(line))
        .map(|caps| caps[1].len().max(1))
        .unwrap_or(DEFAULT_INDENT)
}

/// Pretty-prints `document` with `indent` spaces per level.
pub fn render_document(
    document: &Value,
    indent: usize,
    trailing_newline: bool,
) -> Result<String, PermitFileError> {
    let indent_text = " ".repeat(indent.max(1));
    let formatter = PrettyFormatter::with_indent(indent_text.as_bytes());
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .map_err(PermitFileError::Serialize)?;

    let mut rendered = String::from_utf8_lossy(&buffer).into_owned();
    if trailing_newline {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Replaces `path` with `contents` through a temp file in the same directory.
///
/// # Side effects
/// - Emits `file_write` logging events with status.
pub fn write_atomically(path: &Path, contents: &str) -> Result<(), PermitFileError> {
    let persist_error = |source: io::Error| PermitFileError::Persist {
        path: path.to_path_buf(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let result = tempfile::NamedTempFile::new_in(directory)
        .and_then(|mut staged| {
            staged.write_all(contents.as_bytes())?;
            staged.flush()?;
            // Replacing the file must not narrow its mode to the temp file's 0600.
            if let Ok(existing) = fs::metadata(path) {
                staged.as_file().set_permissions(existing.permissions())?;
            }
            Ok(staged)
        })
        .map_err(persist_error)
        .and_then(|staged| {
            staged
                .persist(path)
                .map(|_| ())
                .map_err(|err| persist_error(err.error))
        });

    match &result {
        Ok(()) => info!(
            "event=file_write module=repo status=ok path={} bytes={}",
            path.display(),
            contents.len()
        ),
        Err(err) => error!(
            "event=file_write module=repo status=error path={} error={}",
            path.display(),
            err
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{detect_indent, parse_permits_text, render_document, PermitFileError};
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn detect_indent_reads_first_indented_line() {
        assert_eq!(detect_indent("[\n    {\n      \"a\": 1\n    }\n]\n"), 4);
        assert_eq!(detect_indent("{\n \"permits\": []\n}"), 1);
        assert_eq!(detect_indent("[{\"a\": 1}]"), 2);
    }

    #[test]
    fn render_keeps_key_order_indent_and_newline() {
        let document = json!([{"permit_id": "A_1", "zeta": 1, "alpha": "é"}]);
        let rendered = render_document(&document, 4, true).unwrap();
        assert_eq!(
            rendered,
            "[\n    {\n        \"permit_id\": \"A_1\",\n        \"zeta\": 1,\n        \"alpha\": \"é\"\n    }\n]\n"
        );
        let compact = render_document(&json!([]), 2, false).unwrap();
        assert_eq!(compact, "[]");
    }

    #[test]
    fn parse_distinguishes_malformed_json_from_bad_structure() {
        let path = Path::new("permits.json");
        assert!(matches!(
            parse_permits_text(path, "[{"),
            Err(PermitFileError::Parse { .. })
        ));
        assert!(matches!(
            parse_permits_text(path, "{\"items\": []}"),
            Err(PermitFileError::Structure { .. })
        ));
        assert!(parse_permits_text(path, "{\"permits\": []}").is_ok());
    }
}
