#![allow(dead_code)]

use permit_sync_core::{RevisionError, RevisionResult, RevisionSource, SyncConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory revision history keyed by path.
#[derive(Default)]
pub struct FakeRevisions {
    pub before: HashMap<PathBuf, String>,
    pub changed: Vec<String>,
    pub fail: bool,
}

impl FakeRevisions {
    pub fn with_before(path: &Path, text: &str) -> Self {
        let mut fake = Self::default();
        fake.before.insert(path.to_path_buf(), text.to_string());
        fake
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn failure(&self) -> RevisionError {
        RevisionError::CommandFailed {
            command: "git fake".to_string(),
            stderr: "fatal: not a git repository".to_string(),
        }
    }
}

impl RevisionSource for FakeRevisions {
    fn file_at(&self, _revision: &str, path: &Path) -> RevisionResult<Option<String>> {
        if self.fail {
            return Err(self.failure());
        }
        Ok(self.before.get(path).cloned())
    }

    fn changed_paths(&self, _base: &str, _head: &str) -> RevisionResult<Vec<String>> {
        if self.fail {
            return Err(self.failure());
        }
        Ok(self.changed.clone())
    }
}

pub fn config_for(paths: &[&Path]) -> SyncConfig {
    SyncConfig {
        paths: paths.iter().map(|path| path.to_path_buf()).collect(),
        ..SyncConfig::default()
    }
}

pub fn revision_config_for(paths: &[&Path]) -> SyncConfig {
    SyncConfig {
        base_rev: Some("base1234".to_string()),
        head_rev: Some("head5678".to_string()),
        ..config_for(paths)
    }
}

pub fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
