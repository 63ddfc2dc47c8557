//! Normalized filesystem change notifications

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    /// The file at `path` now lives at `to`
    Moved { to: PathBuf },
}

/// A single change notification as delivered by a watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Created)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Deleted)
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::new(from, ChangeKind::Moved { to: to.into() })
    }

    /// Expand a move into a deletion at the old path followed by a creation
    /// at the new one. Other kinds pass through unchanged.
    pub fn normalize(self) -> Vec<FileChange> {
        match self.kind {
            ChangeKind::Moved { to } => vec![FileChange::deleted(self.path), FileChange::created(to)],
            _ => vec![self],
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == ChangeKind::Deleted
    }
}

impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ChangeKind::Created => write!(f, "created {}", self.path.display()),
            ChangeKind::Modified => write!(f, "modified {}", self.path.display()),
            ChangeKind::Deleted => write!(f, "deleted {}", self.path.display()),
            ChangeKind::Moved { to } => {
                write!(f, "moved {} -> {}", self.path.display(), to.display())
            }
        }
    }
}
