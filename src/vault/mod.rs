//! Vault ingestion: metadata extraction, full scans, incremental reconciliation
//!
//! A vault is a directory tree of markdown documents. Documents mention tags
//! (`#topic`) and reference each other with wiki links (`[[Other Note]]`).
//!
//! - [`extract`] turns document text into tag and reference sets
//! - [`VaultScanner`] rebuilds a [`GraphStore`](crate::GraphStore) from scratch
//! - [`Reconciler`] applies a single [`FileChange`] without rescanning

mod change;
pub mod extract;
mod reconcile;
mod scan;

pub use change::{ChangeKind, FileChange};
pub use extract::{extract, read_metadata, Metadata};
pub use reconcile::{PreparedChange, ReconcileOutcome, ReconcileReport, Reconciler};
pub use scan::{ScanReport, VaultScanner};

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading a vault
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// How documents are recognized and how their tags are recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Document file extension, without the dot
    pub document_extension: String,
    /// Also link each document to a bare-text node per tag (`x` next to `#x`)
    pub mirror_bare_tags: bool,
    /// Skip directories whose name starts with `.` (`.git`, `.obsidian`)
    pub skip_hidden: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            document_extension: "md".to_string(),
            mirror_bare_tags: false,
            skip_hidden: true,
        }
    }
}

impl VaultConfig {
    /// True if `path` names a document (by extension)
    pub fn is_document_path(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy() == self.document_extension.as_str())
            .unwrap_or(false)
    }

    /// True if `path` is a document the scanner of `root` would pick up
    ///
    /// Paths outside `root` are judged by extension alone.
    pub fn is_vault_document(&self, root: &Path, path: &Path) -> bool {
        self.is_document_path(path) && !self.in_hidden_dir(root, path)
    }

    fn in_hidden_dir(&self, root: &Path, path: &Path) -> bool {
        if !self.skip_hidden {
            return false;
        }
        let Some(parent) = path.strip_prefix(root).ok().and_then(Path::parent) else {
            return false;
        };
        parent.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    }

    /// Key a reference name resolves to (`Other` -> `Other.md`)
    pub fn document_key_for(&self, reference: &str) -> String {
        format!("{}.{}", reference, self.document_extension)
    }
}
