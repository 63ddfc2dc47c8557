//! Temporary vaults on disk

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vaultgraph::vault::ScanReport;
use vaultgraph::{GraphStore, VaultConfig, VaultScanner};

/// A vault directory that is removed when dropped
#[derive(Debug)]
pub struct TestVault {
    dir: TempDir,
}

impl TestVault {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp vault"),
        }
    }

    /// A vault pre-populated with `(relative path, content)` files
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let vault = Self::new();
        for (relative, content) in files {
            vault.write(relative, content);
        }
        vault
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a file, creating parent directories; returns its full path
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write vault file");
        path
    }

    pub fn remove(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::remove_file(&path).expect("Failed to remove vault file");
        path
    }

    /// Rename a file; returns `(from, to)` full paths
    pub fn rename(&self, from: &str, to: &str) -> (PathBuf, PathBuf) {
        let (from, to) = (self.path(from), self.path(to));
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::rename(&from, &to).expect("Failed to rename vault file");
        (from, to)
    }

    /// Full scan with default settings
    pub fn scan(&self) -> (GraphStore, ScanReport) {
        self.scan_with(VaultConfig::default())
    }

    pub fn scan_with(&self, config: VaultConfig) -> (GraphStore, ScanReport) {
        VaultScanner::new(config)
            .scan(self.root())
            .expect("Failed to scan vault")
    }
}
