//! Filesystem watching
//!
//! [`WatchBridge`] forwards notify events for vault documents into the
//! change queue consumed by [`spawn_reconciler`](crate::runtime::spawn_reconciler).

use crate::vault::{FileChange, VaultConfig};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Errors raised by the filesystem watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watch root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result type for watcher operations
pub type WatchResult<T> = Result<T, WatchError>;

/// A running recursive watch on a vault root
///
/// Dropping the bridge stops the watch.
pub struct WatchBridge {
    root: PathBuf,
    watcher: RecommendedWatcher,
}

impl WatchBridge {
    /// Watch `root` recursively, sending document changes on `tx`
    ///
    /// The notify callback runs on the watcher's own thread and blocks when
    /// the queue is full.
    pub fn start(
        root: &Path,
        config: VaultConfig,
        tx: mpsc::Sender<FileChange>,
    ) -> WatchResult<Self> {
        let root = root
            .canonicalize()
            .map_err(|_| WatchError::RootNotFound(root.to_path_buf()))?;

        let base = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for change in translate(&event, &base, &config) {
                        debug!(%change, "Watch event");
                        if let Err(e) = tx.blocking_send(change) {
                            error!("Failed to queue file change: {}", e);
                        }
                    }
                }
                Err(e) => error!("Watch error: {:?}", e),
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Started watching: {}", root.display());
        Ok(Self { root, watcher })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching explicitly, surfacing any unwatch error
    pub fn stop(mut self) -> WatchResult<()> {
        self.watcher.unwatch(&self.root)?;
        info!("Stopped watching: {}", self.root.display());
        Ok(())
    }
}

impl std::fmt::Debug for WatchBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchBridge")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Map one notify event onto vault file changes
///
/// Only document paths outside hidden directories pass. A rename between a
/// document and a non-document (an editor's atomic save, say) becomes a
/// creation or deletion of the document side.
pub fn translate(event: &Event, root: &Path, config: &VaultConfig) -> Vec<FileChange> {
    let relevant = |path: &Path| config.is_vault_document(root, path);

    match &event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|p| relevant(p) && !p.is_dir())
            .map(FileChange::created)
            .collect(),

        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter(|p| relevant(p))
            .map(FileChange::deleted)
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => match (relevant(from), relevant(to)) {
                (true, true) => vec![FileChange::moved(from, to)],
                (true, false) => vec![FileChange::deleted(from)],
                (false, true) => vec![FileChange::created(to)],
                (false, false) => Vec::new(),
            },
            _ => Vec::new(),
        },

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter(|p| relevant(p))
            .map(FileChange::deleted)
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter(|p| relevant(p))
            .map(FileChange::created)
            .collect(),

        // Either half of a rename we cannot pair: decide by existence
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter(|p| relevant(p))
            .map(|p| {
                if p.exists() {
                    FileChange::created(p)
                } else {
                    FileChange::deleted(p)
                }
            })
            .collect(),

        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),

        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| relevant(p))
            .map(FileChange::modified)
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
