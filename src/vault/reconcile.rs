//! Incremental reconciliation of a single file change
//!
//! Reconciliation is split in two so the file read never happens while the
//! graph is locked: [`Reconciler::prepare`] touches the filesystem,
//! [`Reconciler::apply`] only touches the graph.
//!
//! Documents are keyed by file name, so two files with the same name share a
//! node. As in a full scan, the file that comes last in walk order is the
//! live one and the others are recorded as shadowed on its node.

use super::change::FileChange;
use super::extract::{read_metadata, Metadata};
use super::scan::{attach_references, attach_tags, link};
use super::VaultConfig;
use crate::graph::{GraphStore, Node, NodeKey, NodeKind};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A change with its filesystem state already observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedChange {
    /// Not a document path
    Ignored { path: PathBuf },
    /// The document no longer exists on disk
    Gone { path: PathBuf, key: NodeKey },
    /// The document exists; `metadata` is empty if it could not be read
    Present {
        path: PathBuf,
        key: NodeKey,
        metadata: Metadata,
    },
}

/// What reconciliation did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileOutcome {
    /// Node (re)inserted with fresh edges
    Updated,
    /// Node removed
    Removed,
    /// Node was already gone, nothing to do
    Absent,
    /// Path is not a document
    Ignored,
    /// Path is a shadowed duplicate; only the shadow record changed
    Shadowed,
}

/// Result of reconciling one prepared change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub path: PathBuf,
    pub key: Option<NodeKey>,
    pub outcome: ReconcileOutcome,
    /// Tag nodes removed because nothing links to them anymore
    pub pruned: Vec<NodeKey>,
    pub edges_added: usize,
    /// Shadowed duplicate promoted to live after this document was deleted;
    /// it still has to be read and applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<PathBuf>,
}

impl ReconcileReport {
    fn new(path: PathBuf, key: Option<NodeKey>, outcome: ReconcileOutcome) -> Self {
        Self {
            path,
            key,
            outcome,
            pruned: Vec::new(),
            edges_added: 0,
            fallback: None,
        }
    }
}

/// Applies single-file deltas to a [`GraphStore`]
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: VaultConfig,
    root: Option<PathBuf>,
}

impl Reconciler {
    pub fn new(config: VaultConfig) -> Self {
        Self { config, root: None }
    }

    /// Also ignore paths the scanner of `root` would skip (hidden directories)
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Observe the filesystem for a change
    ///
    /// Moves expand into a deletion and a creation. The existence check wins
    /// over the reported kind: a "deleted" file that exists again is re-read,
    /// and a "modified" file that has vanished is treated as gone.
    pub fn prepare(&self, change: FileChange) -> Vec<PreparedChange> {
        change
            .normalize()
            .into_iter()
            .map(|change| self.prepare_one(change))
            .collect()
    }

    fn prepare_one(&self, change: FileChange) -> PreparedChange {
        let path = change.path;
        let relevant = match &self.root {
            Some(root) => self.config.is_vault_document(root, &path),
            None => self.config.is_document_path(&path),
        };
        if !relevant {
            debug!(path = %path.display(), "Ignoring non-document change");
            return PreparedChange::Ignored { path };
        }
        let Some(key) = Node::document(&path).map(|n| n.key) else {
            return PreparedChange::Ignored { path };
        };

        if !path.is_file() {
            return PreparedChange::Gone { path, key };
        }
        let metadata = read_metadata(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Skipped unreadable document");
            Metadata::default()
        });
        PreparedChange::Present {
            path,
            key,
            metadata,
        }
    }

    /// Observe the file promoted by a [`ReconcileReport::fallback`]
    pub fn prepare_fallback(&self, path: PathBuf) -> PreparedChange {
        self.prepare_one(FileChange::modified(path))
    }

    /// Shadowed duplicates a prepared deletion may fall back to, latest first
    ///
    /// Lets a caller read fallback files before locking the graph for
    /// [`apply`](Self::apply).
    pub fn fallback_candidates(&self, graph: &GraphStore, prepared: &PreparedChange) -> Vec<PathBuf> {
        let PreparedChange::Gone { path, key } = prepared else {
            return Vec::new();
        };
        graph
            .node(key)
            .filter(|n| n.path.as_deref() == Some(path.as_path()))
            .map(|n| n.shadowed.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Apply a prepared change to the graph
    pub fn apply(&self, graph: &mut GraphStore, prepared: PreparedChange) -> ReconcileReport {
        match prepared {
            PreparedChange::Ignored { path } => {
                ReconcileReport::new(path, None, ReconcileOutcome::Ignored)
            }
            PreparedChange::Gone { path, key } => self.remove(graph, path, key),
            PreparedChange::Present {
                path,
                key,
                metadata,
            } => self.reinsert(graph, path, key, metadata),
        }
    }

    /// Observe and apply in one step, following fallbacks
    pub fn apply_change(&self, graph: &mut GraphStore, change: FileChange) -> Vec<ReconcileReport> {
        let mut reports = Vec::new();
        for prepared in self.prepare(change) {
            let mut next = Some(prepared);
            while let Some(prepared) = next.take() {
                let report = self.apply(graph, prepared);
                next = report
                    .fallback
                    .clone()
                    .map(|path| self.prepare_fallback(path));
                reports.push(report);
            }
        }
        reports
    }

    fn remove(&self, graph: &mut GraphStore, path: PathBuf, key: NodeKey) -> ReconcileReport {
        let Some(node) = graph.node_mut(&key) else {
            debug!(key = %key, "Document already absent");
            return ReconcileReport::new(path, Some(key), ReconcileOutcome::Absent);
        };

        if node.path.as_deref() != Some(path.as_path()) {
            node.shadowed.remove(&path);
            debug!(key = %key, path = %path.display(), "Shadowed duplicate removed");
            return ReconcileReport::new(path, Some(key), ReconcileOutcome::Shadowed);
        }

        // The live file is gone; the latest shadowed duplicate takes over
        if let Some(next) = node.shadowed.pop_last() {
            node.path = Some(next.clone());
            debug!(key = %key, live = %next.display(), "Promoted shadowed duplicate");
            let mut report = ReconcileReport::new(path, Some(key), ReconcileOutcome::Removed);
            report.fallback = Some(next);
            return report;
        }

        let mut report = ReconcileReport::new(path, Some(key.clone()), ReconcileOutcome::Removed);
        if let Some((_, neighbors)) = graph.remove_node(&key) {
            report.pruned = graph.prune_orphans(&neighbors);
        }
        report
    }

    fn reinsert(
        &self,
        graph: &mut GraphStore,
        path: PathBuf,
        key: NodeKey,
        metadata: Metadata,
    ) -> ReconcileReport {
        let mut node = match Node::document(&path) {
            Some(node) => node.with_references(metadata.references),
            None => return ReconcileReport::new(path, Some(key), ReconcileOutcome::Ignored),
        };
        if let Some(existing) = graph.node_mut(&key) {
            match existing.path.clone() {
                Some(live) if path < live => {
                    existing.shadowed.insert(path.clone());
                    debug!(key = %key, live = %live.display(), "Change to a shadowed duplicate");
                    return ReconcileReport::new(path, Some(key), ReconcileOutcome::Shadowed);
                }
                live => node.shadowed = shadows_after(&existing.shadowed, live, &path),
            }
        }
        let references = node.references.clone();

        let neighbors = graph
            .remove_node(&key)
            .map(|(_, neighbors)| neighbors)
            .unwrap_or_default();
        let mut pruned = graph.prune_orphans(&neighbors);
        graph.upsert_node(node);

        let mut edges_added = attach_tags(graph, &key, &metadata.tags, &self.config);
        edges_added += attach_references(graph, &key, &references, &self.config).0;

        // Documents that linked here before the edit and still reference us
        for neighbor in &neighbors {
            let still_references = graph
                .node(neighbor)
                .filter(|n| n.kind == NodeKind::Document)
                .map(|n| {
                    n.references
                        .iter()
                        .any(|r| self.config.document_key_for(r) == key.as_str())
                })
                .unwrap_or(false);
            if still_references {
                edges_added += link(graph, neighbor, &key);
            }
        }

        pruned.retain(|k| !graph.contains(k));
        debug!(key = %key, edges = edges_added, pruned = pruned.len(), "Reconciled document");

        let mut report = ReconcileReport::new(path, Some(key), ReconcileOutcome::Updated);
        report.pruned = pruned;
        report.edges_added = edges_added;
        report
    }
}

/// Shadowed set once `path` becomes the live file in place of `live`
fn shadows_after(
    shadowed: &BTreeSet<PathBuf>,
    live: Option<PathBuf>,
    path: &Path,
) -> BTreeSet<PathBuf> {
    let mut shadowed = shadowed.clone();
    shadowed.extend(live.filter(|live| live != path));
    shadowed.remove(path);
    shadowed
}
