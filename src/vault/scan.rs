//! Full vault scan: the ground-truth rebuild of the graph

use super::extract::{read_metadata, Metadata};
use super::{VaultConfig, VaultError, VaultResult};
use crate::graph::{GraphStore, Node, NodeKey, NodeKind};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Counts from one full scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub documents: usize,
    pub tags: usize,
    pub edges: usize,
    /// Documents whose content could not be read (kept as edgeless nodes)
    pub unreadable: usize,
    /// References whose target document does not exist
    pub unresolved_references: usize,
    /// Documents shadowed by a later file with the same name
    pub duplicates: usize,
}

/// Walks a vault directory and builds its graph from scratch
#[derive(Debug, Clone, Default)]
pub struct VaultScanner {
    config: VaultConfig,
}

impl VaultScanner {
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// All document paths under `root`, in deterministic walk order
    pub fn discover(&self, root: &Path) -> VaultResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(VaultError::RootNotFound(root.to_path_buf()));
        }
        let skip_hidden = self.config.skip_hidden;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| e.depth() == 0 || !(skip_hidden && is_hidden_dir(e)));

        let mut paths = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if self.config.is_document_path(entry.path()) {
                        paths.push(entry.into_path());
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable vault entry"),
            }
        }
        Ok(paths)
    }

    /// Build a fresh graph for the vault at `root`
    pub fn scan(&self, root: &Path) -> VaultResult<(GraphStore, ScanReport)> {
        let mut graph = GraphStore::new();
        let report = self.rebuild(root, &mut graph)?;
        Ok((graph, report))
    }

    /// Clear `graph` and rebuild it from the vault at `root`
    ///
    /// On error (missing root) the graph is left cleared.
    pub fn rebuild(&self, root: &Path, graph: &mut GraphStore) -> VaultResult<ScanReport> {
        graph.clear();
        let paths = self.discover(root)?;
        let mut report = ScanReport::default();

        // Pass one: documents and their tags
        for path in &paths {
            let Some(mut node) = Node::document(path) else {
                continue;
            };
            let metadata = read_metadata(path).unwrap_or_else(|e| {
                warn!(error = %e, "Skipped unreadable document");
                report.unreadable += 1;
                Metadata::default()
            });

            if let Some(existing) = graph.node(&node.key) {
                warn!(
                    key = %node.key,
                    kept = %path.display(),
                    shadowed = ?existing.path,
                    "Duplicate document name; the later file wins"
                );
                report.duplicates += 1;
                if let Some((previous, neighbors)) = graph.remove_node(&node.key) {
                    node.shadowed = previous.shadowed;
                    node.shadowed.extend(previous.path);
                    graph.prune_orphans(&neighbors);
                }
            }

            debug!(
                key = %node.key,
                tags = metadata.tags.len(),
                references = metadata.references.len(),
                "Scanned document"
            );
            let key = graph.upsert_node(node.with_references(metadata.references));
            attach_tags(graph, &key, &metadata.tags, &self.config);
        }

        // Pass two: document references, resolved against pass one
        let pending: Vec<(NodeKey, BTreeSet<String>)> = graph
            .documents()
            .map(|n| (n.key.clone(), n.references.clone()))
            .collect();
        for (key, references) in pending {
            let (_, unresolved) = attach_references(graph, &key, &references, &self.config);
            report.unresolved_references += unresolved;
        }

        report.documents = graph.documents().count();
        report.tags = graph.nodes().filter(|n| n.kind != NodeKind::Document).count();
        report.edges = graph.edge_count();
        info!(
            root = %root.display(),
            documents = report.documents,
            tags = report.tags,
            edges = report.edges,
            "Vault scan complete"
        );
        Ok(report)
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

/// Link a document to a tag node per tag, creating tag nodes as needed
///
/// Returns the number of edges added.
pub(super) fn attach_tags(
    graph: &mut GraphStore,
    document: &NodeKey,
    tags: &BTreeSet<String>,
    config: &VaultConfig,
) -> usize {
    let mut added = 0;
    for tag in tags {
        let tag_key = graph.ensure_node(Node::tag(tag));
        added += link(graph, document, &tag_key);
        if config.mirror_bare_tags {
            let bare_key = graph.ensure_node(Node::bare_tag(tag));
            added += link(graph, document, &bare_key);
        }
    }
    added
}

/// Link a document to every referenced document currently in the graph
///
/// Returns `(added, unresolved)`. Self-references count as neither.
pub(super) fn attach_references(
    graph: &mut GraphStore,
    document: &NodeKey,
    references: &BTreeSet<String>,
    config: &VaultConfig,
) -> (usize, usize) {
    let mut added = 0;
    let mut unresolved = 0;
    for reference in references {
        let target = NodeKey::from(config.document_key_for(reference));
        if &target == document {
            continue;
        }
        if graph.kind(&target) == Some(NodeKind::Document) {
            added += link(graph, document, &target);
        } else {
            debug!(document = %document, reference = %reference, "Unresolved reference dropped");
            unresolved += 1;
        }
    }
    (added, unresolved)
}

pub(super) fn link(graph: &mut GraphStore, a: &NodeKey, b: &NodeKey) -> usize {
    match graph.add_edge(a, b) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            debug!(error = %e, "Edge dropped");
            0
        }
    }
}
