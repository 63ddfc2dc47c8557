//! VaultEngine: the lock-guarded graph of one vault
//!
//! Mutations (full scan, reconciliation) are serialized by a mutation mutex
//! held for their whole duration, file reads included. The graph itself sits
//! behind a read-write lock that a mutation only write-locks to swap or apply
//! its result, so readers (layout sync, filtering, snapshots) never wait on
//! disk IO and never observe a half-applied change.

use crate::graph::GraphStore;
use crate::query::FilterQuery;
use crate::vault::{
    FileChange, PreparedChange, ReconcileOutcome, ReconcileReport, Reconciler, ScanReport, VaultConfig,
    VaultResult, VaultScanner,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

#[derive(Debug)]
pub struct VaultEngine {
    root: PathBuf,
    scanner: VaultScanner,
    reconciler: Reconciler,
    graph: RwLock<GraphStore>,
    /// Held across each whole scan or reconciliation
    mutation: Mutex<()>,
    /// Bumped after every mutation that changed the graph
    revision: AtomicU64,
}

impl VaultEngine {
    /// Create an engine with an empty graph; call [`rescan`](Self::rescan) to load it
    pub fn new(root: impl Into<PathBuf>, config: VaultConfig) -> Self {
        let root = root.into();
        Self {
            scanner: VaultScanner::new(config.clone()),
            reconciler: Reconciler::new(config).with_root(&root),
            root,
            graph: RwLock::new(GraphStore::new()),
            mutation: Mutex::new(()),
            revision: AtomicU64::new(0),
        }
    }

    /// Create an engine and run the initial scan
    pub fn open(root: impl Into<PathBuf>, config: VaultConfig) -> VaultResult<(Self, ScanReport)> {
        let engine = Self::new(root, config);
        let report = engine.rescan()?;
        Ok((engine, report))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &VaultConfig {
        self.scanner.config()
    }

    /// Rebuild the whole graph from disk
    ///
    /// The new graph is built off-lock and swapped in atomically. If the root
    /// is missing the graph is emptied and the error returned.
    pub fn rescan(&self) -> VaultResult<ScanReport> {
        let _mutation = self.mutation.lock();
        match self.scanner.scan(&self.root) {
            Ok((fresh, report)) => {
                *self.graph.write() = fresh;
                self.bump();
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "Vault scan failed; showing an empty graph");
                self.graph.write().clear();
                self.bump();
                Err(e)
            }
        }
    }

    /// Reconcile one change notification
    ///
    /// A deleted document whose name is shadowed by another file falls back
    /// to that file, which is applied as a follow-up report. Fallback files
    /// are read before the write lock is taken, and the whole change is
    /// applied under a single write guard.
    pub fn apply_change(&self, change: FileChange) -> Vec<ReconcileReport> {
        let _mutation = self.mutation.lock();
        let prepared = self.reconciler.prepare(change);

        // The mutation lock keeps the graph fixed between this read and the write below
        let graph = self.graph.read();
        let candidates: Vec<PathBuf> = prepared
            .iter()
            .flat_map(|p| self.reconciler.fallback_candidates(&graph, p))
            .collect();
        drop(graph);

        let mut fallbacks: HashMap<PathBuf, PreparedChange> = candidates
            .into_iter()
            .map(|path| (path.clone(), self.reconciler.prepare_fallback(path)))
            .collect();

        let mut reports = Vec::new();
        {
            let mut graph = self.graph.write();
            for prepared in prepared {
                let mut next = Some(prepared);
                while let Some(prepared) = next.take() {
                    let report = self.reconciler.apply(&mut graph, prepared);
                    next = report.fallback.clone().map(|path| {
                        fallbacks
                            .remove(&path)
                            .unwrap_or_else(|| self.reconciler.prepare_fallback(path))
                    });
                    reports.push(report);
                }
            }
        }

        let changed = reports.iter().any(|r| {
            matches!(
                r.outcome,
                ReconcileOutcome::Updated | ReconcileOutcome::Removed
            )
        });
        if changed {
            self.bump();
        }
        for report in &reports {
            if report.outcome != ReconcileOutcome::Ignored {
                info!(
                    path = %report.path.display(),
                    outcome = ?report.outcome,
                    pruned = report.pruned.len(),
                    "Applied file change"
                );
            }
        }
        reports
    }

    /// Run `f` against the graph under the read lock
    pub fn with_graph<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        f(&self.graph.read())
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> GraphStore {
        self.graph.read().clone()
    }

    /// The displayed subgraph for `query`
    pub fn view(&self, query: &FilterQuery) -> GraphStore {
        query.execute(&self.graph.read())
    }

    /// Changes whenever the graph does; cheap to poll
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}
