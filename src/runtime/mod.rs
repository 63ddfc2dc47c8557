//! Background tasks tying the vault engine to the layout
//!
//! Two loops run under tokio:
//!
//! - the reconciler drains a bounded queue of [`FileChange`]s in arrival
//!   order and applies each through [`VaultEngine::apply_change`];
//! - the layout loop ([`run_layout`]) ticks the simulation on a fixed period,
//!   re-syncing membership whenever the graph or the filter has changed.
//!
//! Producers (the filesystem watcher, tests) only ever see the sender half of
//! the queue.

mod cancel;
mod layout;

pub use cancel::CancellationToken;
pub use layout::{run_layout, LayoutDriver, LayoutHandle};

use crate::engine::VaultEngine;
use crate::vault::FileChange;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default capacity of the change queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub type ChangeSender = mpsc::Sender<FileChange>;
pub type ChangeReceiver = mpsc::Receiver<FileChange>;

/// Bounded queue between change producers and the reconciler
pub fn change_channel(capacity: usize) -> (ChangeSender, ChangeReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Apply queued changes one at a time until every sender is dropped
///
/// File reads block, so each change runs on the blocking pool; the next one
/// is not started before the previous one has been applied. The task returns
/// the number of changes it processed.
pub fn spawn_reconciler(engine: Arc<VaultEngine>, mut rx: ChangeReceiver) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut processed = 0;
        while let Some(change) = rx.recv().await {
            debug!(%change, "Reconciling");
            let engine = Arc::clone(&engine);
            match tokio::task::spawn_blocking(move || engine.apply_change(change)).await {
                Ok(_) => processed += 1,
                Err(e) => warn!(error = %e, "Reconcile task failed"),
            }
        }
        debug!(processed, "Change queue closed");
        processed
    })
}
