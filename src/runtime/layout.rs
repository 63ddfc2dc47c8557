//! Periodic layout ticking

use super::CancellationToken;
use crate::engine::VaultEngine;
use crate::graph::NodeKey;
use crate::layout::{LayoutEngine, LayoutParam, LayoutResult, LayoutSnapshot, TickStats, Vec2};
use crate::query::FilterQuery;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct QueryState {
    query: FilterQuery,
    revision: u64,
}

/// Shared handle to a running layout
///
/// Clones refer to the same simulation. Interaction (pin, drag, parameter
/// and filter changes) goes through the same mutex as ticking, so it takes
/// effect between ticks, never inside one.
#[derive(Debug, Clone)]
pub struct LayoutHandle {
    layout: Arc<Mutex<LayoutEngine>>,
    query: Arc<Mutex<QueryState>>,
}

impl LayoutHandle {
    pub fn new(layout: LayoutEngine) -> Self {
        Self {
            layout: Arc::new(Mutex::new(layout)),
            query: Arc::new(Mutex::new(QueryState::default())),
        }
    }

    /// Pin a node where it is dropped; also used while dragging
    pub fn pin(&self, key: &NodeKey, position: Vec2) -> bool {
        self.layout.lock().pin(key, position)
    }

    /// Move a node under the pointer, pinning it if it was free
    pub fn drag(&self, key: &NodeKey, position: Vec2) -> bool {
        self.pin(key, position)
    }

    pub fn unpin(&self, key: &NodeKey) -> bool {
        self.layout.lock().unpin(key)
    }

    pub fn set_param(&self, param: LayoutParam, value: f64) -> LayoutResult<()> {
        self.layout.lock().set_param(param, value)?;
        info!(%param, value, "Layout parameter changed");
        Ok(())
    }

    /// Replace the active filter; the next tick re-syncs membership
    pub fn set_query(&self, query: FilterQuery) {
        let mut state = self.query.lock();
        if state.query != query {
            debug!(%query, "Filter changed");
            state.query = query;
            state.revision += 1;
        }
    }

    pub fn query(&self) -> FilterQuery {
        self.query.lock().query.clone()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        self.layout.lock().snapshot()
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_layout<R>(&self, f: impl FnOnce(&mut LayoutEngine) -> R) -> R {
        f(&mut self.layout.lock())
    }

    fn query_state(&self) -> (FilterQuery, u64) {
        let state = self.query.lock();
        (state.query.clone(), state.revision)
    }
}

/// Drives one [`LayoutHandle`] from one [`VaultEngine`]
///
/// Membership is re-synced only when the graph revision or the filter
/// revision moved since the last sync.
#[derive(Debug)]
pub struct LayoutDriver {
    engine: Arc<VaultEngine>,
    handle: LayoutHandle,
    synced: Option<(u64, u64)>,
}

impl LayoutDriver {
    pub fn new(engine: Arc<VaultEngine>, handle: LayoutHandle) -> Self {
        Self {
            engine,
            handle,
            synced: None,
        }
    }

    pub fn handle(&self) -> &LayoutHandle {
        &self.handle
    }

    /// Sync membership if needed, then tick once
    pub fn step(&mut self) -> TickStats {
        // Read the revision before building the view: a mutation landing in
        // between bumps it again and the next step re-syncs.
        let graph_revision = self.engine.revision();
        let (query, query_revision) = self.handle.query_state();
        let wanted = (graph_revision, query_revision);

        let view = (self.synced != Some(wanted)).then(|| self.engine.view(&query));

        let mut layout = self.handle.layout.lock();
        if let Some(view) = view {
            let diff = layout.sync(&view);
            if !diff.is_empty() {
                debug!(
                    added = diff.added.len(),
                    removed = diff.removed.len(),
                    "Layout membership changed"
                );
            }
            self.synced = Some(wanted);
        }
        layout.tick()
    }
}

/// Tick the layout behind `handle` every `period` until `cancel` fires
///
/// Late ticks are skipped rather than bunched. After every tick the new
/// snapshot is published on `snapshots`. Returns the number of ticks run.
pub async fn run_layout(
    engine: Arc<VaultEngine>,
    handle: LayoutHandle,
    period: Duration,
    cancel: CancellationToken,
    snapshots: watch::Sender<Arc<LayoutSnapshot>>,
) -> u64 {
    let mut driver = LayoutDriver::new(engine, handle);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        let stats = driver.step();
        ticks += 1;
        if stats.tick % 1000 == 0 {
            debug!(
                tick = stats.tick,
                moved = stats.moved,
                kinetic_energy = stats.kinetic_energy,
                "Layout progress"
            );
        }
        snapshots.send_replace(Arc::new(driver.handle.snapshot()));
    }

    info!(ticks, "Layout loop stopped");
    ticks
}
