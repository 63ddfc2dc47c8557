//! LayoutEngine: stepped spring/repulsion simulation

use super::params::{LayoutParam, LayoutParams};
use super::state::{LayoutState, Vec2};
use super::LayoutResult;
use crate::graph::{Edge, EdgeKind, GraphStore, NodeKey, NodeKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Current endpoint positions of one edge, recomputed as nodes move
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeGeometry {
    pub a: NodeKey,
    pub b: NodeKey,
    pub kind: EdgeKind,
    pub from: Vec2,
    pub to: Vec2,
}

/// Read-only view of the layout for the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    /// Ticks run so far
    pub tick: u64,
    pub positions: BTreeMap<NodeKey, Vec2>,
    pub edges: Vec<EdgeGeometry>,
}

/// Nodes whose layout state was created or dropped by a [`LayoutEngine::sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub added: Vec<NodeKey>,
    pub removed: Vec<NodeKey>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Motion summary of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickStats {
    pub tick: u64,
    /// Free nodes integrated this tick
    pub moved: usize,
    /// Sum of `|v|² / 2` over moved nodes
    pub kinetic_energy: f64,
    pub max_displacement: f64,
}

/// Owns per-node layout state and advances it one tick at a time
///
/// Ticks use Jacobi ordering: every force is computed from the positions held
/// at the start of the tick, then all free nodes are integrated. The result of
/// a tick is therefore independent of node iteration order.
#[derive(Debug)]
pub struct LayoutEngine {
    params: LayoutParams,
    states: BTreeMap<NodeKey, LayoutState>,
    kinds: BTreeMap<NodeKey, NodeKind>,
    edges: Vec<Edge>,
    /// Per node, indices into `edges` / `geometry`
    incident: BTreeMap<NodeKey, Vec<usize>>,
    geometry: Vec<EdgeGeometry>,
    rng: StdRng,
    ticks: u64,
}

impl LayoutEngine {
    pub fn new(params: LayoutParams) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Engine whose random seeding is reproducible
    pub fn with_seed(params: LayoutParams, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: LayoutParams, rng: StdRng) -> Self {
        Self {
            params,
            states: BTreeMap::new(),
            kinds: BTreeMap::new(),
            edges: Vec::new(),
            incident: BTreeMap::new(),
            geometry: Vec::new(),
            rng,
            ticks: 0,
        }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Change one parameter; takes effect on the next tick
    pub fn set_param(&mut self, param: LayoutParam, value: f64) -> LayoutResult<()> {
        self.params.set(param, value)
    }

    /// Replace all parameters after validating them
    pub fn set_params(&mut self, params: LayoutParams) -> LayoutResult<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn state(&self, key: &NodeKey) -> Option<&LayoutState> {
        self.states.get(key)
    }

    pub fn position(&self, key: &NodeKey) -> Option<Vec2> {
        self.states.get(key).map(|s| s.position)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Adopt `view` as the displayed graph
    ///
    /// Nodes that left the view lose their state, nodes that stayed keep it
    /// untouched, and new nodes are seeded near the centroid of their
    /// already-placed neighbors (or at a random point when they have none).
    pub fn sync(&mut self, view: &GraphStore) -> MembershipDiff {
        let mut diff = MembershipDiff::default();

        let displayed: BTreeSet<&NodeKey> = view.keys().collect();
        self.states.retain(|key, _| {
            let keep = displayed.contains(key);
            if !keep {
                diff.removed.push(key.clone());
            }
            keep
        });

        self.kinds = view.nodes().map(|n| (n.key.clone(), n.kind)).collect();
        self.edges = view.edges().collect();
        self.incident.clear();
        for (i, edge) in self.edges.iter().enumerate() {
            self.incident.entry(edge.a.clone()).or_default().push(i);
            self.incident.entry(edge.b.clone()).or_default().push(i);
        }

        for key in view.keys() {
            if self.states.contains_key(key) {
                continue;
            }
            let position = self.seed_position(view, key);
            self.states.insert(key.clone(), LayoutState::at(position));
            diff.added.push(key.clone());
        }

        self.geometry = self
            .edges
            .iter()
            .map(|edge| {
                let from = self.position(&edge.a).unwrap_or_default();
                let to = self.position(&edge.b).unwrap_or_default();
                EdgeGeometry {
                    a: edge.a.clone(),
                    b: edge.b.clone(),
                    kind: view.edge_kind(edge).unwrap_or(EdgeKind::Other),
                    from,
                    to,
                }
            })
            .collect();

        if !diff.is_empty() {
            debug!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                displayed = self.states.len(),
                "Layout membership changed"
            );
        }
        diff
    }

    fn seed_position(&mut self, view: &GraphStore, key: &NodeKey) -> Vec2 {
        let placed: Vec<Vec2> = view
            .neighbors(key)
            .filter_map(|n| self.states.get(n).map(|s| s.position))
            .collect();
        if placed.is_empty() {
            let radius = self.params.seed_radius;
            return self.scatter(radius);
        }
        let sum = placed.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        let centroid = sum * (1.0 / placed.len() as f64);
        let jitter = self.params.seed_jitter;
        centroid + self.scatter(jitter)
    }

    /// Uniform random offset within `[-radius, radius]²`
    fn scatter(&mut self, radius: f64) -> Vec2 {
        if radius <= 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new(
            self.rng.gen_range(-radius..=radius),
            self.rng.gen_range(-radius..=radius),
        )
    }

    /// Hold a node at `position` until [`unpin`](Self::unpin)
    ///
    /// Sets the flag and the position together. Calling it again while pinned
    /// moves the node (dragging). Returns `false` for unknown keys.
    pub fn pin(&mut self, key: &NodeKey, position: Vec2) -> bool {
        let Some(state) = self.states.get_mut(key) else {
            return false;
        };
        state.pinned = true;
        state.position = position;
        self.refresh_incident(key);
        true
    }

    /// Release a pinned node; it resumes from rest
    pub fn unpin(&mut self, key: &NodeKey) -> bool {
        let Some(state) = self.states.get_mut(key) else {
            return false;
        };
        state.pinned = false;
        state.velocity = Vec2::ZERO;
        true
    }

    /// Move a free node and stop it, without pinning
    pub fn place(&mut self, key: &NodeKey, position: Vec2) -> bool {
        let Some(state) = self.states.get_mut(key) else {
            return false;
        };
        state.position = position;
        state.velocity = Vec2::ZERO;
        self.refresh_incident(key);
        true
    }

    /// Advance every free node by one simulation step
    pub fn tick(&mut self) -> TickStats {
        let forces = self.forces();
        let damping = self.params.velocity_damping;
        let mut stats = TickStats::default();

        for (key, force) in forces {
            let Some(state) = self.states.get_mut(&key) else {
                continue;
            };
            state.velocity = (state.velocity + force) * damping;
            let step = state.velocity;
            state.position += step;

            stats.moved += 1;
            stats.kinetic_energy += 0.5 * step.length_squared();
            stats.max_displacement = stats.max_displacement.max(step.length());
            self.refresh_incident(&key);
        }

        self.ticks += 1;
        stats.tick = self.ticks;
        stats
    }

    /// Net force on every free node, from start-of-tick positions
    fn forces(&self) -> Vec<(NodeKey, Vec2)> {
        let p = &self.params;
        let mut forces = Vec::with_capacity(self.states.len());

        for (key, state) in &self.states {
            if state.pinned {
                continue;
            }
            let here = state.position;
            let kind = self.kinds.get(key).copied().unwrap_or(NodeKind::Structure);
            let mut force = Vec2::ZERO;

            // Springs: pull when longer than preferred, push when shorter
            for &i in self.incident.get(key).into_iter().flatten() {
                let Some(other) = self.edges[i].other(key) else {
                    continue;
                };
                let Some(there) = self.states.get(other).map(|s| s.position) else {
                    continue;
                };
                let other_kind = self.kinds.get(other).copied().unwrap_or(NodeKind::Structure);
                let delta = there - here;
                let d = delta.length().max(p.min_distance);
                let stretch = (d - p.preferred_distance(kind, other_kind)) * p.spring_strength;
                force += delta * (stretch / d);
            }

            // Repulsion from every displayed node inside the cutoff radius
            for (other, other_state) in &self.states {
                if other == key {
                    continue;
                }
                let delta = other_state.position - here;
                let d = delta.length().max(p.min_distance);
                if d < p.repulsion_cutoff_radius {
                    let push = p.repulsion_strength / (d * d);
                    force -= delta * (push / d);
                }
            }

            if p.center_strength > 0.0 {
                force -= here * p.center_strength;
            }

            forces.push((key.clone(), force));
        }
        forces
    }

    fn refresh_incident(&mut self, key: &NodeKey) {
        let Some(indices) = self.incident.get(key) else {
            return;
        };
        for &i in indices {
            let edge = &self.edges[i];
            if let (Some(a), Some(b)) = (self.states.get(&edge.a), self.states.get(&edge.b)) {
                self.geometry[i].from = a.position;
                self.geometry[i].to = b.position;
            }
        }
    }

    /// Current edge endpoint positions
    pub fn edge_geometry(&self) -> &[EdgeGeometry] {
        &self.geometry
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            tick: self.ticks,
            positions: self
                .states
                .iter()
                .map(|(k, s)| (k.clone(), s.position))
                .collect(),
            edges: self.geometry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    fn pair() -> GraphStore {
        let mut g = GraphStore::new();
        let a = g.upsert_node(Node::document("A.md").unwrap());
        let b = g.upsert_node(Node::document("B.md").unwrap());
        g.add_edge(&a, &b).unwrap();
        g
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::with_seed(LayoutParams::default(), 7)
    }

    #[test]
    fn sync_creates_and_drops_state() {
        let mut layout = engine();
        let diff = layout.sync(&pair());
        assert_eq!(diff.added.len(), 2);
        assert_eq!(layout.edge_geometry().len(), 1);

        let diff = layout.sync(&GraphStore::new());
        assert_eq!(diff.removed.len(), 2);
        assert!(layout.is_empty());
        assert!(layout.edge_geometry().is_empty());
    }

    #[test]
    fn new_neighbor_is_seeded_near_placed_neighbors() {
        let mut g = GraphStore::new();
        let a = g.upsert_node(Node::document("A.md").unwrap());
        let mut layout = engine();
        layout.sync(&g);
        layout.place(&a, Vec2::new(1000.0, -1000.0));

        let t = g.upsert_node(Node::tag("x"));
        g.add_edge(&a, &t).unwrap();
        let diff = layout.sync(&g);
        assert_eq!(diff.added, vec![t.clone()]);

        let seeded = layout.position(&t).unwrap();
        let jitter = layout.params().seed_jitter;
        assert!((seeded.x - 1000.0).abs() <= jitter);
        assert!((seeded.y + 1000.0).abs() <= jitter);
    }

    #[test]
    fn unconnected_nodes_are_seeded_within_radius() {
        let mut g = GraphStore::new();
        for i in 0..20 {
            g.upsert_node(Node::document(format!("{}.md", i)).unwrap());
        }
        let mut layout = engine();
        layout.sync(&g);
        let r = layout.params().seed_radius;
        for pos in layout.snapshot().positions.values() {
            assert!(pos.x.abs() <= r && pos.y.abs() <= r);
        }
    }

    #[test]
    fn pinned_node_does_not_move_but_pulls_its_neighbor() {
        let mut layout = engine();
        layout.sync(&pair());
        let a = NodeKey::from("A.md");
        let b = NodeKey::from("B.md");
        assert!(layout.pin(&a, Vec2::ZERO));
        layout.place(&b, Vec2::new(900.0, 0.0));

        for _ in 0..100 {
            layout.tick();
        }
        assert_eq!(layout.position(&a), Some(Vec2::ZERO));
        let b_pos = layout.position(&b).unwrap();
        assert!(b_pos.x < 900.0);
        assert!(layout.state(&a).unwrap().velocity == Vec2::ZERO);
    }

    #[test]
    fn unpin_resumes_from_rest() {
        let mut layout = engine();
        layout.sync(&pair());
        let a = NodeKey::from("A.md");
        layout.pin(&a, Vec2::new(5.0, 5.0));
        assert!(layout.state(&a).unwrap().pinned);
        assert!(layout.unpin(&a));
        let state = layout.state(&a).unwrap();
        assert!(!state.pinned);
        assert_eq!(state.velocity, Vec2::ZERO);
        assert_eq!(state.position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn pinning_unknown_keys_is_refused() {
        let mut layout = engine();
        assert!(!layout.pin(&"ghost.md".into(), Vec2::ZERO));
        assert!(!layout.unpin(&"ghost.md".into()));
    }

    #[test]
    fn close_nodes_repel() {
        let mut g = GraphStore::new();
        let a = g.upsert_node(Node::document("A.md").unwrap());
        let b = g.upsert_node(Node::document("B.md").unwrap());
        let mut layout = engine();
        layout.sync(&g);
        layout.place(&a, Vec2::new(-5.0, 0.0));
        layout.place(&b, Vec2::new(5.0, 0.0));

        layout.tick();
        assert!(layout.position(&a).unwrap().x < -5.0);
        assert!(layout.position(&b).unwrap().x > 5.0);
    }

    #[test]
    fn nodes_beyond_cutoff_do_not_interact() {
        let mut g = GraphStore::new();
        let a = g.upsert_node(Node::document("A.md").unwrap());
        let b = g.upsert_node(Node::document("B.md").unwrap());
        let mut layout = engine();
        layout.sync(&g);
        layout.place(&a, Vec2::new(-100.0, 0.0));
        layout.place(&b, Vec2::new(100.0, 0.0));

        let stats = layout.tick();
        assert_eq!(stats.moved, 2);
        assert_eq!(stats.kinetic_energy, 0.0);
        assert_eq!(layout.position(&a), Some(Vec2::new(-100.0, 0.0)));
    }

    #[test]
    fn geometry_follows_node_positions() {
        let mut layout = engine();
        layout.sync(&pair());
        let a = NodeKey::from("A.md");
        let b = NodeKey::from("B.md");
        layout.place(&a, Vec2::new(0.0, 0.0));
        layout.place(&b, Vec2::new(700.0, 0.0));
        layout.tick();

        let geometry = &layout.edge_geometry()[0];
        assert_eq!(geometry.kind, EdgeKind::DocumentDocument);
        assert_eq!(Some(geometry.from), layout.position(&geometry.a));
        assert_eq!(Some(geometry.to), layout.position(&geometry.b));
    }

    #[test]
    fn parameter_changes_apply_on_next_tick() {
        let mut layout = engine();
        layout.sync(&pair());
        let a = NodeKey::from("A.md");
        let b = NodeKey::from("B.md");
        layout.place(&a, Vec2::new(0.0, 0.0));
        layout.place(&b, Vec2::new(300.0, 0.0));

        // At the default preferred distance a document pair is at rest
        assert_eq!(layout.tick().kinetic_energy, 0.0);

        layout
            .set_param(LayoutParam::DocumentLinkDistance, 100.0)
            .unwrap();
        layout.tick();
        assert!(layout.position(&a).unwrap().x > 0.0);
    }

    #[test]
    fn center_pull_is_off_by_default_and_pulls_when_enabled() {
        let mut g = GraphStore::new();
        let a = g.upsert_node(Node::document("A.md").unwrap());
        let mut layout = engine();
        layout.sync(&g);
        layout.place(&a, Vec2::new(100.0, 0.0));
        layout.tick();
        assert_eq!(layout.position(&a), Some(Vec2::new(100.0, 0.0)));

        layout.set_param(LayoutParam::CenterStrength, 0.01).unwrap();
        layout.tick();
        assert!(layout.position(&a).unwrap().x < 100.0);
    }
}
