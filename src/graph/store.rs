//! GraphStore: the typed, simple, undirected vault graph

use super::edge::{Edge, EdgeKind};
use super::node::{Node, NodeKey, NodeKind};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors that can occur when mutating the graph
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Edge endpoint not found: {0}")]
    MissingEndpoint(NodeKey),

    #[error("Self-loop rejected on {0}")]
    SelfLoop(NodeKey),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Nodes plus per-node adjacency sets
///
/// The adjacency sets are the only edge storage: every edge `{a, b}` appears
/// as `b` in `a`'s set and `a` in `b`'s set. Every key in the adjacency map
/// is also in the node map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStore {
    nodes: BTreeMap<NodeKey, Node>,
    adjacency: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or replace the stored node with the same key
    ///
    /// Replacing keeps the node's existing edges.
    pub fn upsert_node(&mut self, node: Node) -> NodeKey {
        let key = node.key.clone();
        self.adjacency.entry(key.clone()).or_default();
        self.nodes.insert(key.clone(), node);
        key
    }

    /// Insert a node only if its key is absent
    pub fn ensure_node(&mut self, node: Node) -> NodeKey {
        if self.nodes.contains_key(&node.key) {
            node.key
        } else {
            self.upsert_node(node)
        }
    }

    /// Add the undirected edge `{a, b}`
    ///
    /// Returns `Ok(false)` if the edge already existed.
    pub fn add_edge(&mut self, a: &NodeKey, b: &NodeKey) -> GraphResult<bool> {
        if a == b {
            return Err(GraphError::SelfLoop(a.clone()));
        }
        for key in [a, b] {
            if !self.nodes.contains_key(key) {
                return Err(GraphError::MissingEndpoint(key.clone()));
            }
        }
        let inserted = self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b.clone()).or_default().insert(a.clone());
        Ok(inserted)
    }

    /// Remove the edge `{a, b}`, returning whether it existed
    pub fn remove_edge(&mut self, a: &NodeKey, b: &NodeKey) -> bool {
        let removed = self
            .adjacency
            .get_mut(a)
            .map(|set| set.remove(b))
            .unwrap_or(false);
        if let Some(set) = self.adjacency.get_mut(b) {
            set.remove(a);
        }
        removed
    }

    /// Remove a node and all its incident edges
    ///
    /// Returns the removed node together with its former neighbors.
    pub fn remove_node(&mut self, key: &NodeKey) -> Option<(Node, BTreeSet<NodeKey>)> {
        let node = self.nodes.remove(key)?;
        let neighbors = self.adjacency.remove(key).unwrap_or_default();
        for neighbor in &neighbors {
            if let Some(set) = self.adjacency.get_mut(neighbor) {
                set.remove(key);
            }
        }
        Some((node, neighbors))
    }

    /// Remove every candidate that is not a document and has no edges left
    ///
    /// Returns the keys that were pruned.
    pub fn prune_orphans<'a>(
        &mut self,
        candidates: impl IntoIterator<Item = &'a NodeKey>,
    ) -> Vec<NodeKey> {
        let mut pruned = Vec::new();
        for key in candidates {
            let orphaned = self
                .nodes
                .get(key)
                .map(|n| !n.is_document() && self.degree(key) == 0)
                .unwrap_or(false);
            if orphaned {
                self.remove_node(key);
                pruned.push(key.clone());
            }
        }
        pruned
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Mutable access to a stored node
    ///
    /// The key must not be changed through this reference.
    pub fn node_mut(&mut self, key: &NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn kind(&self, key: &NodeKey) -> Option<NodeKind> {
        self.nodes.get(key).map(|n| n.kind)
    }

    /// All nodes, ordered by key
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node keys, ordered
    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    /// Neighbors of a node (empty if the node is absent)
    pub fn neighbors(&self, key: &NodeKey) -> impl Iterator<Item = &NodeKey> {
        self.adjacency.get(key).into_iter().flatten()
    }

    pub fn degree(&self, key: &NodeKey) -> usize {
        self.adjacency.get(key).map(|s| s.len()).unwrap_or(0)
    }

    pub fn has_edge(&self, a: &NodeKey, b: &NodeKey) -> bool {
        self.adjacency.get(a).map(|s| s.contains(b)).unwrap_or(false)
    }

    /// Every edge exactly once
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().flat_map(|(a, set)| {
            set.iter()
                .filter(move |b| a < *b)
                .map(move |b| Edge::new(a.clone(), b.clone()))
        })
    }

    /// Relationship type of an edge, or `None` if an endpoint is unknown
    pub fn edge_kind(&self, edge: &Edge) -> Option<EdgeKind> {
        Some(EdgeKind::between(self.kind(&edge.a)?, self.kind(&edge.b)?))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|s| s.len()).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.adjacency.clear();
    }

    /// Copy of the subgraph induced by `keys`
    ///
    /// Unknown keys are ignored; an edge is kept only when both endpoints are
    /// in the set.
    pub fn induced_subgraph(&self, keys: &BTreeSet<NodeKey>) -> GraphStore {
        let mut sub = GraphStore::new();
        for key in keys {
            if let Some(node) = self.nodes.get(key) {
                sub.upsert_node(node.clone());
            }
        }
        for key in keys {
            let Some(set) = self.adjacency.get(key) else {
                continue;
            };
            let kept: BTreeSet<NodeKey> = set.intersection(keys).cloned().collect();
            sub.adjacency.insert(key.clone(), kept);
        }
        sub
    }

    /// Document nodes, ordered by key
    pub fn documents(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_document())
    }
}
