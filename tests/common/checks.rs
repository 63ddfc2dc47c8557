//! Structural checks on vault graphs

use std::collections::{BTreeSet, VecDeque};
use vaultgraph::{EdgeKind, GraphStore, NodeKey};

/// Assert the invariants every vault graph must hold
///
/// - every edge touches a document and connects two known nodes
/// - adjacency is symmetric and loop-free
/// - no tag is left without a document
pub fn assert_graph_invariants(graph: &GraphStore) {
    for edge in graph.edges() {
        assert_ne!(edge.a, edge.b, "self-loop on {}", edge.a);
        let kind = graph
            .edge_kind(&edge)
            .unwrap_or_else(|| panic!("edge {:?} has an unknown endpoint", edge));
        assert_ne!(kind, EdgeKind::Other, "edge {:?} touches no document", edge);
        assert!(graph.has_edge(&edge.b, &edge.a), "asymmetric edge {:?}", edge);
    }
    for node in graph.nodes() {
        if !node.is_document() {
            assert!(
                graph.degree(&node.key) > 0,
                "orphaned non-document node {}",
                node.key
            );
        }
    }
}

/// Connected components, each as a sorted key set
pub fn connected_components(graph: &GraphStore) -> Vec<BTreeSet<NodeKey>> {
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();

    for start in graph.keys() {
        if seen.contains(start) {
            continue;
        }
        let mut component = BTreeSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        seen.insert(start.clone());
        while let Some(key) = queue.pop_front() {
            for neighbor in graph.neighbors(&key) {
                if seen.insert(neighbor.clone()) {
                    queue.push_back(neighbor.clone());
                }
            }
            component.insert(key);
        }
        components.push(component);
    }
    components
}
