//! Search-scoped subgraphs

use crate::graph::{GraphStore, NodeKey, NodeKind, TAG_MARKER};
use std::collections::BTreeSet;
use tracing::debug;

/// A parsed search query
///
/// Whitespace-separated terms. `#term` matches a tag exactly, anything else
/// is a case-insensitive substring of a node label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    raw: String,
    /// Tag terms, marker stripped
    tags: BTreeSet<String>,
    /// Free-text terms, lowercased
    text: BTreeSet<String>,
}

impl FilterQuery {
    pub fn parse(raw: &str) -> Self {
        let mut query = FilterQuery {
            raw: raw.trim().to_string(),
            ..Default::default()
        };
        for term in raw.split_whitespace() {
            match term.strip_prefix(TAG_MARKER) {
                Some("") => debug!(term, "Ignoring empty tag term"),
                Some(tag) => {
                    query.tags.insert(tag.to_string());
                }
                None => {
                    query.text.insert(term.to_lowercase());
                }
            }
        }
        query
    }

    /// True if the query has no usable terms (shows the whole graph)
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.text.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn text_terms(&self) -> impl Iterator<Item = &str> {
        self.text.iter().map(String::as_str)
    }

    /// Keys of every node the query selects
    ///
    /// A tag term selects the tag node (`#t`) and its bare mirror (`t`) plus
    /// every document adjacent to either. Free-text terms select only the
    /// nodes whose label matches, without neighbors.
    pub fn matching_keys(&self, graph: &GraphStore) -> BTreeSet<NodeKey> {
        let mut matched = BTreeSet::new();

        if !self.text.is_empty() {
            for node in graph.nodes() {
                let label = node.label.to_lowercase();
                if self.text.iter().any(|term| label.contains(term.as_str())) {
                    matched.insert(node.key.clone());
                }
            }
        }

        for tag in &self.tags {
            for key in [NodeKey::tag(tag), NodeKey::from(tag.as_str())] {
                match graph.kind(&key) {
                    Some(NodeKind::Document) | None => continue,
                    Some(_) => {}
                }
                let documents: Vec<NodeKey> = graph
                    .neighbors(&key)
                    .filter(|n| graph.kind(n) == Some(NodeKind::Document))
                    .cloned()
                    .collect();
                matched.insert(key);
                matched.extend(documents);
            }
        }
        matched
    }

    /// The induced subgraph on the matching nodes, or the whole graph for an
    /// empty query
    pub fn execute(&self, graph: &GraphStore) -> GraphStore {
        if self.is_empty() {
            return graph.clone();
        }
        let view = graph.induced_subgraph(&self.matching_keys(graph));
        debug!(
            query = %self,
            nodes = view.node_count(),
            edges = view.edge_count(),
            "Filtered graph"
        );
        view
    }
}

impl std::fmt::Display for FilterQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FilterQuery {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Parse `query` and apply it to `graph`
pub fn filter(graph: &GraphStore, query: &str) -> GraphStore {
    FilterQuery::parse(query).execute(graph)
}
