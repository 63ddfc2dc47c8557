//! Undirected edge representation

use super::node::{NodeKey, NodeKind};
use serde::{Deserialize, Serialize};

/// Relationship type, derived from the kinds of the two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Document and one of its tags
    DocumentTag,
    /// Document and a document it references
    DocumentDocument,
    /// Document and the bare-text mirror of one of its tags
    DocumentStructure,
    /// Any other pairing
    Other,
}

impl EdgeKind {
    /// Classify an edge from its endpoint kinds (order irrelevant)
    pub fn between(a: NodeKind, b: NodeKind) -> Self {
        use NodeKind::*;
        match (a, b) {
            (Document, Document) => EdgeKind::DocumentDocument,
            (Document, Tag) | (Tag, Document) => EdgeKind::DocumentTag,
            (Document, Structure) | (Structure, Document) => EdgeKind::DocumentStructure,
            _ => EdgeKind::Other,
        }
    }
}

/// An unordered pair of node keys
///
/// The pair is normalized on construction (`a <= b`) so `Edge::new(x, y)`
/// and `Edge::new(y, x)` compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeKey,
    pub b: NodeKey,
}

impl Edge {
    pub fn new(x: NodeKey, y: NodeKey) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// True if `key` is one of the endpoints
    pub fn touches(&self, key: &NodeKey) -> bool {
        &self.a == key || &self.b == key
    }

    /// The endpoint opposite `key`, if `key` is an endpoint
    pub fn other(&self, key: &NodeKey) -> Option<&NodeKey> {
        if &self.a == key {
            Some(&self.b)
        } else if &self.b == key {
            Some(&self.a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_is_unordered() {
        let e1 = Edge::new("A.md".into(), "#x".into());
        let e2 = Edge::new("#x".into(), "A.md".into());
        assert_eq!(e1, e2);
        assert_eq!(e1.other(&"A.md".into()), Some(&NodeKey::from("#x")));
        assert!(e1.touches(&"#x".into()));
        assert_eq!(e1.other(&"B.md".into()), None);
    }

    #[test]
    fn kind_follows_endpoints() {
        assert_eq!(
            EdgeKind::between(NodeKind::Tag, NodeKind::Document),
            EdgeKind::DocumentTag
        );
        assert_eq!(
            EdgeKind::between(NodeKind::Document, NodeKind::Document),
            EdgeKind::DocumentDocument
        );
        assert_eq!(
            EdgeKind::between(NodeKind::Structure, NodeKind::Document),
            EdgeKind::DocumentStructure
        );
        assert_eq!(EdgeKind::between(NodeKind::Tag, NodeKind::Tag), EdgeKind::Other);
    }
}
