//! Node representation in the vault graph

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Marker character that introduces a tag in document text and prefixes tag keys
pub const TAG_MARKER: char = '#';

/// Unique identifier for a node
///
/// Documents are keyed by file name (`notes.md`), tags by the marker-prefixed
/// text (`#urgent`). Tag text is made of word characters only, so a tag key
/// can never equal a document key, which always carries an extension dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Create a NodeKey from a string
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key of the tag node for bare tag text (`urgent` -> `#urgent`)
    pub fn tag(text: &str) -> Self {
        Self(format!("{}{}", TAG_MARKER, text))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the key is in the tag key space
    pub fn is_tag_key(&self) -> bool {
        self.0.starts_with(TAG_MARKER)
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Node kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// One source text file
    Document,
    /// Marker-prefixed keyword (`#x`)
    Tag,
    /// Bare-text mirror of a tag (`x`), only present when mirroring is enabled
    Structure,
}

/// A node in the vault graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique key
    pub key: NodeKey,
    /// Document, tag or structure
    pub kind: NodeKind,
    /// Display label: file name for documents, bare text for tags
    pub label: String,
    /// Source path (documents only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Raw outbound reference names (documents only), resolved or not
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub references: BTreeSet<String>,
    /// Earlier files with the same name, hidden behind `path` (documents only)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub shadowed: BTreeSet<PathBuf>,
}

impl Node {
    /// Create a document node keyed and labelled by the file name of `path`
    ///
    /// Returns `None` if the path has no file name.
    pub fn document(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_string_lossy().to_string();
        Some(Self {
            key: NodeKey::from_string(name.clone()),
            kind: NodeKind::Document,
            label: name,
            path: Some(path.to_path_buf()),
            references: BTreeSet::new(),
            shadowed: BTreeSet::new(),
        })
    }

    /// Create a tag node from bare tag text
    pub fn tag(text: &str) -> Self {
        Self {
            key: NodeKey::tag(text),
            kind: NodeKind::Tag,
            label: text.to_string(),
            path: None,
            references: BTreeSet::new(),
            shadowed: BTreeSet::new(),
        }
    }

    /// Create the bare-text structure node mirroring a tag
    pub fn bare_tag(text: &str) -> Self {
        Self {
            key: NodeKey::from_string(text),
            kind: NodeKind::Structure,
            label: text.to_string(),
            path: None,
            references: BTreeSet::new(),
            shadowed: BTreeSet::new(),
        }
    }

    /// Record the document's outbound reference names
    pub fn with_references(mut self, references: BTreeSet<String>) -> Self {
        self.references = references;
        self
    }

    /// Override the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_document(&self) -> bool {
        self.kind == NodeKind::Document
    }

    /// Logical name other documents use to reference this one
    /// (`notes.md` -> `notes`).
    pub fn stem(&self) -> Option<&str> {
        if !self.is_document() {
            return None;
        }
        let key = self.key.as_str();
        Some(key.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_node_uses_file_name() {
        let node = Node::document("/vault/sub/Daily Note.md").unwrap();
        assert_eq!(node.key.as_str(), "Daily Note.md");
        assert_eq!(node.label, "Daily Note.md");
        assert_eq!(node.stem(), Some("Daily Note"));
        assert_eq!(node.kind, NodeKind::Document);
    }

    #[test]
    fn tag_and_document_keys_never_collide() {
        let tag = Node::tag("md");
        let doc = Node::document("md.md").unwrap();
        let bare = Node::bare_tag("md");
        assert_ne!(tag.key, doc.key);
        assert_ne!(bare.key, doc.key);
        assert_ne!(bare.key, tag.key);
        assert!(tag.key.is_tag_key());
        assert!(!bare.key.is_tag_key());
    }

    #[test]
    fn node_key_serializes_as_string() {
        let key = NodeKey::tag("urgent");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"#urgent\"");
    }

    #[test]
    fn tags_have_no_stem() {
        assert_eq!(Node::tag("x").stem(), None);
    }
}
