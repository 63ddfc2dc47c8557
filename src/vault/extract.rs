//! Tag and wiki-link extraction from document text

use super::{VaultError, VaultResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// `#` followed by a maximal run of word characters
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid tag regex"));

/// `[[...]]` with no `]` inside
static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid reference regex"));

/// Structural metadata of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Bare tag text, without the marker
    pub tags: BTreeSet<String>,
    /// Reference names, verbatim
    pub references: BTreeSet<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.references.is_empty()
    }
}

/// Extract tags and references from document text
pub fn extract(content: &str) -> Metadata {
    let tags = TAG_PATTERN
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    let references = REFERENCE_PATTERN
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    Metadata { tags, references }
}

/// Read a document and extract its metadata
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected. Callers
/// treat an error as empty metadata after logging it.
pub fn read_metadata(path: &Path) -> VaultResult<Metadata> {
    let bytes = std::fs::read(path).map_err(|source| VaultError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(extract(&String::from_utf8_lossy(&bytes)))
}
