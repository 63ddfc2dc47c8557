//! Vaultgraph: live knowledge graph of a markdown vault
//!
//! Builds an undirected graph from a directory of markdown documents, keeps
//! it current as files change, and lays it out with a force-directed
//! simulation.
//!
//! # Core Concepts
//!
//! - **Documents**: one node per markdown file, keyed by file name
//! - **Tags**: one node per `#tag`, linked to every document mentioning it
//! - **References**: `[[Other]]` wiki links, resolved to `Other.md`
//! - **Views**: filtered subgraphs selected by a search query
//!
//! # Example
//!
//! ```
//! use vaultgraph::{filter, GraphStore, Node, NodeKey};
//!
//! let mut graph = GraphStore::new();
//! let doc = graph.upsert_node(Node::document("Plan.md").unwrap());
//! let tag = graph.upsert_node(Node::tag("urgent"));
//! graph.add_edge(&doc, &tag).unwrap();
//!
//! let view = filter(&graph, "#urgent");
//! assert!(view.contains(&NodeKey::from("Plan.md")));
//! ```

pub mod config;
pub mod engine;
mod graph;
pub mod layout;
pub mod query;
pub mod runtime;
pub mod vault;
pub mod watch;

pub use config::{ConfigError, ConfigResult, Settings};
pub use engine::VaultEngine;
pub use graph::{
    Edge, EdgeKind, GraphError, GraphResult, GraphStore, Node, NodeKey, NodeKind, TAG_MARKER,
};
pub use layout::{LayoutEngine, LayoutError, LayoutParams, LayoutSnapshot, Vec2};
pub use query::{filter, FilterQuery};
pub use runtime::{CancellationToken, LayoutDriver, LayoutHandle};
pub use vault::{FileChange, VaultConfig, VaultError, VaultScanner};
pub use watch::{WatchBridge, WatchError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
