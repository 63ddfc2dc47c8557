//! Core graph data structures

mod edge;
mod node;
mod store;


pub use edge::{Edge, EdgeKind};
pub use node::{Node, NodeKey, NodeKind, TAG_MARKER};
pub use store::{GraphError, GraphResult, GraphStore};
