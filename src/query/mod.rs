//! Query system for vault graphs
//!
//! Search queries select an induced subgraph for display.

mod filter;

pub use filter::{filter, FilterQuery};
