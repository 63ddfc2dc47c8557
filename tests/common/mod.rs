//! Common test utilities for vault integration tests
//!
//! This module provides a temporary vault builder and structural checks
//! shared by the integration suites.

#![allow(dead_code)]

pub mod checks;
pub mod vault;

pub use checks::{assert_graph_invariants, connected_components};
pub use vault::TestVault;
