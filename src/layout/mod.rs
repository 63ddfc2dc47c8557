//! Force-directed layout
//!
//! [`LayoutEngine`] owns a position and velocity per displayed node and
//! advances them one [`tick`](LayoutEngine::tick) at a time:
//!
//! - springs along edges pull or push each pair toward a preferred distance
//!   chosen by endpoint kind (tags closest, then documents, then the rest)
//! - every pair closer than the cutoff radius repels with inverse-square force
//! - velocity is damped each tick, which is what makes the system settle
//!
//! Pinned nodes are held where the user put them but still exert forces.

mod engine;
mod params;
mod state;

pub use engine::{EdgeGeometry, LayoutEngine, LayoutSnapshot, MembershipDiff, TickStats};
pub use params::{LayoutParam, LayoutParams, ParamOverride};
pub use state::{LayoutState, Vec2};

use thiserror::Error;

/// Errors raised when configuring the layout
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Unknown layout parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid value {value} for {param}: {reason}")]
    InvalidParameter {
        param: LayoutParam,
        value: f64,
        reason: &'static str,
    },

    #[error("Malformed parameter override '{0}', expected name=value")]
    MalformedOverride(String),
}

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;
