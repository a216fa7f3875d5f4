//! Developer tooling: per-node inspection and cross-node divergence checks.
//!
//! # Invariants
//! - Tools only read game state.

mod inspector;

pub use inspector::{InteractiveInfo, NodeInspector, NodeSummary};
