//! Shared types for the shoal cluster simulation.
//!
//! # Invariants
//! - Types here are plain data: no behavior that depends on node role.

mod types;

pub use types::{EntityIdentity, EntityKind, MovementState};
