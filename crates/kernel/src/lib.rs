//! Game kernel: interactive entities, their identity registry, and the
//! per-node game state that owns them alongside the collectible pool.
//!
//! # Invariants
//! - Identities are issued once and never recycled.
//! - Every structural change made on the authoritative node is journaled
//!   until the next replication frame drains it.
//! - Only the authoritative node simulates; other nodes take state from snapshots.

pub mod config;
pub mod entity;
pub mod game;
pub mod registry;

pub use config::SimulationConfig;
pub use entity::InteractiveEntity;
pub use game::{GameState, KernelError, LifecycleEvent};
pub use registry::{IdentityRegistry, RegistryError};
