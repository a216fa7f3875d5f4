use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Stable identity of an interactive entity, shared by every node in the cluster.
///
/// Issued once by the authoritative node's registry and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityIdentity(pub u32);

impl EntityIdentity {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Replicated movement state: position plus a yaw orientation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    pub position: Vec3,
    pub orientation: f32,
}

impl MovementState {
    pub fn new(position: Vec3, orientation: f32) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Unit vector the entity faces, in the XZ plane.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.orientation.cos(), 0.0, self.orientation.sin())
    }
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: 0.0,
        }
    }
}

/// Which storage an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Long-lived, identity-keyed (players).
    Interactive,
    /// High-churn, slot-indexed (collectibles).
    Pooled,
}
