use serde::{Deserialize, Serialize};
use shoal_assets::RepresentationHandle;
use shoal_common::MovementState;

/// A long-lived, player-controlled entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveEntity {
    pub name: String,
    pub representation: RepresentationHandle,
    pub movement: MovementState,
    /// Forward speed in units per second.
    pub speed: f32,
    /// Yaw rate in radians per second.
    pub turn_speed: f32,
    pub enabled: bool,
}

impl InteractiveEntity {
    pub fn new(
        name: impl Into<String>,
        representation: RepresentationHandle,
        movement: MovementState,
        speed: f32,
    ) -> Self {
        Self {
            name: name.into(),
            representation,
            movement,
            speed,
            turn_speed: 0.0,
            enabled: true,
        }
    }

    /// Advance by `dt` seconds: turn first, then move along the new heading.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        self.movement.orientation += self.turn_speed * dt;
        self.movement.position += self.movement.forward() * self.speed * dt;
    }
}
