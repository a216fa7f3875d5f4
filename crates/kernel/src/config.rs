use serde::{Deserialize, Serialize};

/// Tunables for one node's simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of collectible slots allocated at startup.
    pub pool_capacity: usize,
    /// Maximum number of live interactive entities.
    pub max_interactive: usize,
    /// Distance from the origin at which new interactive entities appear.
    pub spawn_radius: f32,
    /// Forward speed given to new interactive entities.
    pub default_speed: f32,
    /// Representation name used for interactive entities.
    pub player_representation: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 300,
            max_interactive: 110,
            spawn_radius: 50.0,
            default_speed: 1.0,
            player_representation: "fish".into(),
        }
    }
}
