use glam::Vec3;
use serde::{Deserialize, Serialize};
use shoal_assets::{CatalogError, RepresentationHandle, RepresentationProvider};
use shoal_common::{EntityIdentity, MovementState};
use shoal_pool::{PoolError, PooledEntityAllocator};

use crate::config::SimulationConfig;
use crate::entity::InteractiveEntity;
use crate::registry::{IdentityRegistry, RegistryError};

/// Errors from game state operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("interactive entity limit of {max} reached")]
    TooManyInteractive { max: usize },
    #[error("collectible slot {slot} is not active ({active} active)")]
    InactiveSlot { slot: usize, active: usize },
    #[error("collectible would land in slot {actual}, expected {expected}")]
    SlotMismatch { expected: usize, actual: usize },
}

/// A structural change the authoritative node must announce to the cluster.
///
/// Creation of interactive entities is not journaled: a state record for an
/// unknown identity is enough for other nodes to create it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    InteractiveDestroyed(EntityIdentity),
    /// A collectible was activated and landed in `slot`.
    PooledAcquired { slot: usize, position: Vec3 },
    /// The collectible at `slot` was deactivated; the last active slot moved into it.
    PooledReleased(usize),
}

/// Everything one node simulates: players, the collectible pool, and the
/// journal of structural changes since the last replication frame.
///
/// Explicitly constructed and passed to the simulation and replication
/// layers; there is no global instance.
#[derive(Debug, Clone)]
pub struct GameState {
    config: SimulationConfig,
    registry: IdentityRegistry<InteractiveEntity>,
    pool: PooledEntityAllocator,
    player_representation: RepresentationHandle,
    journal: Vec<LifecycleEvent>,
    last_time: Option<f64>,
    tick: u64,
}

impl GameState {
    /// Build a node's state. The pool cycles through every non-player
    /// representation of `provider`.
    pub fn new(
        config: SimulationConfig,
        provider: &impl RepresentationProvider,
    ) -> Result<Self, KernelError> {
        let player_representation = provider
            .lookup(&config.player_representation)
            .ok_or_else(|| {
                CatalogError::MissingRepresentation(config.player_representation.clone())
            })?;
        let pool = PooledEntityAllocator::from_provider(config.pool_capacity, provider)?;

        Ok(Self {
            config,
            registry: IdentityRegistry::new(),
            pool,
            player_representation,
            journal: Vec::new(),
            last_time: None,
            tick: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &IdentityRegistry<InteractiveEntity> {
        &self.registry
    }

    pub fn pool(&self) -> &PooledEntityAllocator {
        &self.pool
    }

    /// Number of simulation steps taken.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Create a player and return its identity.
    pub fn create_interactive_entity(
        &mut self,
        name: &str,
    ) -> Result<EntityIdentity, KernelError> {
        if self.registry.len() >= self.config.max_interactive {
            return Err(KernelError::TooManyInteractive {
                max: self.config.max_interactive,
            });
        }
        let id = self.registry.next_identity()?;
        let movement = spawn_point(id, self.config.spawn_radius);
        let entity = InteractiveEntity::new(
            name,
            self.player_representation,
            movement,
            self.config.default_speed,
        );
        self.registry.insert(id, entity)?;
        tracing::info!(%id, name, "interactive entity created");
        Ok(id)
    }

    /// Create the local copy of an entity first seen in a replicated snapshot.
    pub fn insert_shadow(
        &mut self,
        id: EntityIdentity,
        movement: MovementState,
    ) -> Result<(), KernelError> {
        let entity =
            InteractiveEntity::new(String::new(), self.player_representation, movement, 0.0);
        self.registry.insert(id, entity)?;
        tracing::debug!(%id, "shadow entity created");
        Ok(())
    }

    /// Destroy a player and journal a tombstone for the cluster.
    pub fn destroy_interactive_entity(
        &mut self,
        id: EntityIdentity,
    ) -> Result<InteractiveEntity, KernelError> {
        let entity = self.registry.remove(id)?;
        self.journal.push(LifecycleEvent::InteractiveDestroyed(id));
        tracing::info!(%id, name = %entity.name, "interactive entity destroyed");
        Ok(entity)
    }

    pub fn interactive(&self, id: EntityIdentity) -> Result<&InteractiveEntity, KernelError> {
        Ok(self.registry.get(id)?)
    }

    pub fn set_interactive_movement(
        &mut self,
        id: EntityIdentity,
        movement: MovementState,
    ) -> Result<(), KernelError> {
        self.registry.get_mut(id)?.movement = movement;
        Ok(())
    }

    pub fn set_turn_speed(&mut self, id: EntityIdentity, turn_speed: f32) -> Result<(), KernelError> {
        self.registry.get_mut(id)?.turn_speed = turn_speed;
        Ok(())
    }

    pub fn set_enabled(&mut self, id: EntityIdentity, enabled: bool) -> Result<(), KernelError> {
        self.registry.get_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Debug helper: add `delta` radians to every player's orientation.
    pub fn rotate_all(&mut self, delta: f32) {
        for (_, entity) in self.registry.iter_mut() {
            entity.movement.orientation += delta;
        }
    }

    /// Activate a collectible at `position`.
    pub fn spawn_collectible(&mut self, position: Vec3) -> Result<usize, KernelError> {
        let slot = self.pool.acquire(position)?;
        self.journal
            .push(LifecycleEvent::PooledAcquired { slot, position });
        tracing::debug!(slot, ?position, "collectible spawned");
        Ok(slot)
    }

    /// Deactivate the collectible at `slot`. The last active collectible
    /// takes over `slot`.
    pub fn collect(&mut self, slot: usize) -> Result<(), KernelError> {
        self.check_active(slot)?;
        self.pool.release(slot);
        self.journal.push(LifecycleEvent::PooledReleased(slot));
        tracing::debug!(slot, "collectible collected");
        Ok(())
    }

    pub fn set_collectible_movement(
        &mut self,
        slot: usize,
        movement: MovementState,
    ) -> Result<(), KernelError> {
        self.check_active(slot)?;
        self.pool.set_movement(slot, movement);
        Ok(())
    }

    /// Match the local active range to `len` collectibles, as counted in a
    /// replicated snapshot. Nothing is journaled.
    pub fn resize_collectibles(&mut self, len: usize) -> Result<(), KernelError> {
        let before = self.pool.num_active();
        self.pool.resize_active(len)?;
        if before != len {
            tracing::debug!(before, len, "collectible range resynchronized");
        }
        Ok(())
    }

    pub fn set_collectible_representation(
        &mut self,
        slot: usize,
        representation: RepresentationHandle,
    ) -> Result<(), KernelError> {
        self.check_active(slot)?;
        self.pool.set_representation(slot, representation);
        Ok(())
    }

    /// Replay a structural change produced by another node. Nothing is journaled.
    pub fn apply_lifecycle(&mut self, event: &LifecycleEvent) -> Result<(), KernelError> {
        match *event {
            LifecycleEvent::InteractiveDestroyed(id) => {
                self.registry.remove(id)?;
            }
            LifecycleEvent::PooledAcquired { slot, position } => {
                let actual = self.pool.num_active();
                if actual != slot {
                    return Err(KernelError::SlotMismatch {
                        expected: slot,
                        actual,
                    });
                }
                self.pool.acquire(position)?;
            }
            LifecycleEvent::PooledReleased(slot) => {
                self.check_active(slot)?;
                self.pool.release(slot);
            }
        }
        Ok(())
    }

    /// Structural changes recorded since the last drain.
    pub fn journal(&self) -> &[LifecycleEvent] {
        &self.journal
    }

    /// Take the journal, leaving it empty.
    pub fn drain_journal(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Advance the simulation to absolute time `now` (seconds).
    ///
    /// The first call only establishes the time base. Returns the step length
    /// when a step was taken.
    pub fn step(&mut self, now: f64) -> Option<f32> {
        let Some(last) = self.last_time.replace(now) else {
            return None;
        };
        let dt = (now - last).max(0.0) as f32;
        for (_, entity) in self.registry.iter_mut() {
            entity.update(dt);
        }
        self.tick += 1;
        tracing::trace!(tick = self.tick, dt, "simulation step");
        Some(dt)
    }

    /// FNV-1a over every replicated field plus the pool layout. Nodes that
    /// agree on this hash render the same scene.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        let mix_movement = |h: &mut u64, m: &MovementState| {
            mix(h, &m.position.x.to_le_bytes());
            mix(h, &m.position.y.to_le_bytes());
            mix(h, &m.position.z.to_le_bytes());
            mix(h, &m.orientation.to_le_bytes());
        };

        let mut players: Vec<(EntityIdentity, &InteractiveEntity)> = self.registry.iter().collect();
        players.sort_by_key(|(id, _)| *id);
        for (id, entity) in players {
            mix(&mut h, &id.0.to_le_bytes());
            mix_movement(&mut h, &entity.movement);
        }

        mix(&mut h, &(self.pool.num_active() as u64).to_le_bytes());
        self.pool.for_each_active(|slot, payload| {
            mix(&mut h, &(slot as u64).to_le_bytes());
            mix(&mut h, &payload.representation.0.to_le_bytes());
            mix_movement(&mut h, &payload.movement);
        });
        h
    }

    fn check_active(&self, slot: usize) -> Result<(), KernelError> {
        let active = self.pool.num_active();
        if slot >= active {
            return Err(KernelError::InactiveSlot { slot, active });
        }
        Ok(())
    }
}

/// Deterministic spawn point on a ring of `radius`, spread by the golden angle.
fn spawn_point(id: EntityIdentity, radius: f32) -> MovementState {
    const GOLDEN_ANGLE: f32 = 2.399_963;
    let angle = id.0 as f32 * GOLDEN_ANGLE;
    let position = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
    // Face along the ring.
    MovementState::new(position, angle + std::f32::consts::FRAC_PI_2)
}
