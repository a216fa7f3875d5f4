use shoal_common::EntityIdentity;
use shoal_kernel::GameState;

/// Read-only queries over one node's game state, for logs and debugging.
pub struct NodeInspector;

impl NodeInspector {
    pub fn summary(state: &GameState) -> NodeSummary {
        NodeSummary {
            tick: state.tick(),
            interactive: state.registry().len(),
            collectibles: state.pool().num_active(),
            capacity: state.pool().capacity(),
            pending_journal: state.journal().len(),
            hash: state.state_hash(),
        }
    }

    pub fn inspect_interactive(state: &GameState, id: EntityIdentity) -> Option<InteractiveInfo> {
        state.interactive(id).ok().map(|e| {
            let p = e.movement.position;
            InteractiveInfo {
                id,
                name: e.name.clone(),
                position: [p.x, p.y, p.z],
                orientation: e.movement.orientation,
                enabled: e.enabled,
            }
        })
    }

    /// Identities in registry order.
    pub fn list_interactive(state: &GameState) -> Vec<EntityIdentity> {
        state.registry().iter().map(|(id, _)| id).collect()
    }

    /// True if any node's state hash differs from the first node's.
    pub fn diverged(states: &[&GameState]) -> bool {
        let mut hashes = states.iter().map(|s| s.state_hash());
        match hashes.next() {
            Some(first) => hashes.any(|h| h != first),
            None => false,
        }
    }
}

/// Summary of one node's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub tick: u64,
    pub interactive: usize,
    pub collectibles: usize,
    pub capacity: usize,
    pub pending_journal: usize,
    pub hash: u64,
}

impl std::fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tick={} players={} collectibles={}/{} journal={} hash={:#018x}",
            self.tick,
            self.interactive,
            self.collectibles,
            self.capacity,
            self.pending_journal,
            self.hash
        )
    }
}

/// Detailed info about one interactive entity.
#[derive(Debug, Clone)]
pub struct InteractiveInfo {
    pub id: EntityIdentity,
    pub name: String,
    pub position: [f32; 3],
    pub orientation: f32,
    pub enabled: bool,
}

impl std::fmt::Display for InteractiveInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Player {} {:?} pos=({:.2}, {:.2}, {:.2}) heading={:.2}{}",
            self.id,
            self.name,
            self.position[0],
            self.position[1],
            self.position[2],
            self.orientation,
            if self.enabled { "" } else { " (disabled)" }
        )
    }
}
