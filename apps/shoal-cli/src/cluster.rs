use anyhow::Context;
use glam::Vec3;
use shoal_assets::RepresentationCatalog;
use shoal_command::{Command, parse_script};
use shoal_kernel::{GameState, KernelError};
use shoal_pool::PoolError;
use shoal_replicate::{LoopbackBarrier, NodeRole, ReplicationCoordinator};
use shoal_tools::{NodeInspector, NodeSummary};

use crate::config::ClusterConfig;

/// Used when no command script is configured.
const DEMO_SCRIPT: &str = "\
# two players join, one leaves later
create alice
create bob
turn 0 0.8
turn 1 -0.4
spawn 0 -2 0
spawn 3 -2 1
disable 1
enable 1
rotate 0.25
destroy 1
";

pub struct Node {
    pub state: GameState,
    pub coordinator: ReplicationCoordinator<LoopbackBarrier>,
}

/// Every node of a local cluster, sharing one in-process barrier.
pub struct Cluster {
    config: ClusterConfig,
    nodes: Vec<Node>,
    script: Vec<Command>,
    skipped_frames: usize,
}

impl Cluster {
    pub fn new(config: ClusterConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let catalog = match &config.representations {
            Some(path) => RepresentationCatalog::load(path)?,
            None => RepresentationCatalog::default_set(),
        };
        let text = match &config.commands {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading commands {}", path.display()))?,
            None => DEMO_SCRIPT.to_string(),
        };
        let script = parse_script(&text)
            .map_err(|(line, e)| anyhow::anyhow!("command script line {line}: {e}"))?;

        let barrier = LoopbackBarrier::new();
        let nodes = (0..config.nodes)
            .map(|i| {
                let role = if i == config.authoritative {
                    NodeRole::Authoritative
                } else {
                    NodeRole::Secondary
                };
                Ok(Node {
                    state: GameState::new(config.simulation.clone(), &catalog)?,
                    coordinator: ReplicationCoordinator::new(role, barrier.clone()),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        tracing::info!(
            nodes = config.nodes,
            authoritative = config.authoritative,
            commands = script.len(),
            "cluster created"
        );
        Ok(Self {
            config,
            nodes,
            script,
            skipped_frames: 0,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Frames in which at least one node failed to apply a snapshot.
    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    /// Run every configured frame. Stops at the first collectible pool
    /// exhaustion, which means `pool_capacity` is too small for the run.
    pub fn run(&mut self) -> anyhow::Result<()> {
        for frame in 0..self.config.frames {
            self.run_frame(frame)?;
        }
        Ok(())
    }

    fn run_frame(&mut self, frame: u64) -> anyhow::Result<()> {
        let authority = self.config.authoritative;
        self.drive_authority(frame)?;

        let now = frame as f64 * self.config.frame_dt;
        // The authoritative node publishes before anyone receives.
        let order = std::iter::once(authority)
            .chain((0..self.nodes.len()).filter(|&i| i != authority));
        let mut failed = false;
        for i in order {
            let node = &mut self.nodes[i];
            if node.coordinator.run_frame(&mut node.state, now).is_err() {
                failed = true;
            }
        }
        if failed {
            self.skipped_frames += 1;
        }
        Ok(())
    }

    /// Feed the authoritative node its scripted command and the
    /// spawn/collect cadence for this frame.
    fn drive_authority(&mut self, frame: u64) -> anyhow::Result<()> {
        let capacity = self.config.simulation.pool_capacity;
        let state = &mut self.nodes[self.config.authoritative].state;

        if let Some(command) = self.script.get(frame as usize) {
            match command.apply(state) {
                Ok(_) => {}
                Err(e @ KernelError::Pool(PoolError::Exhausted { .. })) => {
                    return Err(e).with_context(|| {
                        format!("frame {frame}: {command:?} (pool_capacity {capacity})")
                    });
                }
                Err(e) => tracing::warn!(frame, ?command, error = %e, "command rejected"),
            }
        }

        if self.config.spawn_every > 0 && frame % self.config.spawn_every == 0 {
            state
                .spawn_collectible(drift_point(frame))
                .with_context(|| format!("frame {frame}: spawn (pool_capacity {capacity})"))?;
        }

        if self.config.collect_every > 0
            && frame > 0
            && frame % self.config.collect_every == 0
            && state.pool().num_active() > 0
        {
            if let Err(e) = state.collect(0) {
                tracing::warn!(frame, error = %e, "collect failed");
            }
        }
        Ok(())
    }

    pub fn summaries(&self) -> Vec<NodeSummary> {
        self.nodes
            .iter()
            .map(|n| NodeInspector::summary(&n.state))
            .collect()
    }

    pub fn diverged(&self) -> bool {
        let states: Vec<&GameState> = self.nodes.iter().map(|n| &n.state).collect();
        NodeInspector::diverged(&states)
    }
}

/// Deterministic scatter for spawned collectibles.
fn drift_point(frame: u64) -> Vec3 {
    let angle = frame as f32 * 0.7;
    let radius = 5.0 + (frame % 7) as f32;
    Vec3::new(angle.cos() * radius, -2.0, angle.sin() * radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_common::EntityIdentity;
    use shoal_kernel::SimulationConfig;
    use std::io::Write;

    fn small() -> ClusterConfig {
        ClusterConfig {
            nodes: 3,
            frames: 60,
            spawn_every: 4,
            collect_every: 9,
            simulation: SimulationConfig {
                pool_capacity: 32,
                ..SimulationConfig::default()
            },
            ..ClusterConfig::default()
        }
    }

    #[test]
    fn demo_run_converges() {
        let mut cluster = Cluster::new(small()).unwrap();
        cluster.run().unwrap();
        assert!(!cluster.diverged());
        assert_eq!(cluster.skipped_frames(), 0);

        for node in cluster.nodes() {
            assert!(node.state.registry().contains(EntityIdentity(0)));
            assert!(!node.state.registry().contains(EntityIdentity(1)));
            node.state.pool().verify().unwrap();
        }
        let summaries = cluster.summaries();
        assert!(summaries.iter().all(|s| s.hash == summaries[0].hash));
    }

    #[test]
    fn non_zero_authority_converges() {
        let config = ClusterConfig {
            authoritative: 2,
            ..small()
        };
        let mut cluster = Cluster::new(config).unwrap();
        cluster.run().unwrap();
        assert!(!cluster.diverged());
        // Only the authoritative node simulates.
        assert_eq!(cluster.nodes()[2].state.tick(), 59);
        assert_eq!(cluster.nodes()[0].state.tick(), 0);
    }

    #[test]
    fn pool_exhaustion_stops_the_run() {
        let config = ClusterConfig {
            frames: 10,
            spawn_every: 1,
            collect_every: 0,
            simulation: SimulationConfig {
                pool_capacity: 4,
                ..SimulationConfig::default()
            },
            ..small()
        };
        let mut cluster = Cluster::new(config).unwrap();
        let err = cluster.run().unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("pool exhausted"), "{chain}");
        assert!(chain.contains("pool_capacity 4"), "{chain}");
        // Frames before the overrun completed and replicated.
        assert!(!cluster.diverged());
        assert_eq!(cluster.nodes()[1].state.pool().num_active(), 4);
    }

    #[test]
    fn script_errors_carry_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "create alice\nfly 1").unwrap();
        let config = ClusterConfig {
            commands: Some(file.path().to_path_buf()),
            ..small()
        };
        let err = Cluster::new(config).err().unwrap();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejected_commands_do_not_stop_the_run() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "destroy 40\ncreate carol").unwrap();
        let config = ClusterConfig {
            commands: Some(file.path().to_path_buf()),
            ..small()
        };
        let mut cluster = Cluster::new(config).unwrap();
        cluster.run().unwrap();
        assert!(!cluster.diverged());
        for node in cluster.nodes() {
            assert_eq!(node.state.registry().len(), 1);
        }
    }
}
