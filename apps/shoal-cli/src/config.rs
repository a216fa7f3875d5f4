use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use shoal_kernel::SimulationConfig;

/// Settings for a local cluster run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub nodes: usize,
    /// Index of the node that simulates and publishes.
    pub authoritative: usize,
    pub frames: u64,
    /// Seconds of simulated time per frame.
    pub frame_dt: f64,
    /// Frames between collectible spawns; 0 disables.
    pub spawn_every: u64,
    /// Frames between collections; 0 disables.
    pub collect_every: u64,
    pub simulation: SimulationConfig,
    /// JSON representation manifest; the built-in set when absent.
    pub representations: Option<PathBuf>,
    /// Command script, one command executed per frame.
    pub commands: Option<PathBuf>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            authoritative: 0,
            frames: 120,
            frame_dt: 1.0 / 60.0,
            spawn_every: 10,
            collect_every: 25,
            simulation: SimulationConfig::default(),
            representations: None,
            commands: None,
        }
    }
}

impl ClusterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nodes == 0 {
            bail!("cluster needs at least one node");
        }
        if self.authoritative >= self.nodes {
            bail!(
                "authoritative node {} out of range for {} nodes",
                self.authoritative,
                self.nodes
            );
        }
        if self.frame_dt.is_nan() || self.frame_dt <= 0.0 {
            bail!("frame_dt must be positive, got {}", self.frame_dt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nodes: 5\nsimulation:\n  pool_capacity: 16").unwrap();
        let config = ClusterConfig::load(file.path()).unwrap();
        assert_eq!(config.nodes, 5);
        assert_eq!(config.simulation.pool_capacity, 16);
        assert_eq!(config.simulation.max_interactive, 110);
        assert_eq!(config.frames, 120);
        assert!(config.commands.is_none());
    }

    #[test]
    fn validate_rejects_bad_authority() {
        let config = ClusterConfig {
            nodes: 2,
            authoritative: 2,
            ..ClusterConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ClusterConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClusterConfig::load(&dir.path().join("absent.yaml")).is_err());
    }
}
