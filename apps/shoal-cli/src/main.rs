use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glam::Vec3;
use shoal_common::{EntityIdentity, MovementState};
use shoal_replicate::{Record, StateSnapshot, StateSnapshotCodec};
use tracing_subscriber::EnvFilter;

mod cluster;
mod config;

use cluster::Cluster;
use config::ClusterConfig;

#[derive(Parser)]
#[command(name = "shoal-cli", about = "Run and inspect a local shoal cluster")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-process cluster and check that every node converged
    Run {
        /// YAML cluster config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of nodes (overrides the config)
        #[arg(short, long)]
        nodes: Option<usize>,
        /// Number of frames (overrides the config)
        #[arg(short, long)]
        frames: Option<u64>,
    },
    /// Print the wire encoding of a two-player snapshot
    EncodeDemo,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Run {
            config,
            nodes,
            frames,
        } => {
            let mut config = match config {
                Some(path) => ClusterConfig::load(&path)?,
                None => ClusterConfig::default(),
            };
            if let Some(nodes) = nodes {
                config.nodes = nodes;
            }
            if let Some(frames) = frames {
                config.frames = frames;
            }
            let authoritative = config.authoritative;

            println!(
                "shoal-cli v{}: {} nodes, {} frames",
                env!("CARGO_PKG_VERSION"),
                config.nodes,
                config.frames
            );
            let mut cluster = Cluster::new(config)?;
            cluster.run()?;

            for (i, (node, summary)) in cluster
                .nodes()
                .iter()
                .zip(cluster.summaries())
                .enumerate()
            {
                let marker = if i == authoritative { "*" } else { " " };
                println!(
                    "{marker}node {i} [{:?}] frame={} {summary}",
                    node.coordinator.role(),
                    node.coordinator.frame()
                );
            }
            if cluster.skipped_frames() > 0 {
                println!("skipped frames: {}", cluster.skipped_frames());
            }
            if cluster.diverged() {
                anyhow::bail!("nodes diverged");
            }
            println!("Converged: OK");
        }
        Commands::EncodeDemo => {
            let snapshot = StateSnapshot {
                records: vec![
                    Record::interactive(
                        EntityIdentity(7),
                        MovementState::new(Vec3::new(1.0, 2.0, 3.0), 0.0),
                    ),
                    Record::interactive(
                        EntityIdentity(12),
                        MovementState::new(Vec3::new(4.0, 5.0, 6.0), 0.0),
                    ),
                ],
            };
            let bytes = StateSnapshotCodec::encode(&snapshot);
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            println!("{} bytes", bytes.len());
            println!("{hex}");
        }
    }

    Ok(())
}
