//! Command channel: text commands from the out-of-band client channel,
//! parsed into [`Command`] and executed on the authoritative node.
//!
//! # Invariants
//! - Commands only call the game state's public entry points; replication
//!   carries their effects to the rest of the cluster.

pub mod command;

pub use command::{Command, CommandError, CommandOutcome, parse_script};
