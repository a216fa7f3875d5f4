//! Cluster state replication: snapshot codec, frame barrier seam, and the
//! per-node coordinator that runs one snapshot/apply cycle per frame.
//!
//! # Invariants
//! - Snapshot production on the authoritative node precedes application on
//!   every node, once per frame.
//! - A snapshot is applied whole or not at all.
//! - Absence from a snapshot never removes an entity; only tombstone records do.
//! - After applying a snapshot, a secondary's active collectible range matches
//!   the snapshot's pooled records slot for slot, whatever frames it missed.

pub mod barrier;
pub mod codec;
pub mod coordinator;
mod error;

pub use barrier::{FrameBarrier, LoopbackBarrier};
pub use codec::{DecodeError, Record, RecordBody, RecordKind, StateSnapshot, StateSnapshotCodec};
pub use coordinator::{FramePhase, FrameReport, NodeRole, ReplicationCoordinator};
pub use error::ReplicationError;
