use shoal_common::EntityIdentity;
use shoal_kernel::{GameState, KernelError};

use crate::barrier::FrameBarrier;
use crate::codec::{Record, RecordBody, RecordKind, StateSnapshot, StateSnapshotCodec};
use crate::error::ReplicationError;

/// Whether a node's simulation is the cluster's source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Authoritative,
    Secondary,
}

/// Where a node is within its current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Simulating,
    /// Authoritative node only.
    Snapshotting,
    Transporting,
    Applying,
}

/// What applying one snapshot did to the local state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// State records written onto existing entities.
    pub applied: usize,
    /// Shadow entities created for identities seen for the first time.
    pub created: usize,
    /// Interactive entities removed by tombstones.
    pub destroyed: usize,
    /// Collectible acquire/release records replayed.
    pub structural: usize,
    /// Collectible slots activated or deactivated to match the snapshot's
    /// pooled record count, beyond what the structural records did.
    pub resynced: usize,
    /// Records that referenced nothing locally and were dropped.
    pub skipped: usize,
}

/// Runs one snapshot-transport-apply cycle per frame for a single node.
pub struct ReplicationCoordinator<B> {
    role: NodeRole,
    barrier: B,
    phase: FramePhase,
    frame: u64,
    buffer: Vec<u8>,
}

impl<B: FrameBarrier> ReplicationCoordinator<B> {
    pub fn new(role: NodeRole, barrier: B) -> Self {
        Self {
            role,
            barrier,
            phase: FramePhase::Idle,
            frame: 0,
            buffer: Vec::new(),
        }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Number of the next frame to run.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn barrier(&self) -> &B {
        &self.barrier
    }

    /// Run one full frame. The authoritative node simulates up to `now`,
    /// snapshots and publishes; every node then receives and applies.
    ///
    /// On error the frame is abandoned with nothing applied and the
    /// coordinator moves on to the next frame.
    pub fn run_frame(
        &mut self,
        state: &mut GameState,
        now: f64,
    ) -> Result<FrameReport, ReplicationError> {
        let frame = self.frame;
        let span = tracing::info_span!("replication_frame", frame, role = ?self.role);
        let _guard = span.enter();

        let result = self.cycle(state, now);
        self.phase = FramePhase::Idle;
        self.frame += 1;

        match &result {
            Ok(report) => tracing::trace!(?report, "frame complete"),
            Err(e) => tracing::warn!(error = %e, "frame skipped"),
        }
        result
    }

    fn cycle(&mut self, state: &mut GameState, now: f64) -> Result<FrameReport, ReplicationError> {
        self.phase = FramePhase::Simulating;
        match self.role {
            NodeRole::Authoritative => {
                state.step(now);
                self.phase = FramePhase::Snapshotting;
                self.produce_snapshot(state);
                self.phase = FramePhase::Transporting;
                self.barrier.publish(self.frame, &self.buffer)?;
            }
            NodeRole::Secondary => {
                if !state.journal().is_empty() {
                    let discarded = state.drain_journal();
                    tracing::warn!(
                        count = discarded.len(),
                        "secondary node discarded local structural changes"
                    );
                }
                self.phase = FramePhase::Transporting;
            }
        }

        let bytes = self.barrier.receive(self.frame)?;
        self.phase = FramePhase::Applying;
        let mut report = self.apply_snapshot(state, &bytes)?;
        report.frame = self.frame;
        Ok(report)
    }

    /// Drain the journal and encode the node's full state. The encoded bytes
    /// are returned and also kept for publishing.
    pub fn produce_snapshot(&mut self, state: &mut GameState) -> &[u8] {
        let journal = state.drain_journal();
        let snapshot = StateSnapshot::capture(state, &journal);
        StateSnapshotCodec::encode_into(&snapshot, &mut self.buffer);
        tracing::debug!(
            records = snapshot.len(),
            structural = journal.len(),
            bytes = self.buffer.len(),
            "snapshot produced"
        );
        &self.buffer
    }

    /// Decode `bytes` and apply every record to `state`.
    ///
    /// A buffer that fails to decode changes nothing. Unknown identities
    /// become shadow entities; entities missing from the snapshot are left
    /// alone.
    ///
    /// The authoritative node already made every structural change, so it
    /// skips structural and representation records. A secondary replays the
    /// structural records in order, then resizes its active collectible range
    /// to the number of pooled state records and overwrites every active
    /// slot's movement and representation. A secondary that missed a frame,
    /// or changed its pool locally, is back in step after one applied snapshot.
    pub fn apply_snapshot(
        &self,
        state: &mut GameState,
        bytes: &[u8],
    ) -> Result<FrameReport, ReplicationError> {
        let snapshot = StateSnapshotCodec::decode(bytes)?;
        let secondary = self.role == NodeRole::Secondary;
        let mut report = FrameReport::default();

        for record in &snapshot.records {
            match record.kind {
                RecordKind::Interactive => apply_interactive(state, record, &mut report),
                kind if kind.is_structural() && secondary => {
                    apply_structural(state, record, &mut report)
                }
                _ => {}
            }
        }

        if secondary {
            let pooled = snapshot
                .records
                .iter()
                .filter(|r| r.kind == RecordKind::Pooled)
                .count();
            let before = state.pool().num_active();
            match state.resize_collectibles(pooled) {
                Ok(()) => report.resynced = before.abs_diff(pooled),
                Err(e) => {
                    tracing::warn!(pooled, error = %e, "collectible range not resynchronized");
                    report.skipped += 1;
                }
            }
        }

        for record in &snapshot.records {
            let slot = record.id as usize;
            let result = match (record.kind, record.body) {
                (RecordKind::Pooled, RecordBody::Movement(m)) => {
                    state.set_collectible_movement(slot, m)
                }
                (RecordKind::PooledRepresentation, RecordBody::Representation(handle))
                    if secondary =>
                {
                    state.set_collectible_representation(slot, handle)
                }
                _ => continue,
            };
            match result {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::warn!(slot, kind = ?record.kind, error = %e, "pooled record skipped");
                    report.skipped += 1;
                }
            }
        }

        tracing::debug!(
            applied = report.applied,
            created = report.created,
            destroyed = report.destroyed,
            resynced = report.resynced,
            skipped = report.skipped,
            "snapshot applied"
        );
        Ok(report)
    }
}

fn apply_interactive(state: &mut GameState, record: &Record, report: &mut FrameReport) {
    let id = EntityIdentity(record.id);
    let movement = record.movement();
    if state.registry().contains(id) {
        match state.set_interactive_movement(id, movement) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                tracing::warn!(%id, error = %e, "interactive record skipped");
                report.skipped += 1;
            }
        }
    } else {
        match state.insert_shadow(id, movement) {
            Ok(()) => report.created += 1,
            Err(e) => {
                tracing::warn!(%id, error = %e, "shadow creation failed");
                report.skipped += 1;
            }
        }
    }
}

fn apply_structural(state: &mut GameState, record: &Record, report: &mut FrameReport) {
    let Some(event) = record.lifecycle() else {
        return;
    };
    match state.apply_lifecycle(&event) {
        Ok(()) if record.kind == RecordKind::InteractiveDestroyed => report.destroyed += 1,
        Ok(()) => report.structural += 1,
        Err(KernelError::Registry(e)) => {
            tracing::warn!(error = %e, "tombstone for unknown entity skipped");
            report.skipped += 1;
        }
        Err(e) => {
            tracing::warn!(?event, error = %e, "structural record skipped");
            report.skipped += 1;
        }
    }
}
