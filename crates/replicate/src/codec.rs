//! Wire codec for per-frame state snapshots.
//!
//! Layout, all numeric fields little-endian:
//! ```text
//! record_count: u32
//! record_count x {
//!     kind:        u8    0 interactive state, 1 pooled state,
//!                        2 interactive destroyed, 3 pooled acquired, 4 pooled released,
//!                        5 pooled representation
//!     id:          u32   identity (kinds 0, 2) or pool slot index (kinds 1, 3, 4, 5)
//!     body:        16 bytes
//! }
//! ```
//! The body is `pos_x/y/z: f32, orientation: f32` for kinds 0 to 4. For kind 5
//! it is `representation: u32` followed by 12 zero bytes.
//! There is no version field: every node must run the same build.

use glam::Vec3;
use shoal_assets::RepresentationHandle;
use shoal_common::{EntityIdentity, EntityKind, MovementState};
use shoal_kernel::{GameState, LifecycleEvent};

pub const HEADER_LEN: usize = 4;
pub const RECORD_LEN: usize = 1 + 4 + 4 * 4;

/// Errors from decoding a snapshot buffer. A buffer that fails to decode is
/// discarded whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("snapshot of {len} bytes is shorter than its header")]
    TooShort { len: usize },
    #[error("snapshot declares {records} records ({expected} bytes) but is {actual} bytes")]
    LengthMismatch {
        records: u32,
        expected: usize,
        actual: usize,
    },
    #[error("record {index} has unknown kind {kind}")]
    UnknownKind { index: usize, kind: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Interactive = 0,
    Pooled = 1,
    InteractiveDestroyed = 2,
    PooledAcquired = 3,
    PooledReleased = 4,
    PooledRepresentation = 5,
}

impl RecordKind {
    /// Kinds that change which entities exist rather than where they are.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::InteractiveDestroyed | Self::PooledAcquired | Self::PooledReleased
        )
    }

    /// Which storage the record's `id` addresses.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            Self::Interactive | Self::InteractiveDestroyed => EntityKind::Interactive,
            Self::Pooled
            | Self::PooledAcquired
            | Self::PooledReleased
            | Self::PooledRepresentation => EntityKind::Pooled,
        }
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Interactive),
            1 => Ok(Self::Pooled),
            2 => Ok(Self::InteractiveDestroyed),
            3 => Ok(Self::PooledAcquired),
            4 => Ok(Self::PooledReleased),
            5 => Ok(Self::PooledRepresentation),
            other => Err(other),
        }
    }
}

/// The 16 bytes following a record's id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordBody {
    Movement(MovementState),
    Representation(RepresentationHandle),
}

/// One entity's entry in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub kind: RecordKind,
    pub id: u32,
    pub body: RecordBody,
}

impl Record {
    fn with_movement(kind: RecordKind, id: u32, movement: MovementState) -> Self {
        Self {
            kind,
            id,
            body: RecordBody::Movement(movement),
        }
    }

    pub fn interactive(id: EntityIdentity, movement: MovementState) -> Self {
        Self::with_movement(RecordKind::Interactive, id.0, movement)
    }

    pub fn pooled(slot: usize, movement: MovementState) -> Self {
        Self::with_movement(RecordKind::Pooled, slot_id(slot), movement)
    }

    pub fn pooled_representation(slot: usize, representation: RepresentationHandle) -> Self {
        Self {
            kind: RecordKind::PooledRepresentation,
            id: slot_id(slot),
            body: RecordBody::Representation(representation),
        }
    }

    /// Movement carried by the record; zero for representation records.
    pub fn movement(&self) -> MovementState {
        match self.body {
            RecordBody::Movement(m) => m,
            RecordBody::Representation(_) => MovementState::default(),
        }
    }

    /// The structural change this record announces, if it is structural.
    pub fn lifecycle(&self) -> Option<LifecycleEvent> {
        let slot = self.id as usize;
        match self.kind {
            RecordKind::Interactive
            | RecordKind::Pooled
            | RecordKind::PooledRepresentation => None,
            RecordKind::InteractiveDestroyed => {
                Some(LifecycleEvent::InteractiveDestroyed(EntityIdentity(self.id)))
            }
            RecordKind::PooledAcquired => Some(LifecycleEvent::PooledAcquired {
                slot,
                position: self.movement().position,
            }),
            RecordKind::PooledReleased => Some(LifecycleEvent::PooledReleased(slot)),
        }
    }
}

impl From<&LifecycleEvent> for Record {
    fn from(event: &LifecycleEvent) -> Self {
        match *event {
            LifecycleEvent::InteractiveDestroyed(id) => Self::with_movement(
                RecordKind::InteractiveDestroyed,
                id.0,
                MovementState::default(),
            ),
            LifecycleEvent::PooledAcquired { slot, position } => Self::with_movement(
                RecordKind::PooledAcquired,
                slot_id(slot),
                MovementState::new(position, 0.0),
            ),
            LifecycleEvent::PooledReleased(slot) => Self::with_movement(
                RecordKind::PooledReleased,
                slot_id(slot),
                MovementState::default(),
            ),
        }
    }
}

/// Pool capacity is capped at `u32::MAX` slots, so every slot index fits.
fn slot_id(slot: usize) -> u32 {
    slot as u32
}

/// Ordered records for one replication frame. Built fresh every frame and
/// dropped once applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub records: Vec<Record>,
}

impl StateSnapshot {
    /// Structural records for `journal` in order, then the full state of every
    /// interactive entity and every active collectible, then the
    /// representation of every active collectible.
    pub fn capture(state: &GameState, journal: &[LifecycleEvent]) -> Self {
        let mut records = Vec::with_capacity(
            journal.len() + state.registry().len() + 2 * state.pool().num_active(),
        );
        records.extend(journal.iter().map(Record::from));
        records.extend(
            state
                .registry()
                .iter()
                .map(|(id, entity)| Record::interactive(id, entity.movement)),
        );
        records.extend(
            state
                .pool()
                .iter_active()
                .map(|(slot, payload)| Record::pooled(slot, payload.movement)),
        );
        records.extend(
            state
                .pool()
                .iter_active()
                .map(|(slot, payload)| {
                    Record::pooled_representation(slot, payload.representation)
                }),
        );
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fixed-layout binary codec for [`StateSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StateSnapshotCodec;

impl StateSnapshotCodec {
    /// Exact encoded size of a snapshot with `records` records.
    pub fn encoded_len(records: usize) -> usize {
        HEADER_LEN + records * RECORD_LEN
    }

    pub fn encode(snapshot: &StateSnapshot) -> Vec<u8> {
        let mut out = Vec::new();
        Self::encode_into(snapshot, &mut out);
        out
    }

    /// Encode into `out`, reusing its allocation.
    pub fn encode_into(snapshot: &StateSnapshot, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(Self::encoded_len(snapshot.len()));
        out.extend_from_slice(&(snapshot.len() as u32).to_le_bytes());
        for record in &snapshot.records {
            out.push(record.kind as u8);
            out.extend_from_slice(&record.id.to_le_bytes());
            match record.body {
                RecordBody::Movement(m) => {
                    let p = m.position;
                    for v in [p.x, p.y, p.z, m.orientation] {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }
                RecordBody::Representation(handle) => {
                    out.extend_from_slice(&handle.0.to_le_bytes());
                    out.extend_from_slice(&[0; 12]);
                }
            }
        }
    }

    /// Decode a whole buffer. Any inconsistency rejects the entire buffer.
    pub fn decode(bytes: &[u8]) -> Result<StateSnapshot, DecodeError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(DecodeError::TooShort { len: bytes.len() })?;
        let count = u32::from_le_bytes(header);
        let expected = Self::encoded_len(count as usize);
        if bytes.len() != expected {
            return Err(DecodeError::LengthMismatch {
                records: count,
                expected,
                actual: bytes.len(),
            });
        }

        let mut records = Vec::with_capacity(count as usize);
        for (index, chunk) in bytes[HEADER_LEN..].chunks_exact(RECORD_LEN).enumerate() {
            let kind = RecordKind::try_from(chunk[0])
                .map_err(|kind| DecodeError::UnknownKind { index, kind })?;
            let word = |at: usize| [chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]];
            let id = u32::from_le_bytes(word(1));
            let body = if kind == RecordKind::PooledRepresentation {
                RecordBody::Representation(RepresentationHandle(u32::from_le_bytes(word(5))))
            } else {
                let x = f32::from_le_bytes(word(5));
                let y = f32::from_le_bytes(word(9));
                let z = f32::from_le_bytes(word(13));
                let orientation = f32::from_le_bytes(word(17));
                RecordBody::Movement(MovementState::new(Vec3::new(x, y, z), orientation))
            };
            records.push(Record { kind, id, body });
        }
        Ok(StateSnapshot { records })
    }
}
