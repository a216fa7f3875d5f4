use crate::codec::DecodeError;

/// Errors that abort one replication frame. The next frame starts clean.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("malformed snapshot: {0}")]
    Decode(#[from] DecodeError),
    #[error("frame {frame} has not been published")]
    NotPublished { frame: u64 },
    #[error("frame {frame} published after frame {latest}")]
    OutOfOrder { frame: u64, latest: u64 },
}
