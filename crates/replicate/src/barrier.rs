use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ReplicationError;

/// The cluster runtime's frame barrier, seen from one node.
///
/// The authoritative node publishes exactly one buffer per frame; every node
/// then receives that same buffer, intact, before any node moves on to the
/// next frame. `receive` is the only blocking point of a frame.
pub trait FrameBarrier {
    fn publish(&mut self, frame: u64, bytes: &[u8]) -> Result<(), ReplicationError>;

    fn receive(&mut self, frame: u64) -> Result<Vec<u8>, ReplicationError>;
}

/// In-process barrier shared by every node of a simulated cluster.
///
/// Clones share one slot holding the latest published frame. Nodes must be
/// driven authoritative-first within each frame.
#[derive(Debug, Clone, Default)]
pub struct LoopbackBarrier {
    latest: Rc<RefCell<Option<(u64, Vec<u8>)>>>,
}

impl LoopbackBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame number of the last published buffer.
    pub fn published_frame(&self) -> Option<u64> {
        self.latest.borrow().as_ref().map(|(frame, _)| *frame)
    }

    /// Replace the buffer for `frame` as it will be seen by receivers.
    pub fn tamper(&self, frame: u64, bytes: Vec<u8>) {
        *self.latest.borrow_mut() = Some((frame, bytes));
    }
}

impl FrameBarrier for LoopbackBarrier {
    fn publish(&mut self, frame: u64, bytes: &[u8]) -> Result<(), ReplicationError> {
        let mut latest = self.latest.borrow_mut();
        if let Some((last, _)) = latest.as_ref() {
            if frame <= *last {
                return Err(ReplicationError::OutOfOrder {
                    frame,
                    latest: *last,
                });
            }
        }
        match latest.as_mut() {
            Some((f, buf)) => {
                *f = frame;
                buf.clear();
                buf.extend_from_slice(bytes);
            }
            None => *latest = Some((frame, bytes.to_vec())),
        }
        Ok(())
    }

    fn receive(&mut self, frame: u64) -> Result<Vec<u8>, ReplicationError> {
        match self.latest.borrow().as_ref() {
            Some((f, bytes)) if *f == frame => Ok(bytes.clone()),
            _ => Err(ReplicationError::NotPublished { frame }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_see_published_frame() {
        let mut authority = LoopbackBarrier::new();
        let mut other = authority.clone();
        authority.publish(0, &[1, 2, 3]).unwrap();
        assert_eq!(other.receive(0).unwrap(), vec![1, 2, 3]);
        assert_eq!(authority.receive(0).unwrap(), vec![1, 2, 3]);
        assert_eq!(other.published_frame(), Some(0));
    }

    #[test]
    fn receive_before_publish_fails() {
        let mut b = LoopbackBarrier::new();
        assert!(matches!(
            b.receive(0),
            Err(ReplicationError::NotPublished { frame: 0 })
        ));
        b.publish(0, &[]).unwrap();
        assert!(matches!(
            b.receive(1),
            Err(ReplicationError::NotPublished { frame: 1 })
        ));
    }

    #[test]
    fn frames_must_advance() {
        let mut b = LoopbackBarrier::new();
        b.publish(3, &[]).unwrap();
        assert!(matches!(
            b.publish(3, &[]),
            Err(ReplicationError::OutOfOrder { frame: 3, latest: 3 })
        ));
        b.publish(4, &[9]).unwrap();
        assert_eq!(b.receive(4).unwrap(), vec![9]);
    }
}
