use glam::Vec3;
use shoal_assets::{RepresentationHandle, RepresentationProvider};
use shoal_common::MovementState;

/// Errors from pool construction and allocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool capacity must be greater than zero")]
    ZeroCapacity,
    #[error("pool capacity {0} exceeds the addressable slot range")]
    CapacityTooLarge(usize),
    #[error("no collectible representations available")]
    NoRepresentations,
    #[error("pool exhausted: all {capacity} slots are active")]
    Exhausted { capacity: usize },
    #[error("pool invariant violated: {0}")]
    InvariantViolated(String),
}

/// The part of a slot that moves when slots are swapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectiblePayload {
    pub representation: RepresentationHandle,
    pub movement: MovementState,
    pub active: bool,
}

/// One entry of the pool's backing storage.
///
/// `next_free` belongs to the storage index, not to the payload, and is only
/// meaningful while the slot is inactive.
#[derive(Debug, Clone)]
pub struct PooledSlot {
    payload: CollectiblePayload,
    next_free: Option<usize>,
}

impl PooledSlot {
    pub fn payload(&self) -> &CollectiblePayload {
        &self.payload
    }
}

/// Fixed-capacity storage for collectibles with O(1) acquire and release.
///
/// Active slots always occupy `[0, num_active)`. Inactive slots form a
/// singly-linked free list threaded through `next_free`, starting at
/// `free_head`. Slot indices are not stable across [`release`]: the last
/// active slot is moved into the released position.
///
/// [`release`]: PooledEntityAllocator::release
#[derive(Debug, Clone)]
pub struct PooledEntityAllocator {
    slots: Box<[PooledSlot]>,
    free_head: Option<usize>,
    num_active: usize,
}

impl PooledEntityAllocator {
    /// Build a pool of `capacity` inactive slots.
    ///
    /// Representations are assigned round-robin over `representations`, and
    /// the free list initially links slot 0 through `capacity - 1` in order.
    pub fn new(
        capacity: usize,
        representations: &[RepresentationHandle],
    ) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        if capacity > u32::MAX as usize {
            return Err(PoolError::CapacityTooLarge(capacity));
        }
        if representations.is_empty() {
            return Err(PoolError::NoRepresentations);
        }

        let slots: Vec<PooledSlot> = (0..capacity)
            .map(|i| PooledSlot {
                payload: CollectiblePayload {
                    representation: representations[i % representations.len()],
                    movement: MovementState::default(),
                    active: false,
                },
                next_free: if i + 1 < capacity { Some(i + 1) } else { None },
            })
            .collect();

        tracing::info!(capacity, "collectible pool created");

        Ok(Self {
            slots: slots.into_boxed_slice(),
            free_head: Some(0),
            num_active: 0,
        })
    }

    /// Build a pool cycling through every non-player representation of `provider`.
    pub fn from_provider(
        capacity: usize,
        provider: &impl RepresentationProvider,
    ) -> Result<Self, PoolError> {
        Self::new(capacity, &provider.collectible_handles())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn num_active(&self) -> usize {
        self.num_active
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head.is_none()
    }

    /// Head of the free list, if any slot is available.
    #[inline]
    pub fn free_head(&self) -> Option<usize> {
        self.free_head
    }

    /// Activate a slot at `position` and return its index, which is always
    /// the previous `num_active`.
    pub fn acquire(&mut self, position: Vec3) -> Result<usize, PoolError> {
        let head = self.free_head.ok_or(PoolError::Exhausted {
            capacity: self.capacity(),
        })?;
        let target = self.num_active;

        if head == target {
            self.free_head = self.slots[head].next_free;
        } else {
            // Only reachable if the free list left ascending order. The head's
            // payload moves to `target`; the head index stays on the list.
            self.unlink_free(target);
            self.swap_payloads(head, target);
        }

        let slot = &mut self.slots[target];
        slot.next_free = None;
        slot.payload.movement = MovementState::new(position, 0.0);
        slot.payload.active = true;
        self.num_active += 1;

        Ok(target)
    }

    /// Deactivate the slot at `index`.
    ///
    /// The last active slot is swapped into `index`, the vacated end slot is
    /// pushed on the free list, and `num_active` shrinks by one. Only the
    /// free-list head and the newly inactive slot's link change.
    ///
    /// # Panics
    /// If `index` is outside the active range.
    pub fn release(&mut self, index: usize) {
        assert!(
            index < self.num_active,
            "release of slot {index} outside active range 0..{}",
            self.num_active
        );

        let last = self.num_active - 1;
        self.swap_payloads(index, last);

        let slot = &mut self.slots[last];
        slot.payload.active = false;
        slot.next_free = self.free_head;
        self.free_head = Some(last);
        self.num_active = last;
    }

    /// Read a slot's payload, active or not.
    pub fn get(&self, index: usize) -> Option<&CollectiblePayload> {
        self.slots.get(index).map(|s| &s.payload)
    }

    /// Overwrite the movement of an active slot. Returns false if `index` is
    /// not active.
    pub fn set_movement(&mut self, index: usize, movement: MovementState) -> bool {
        if index >= self.num_active {
            return false;
        }
        self.slots[index].payload.movement = movement;
        true
    }

    /// Overwrite the representation of an active slot. Returns false if
    /// `index` is not active.
    pub fn set_representation(
        &mut self,
        index: usize,
        representation: RepresentationHandle,
    ) -> bool {
        if index >= self.num_active {
            return false;
        }
        self.slots[index].payload.representation = representation;
        true
    }

    /// Grow or shrink the active range to exactly `len` slots.
    ///
    /// Growing acquires at the origin; shrinking releases from the end, so no
    /// payload moves. Fails without changing anything if `len` exceeds the
    /// capacity.
    pub fn resize_active(&mut self, len: usize) -> Result<(), PoolError> {
        if len > self.capacity() {
            return Err(PoolError::Exhausted {
                capacity: self.capacity(),
            });
        }
        while self.num_active < len {
            self.acquire(Vec3::ZERO)?;
        }
        while self.num_active > len {
            self.release(self.num_active - 1);
        }
        Ok(())
    }

    /// The active range as a slice.
    pub fn active(&self) -> &[PooledSlot] {
        &self.slots[..self.num_active]
    }

    /// Restartable traversal over `(index, payload)` for every active slot.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &CollectiblePayload)> + '_ {
        self.active().iter().map(|s| &s.payload).enumerate()
    }

    /// Visit every active slot in index order.
    pub fn for_each_active(&self, mut visit: impl FnMut(usize, &CollectiblePayload)) {
        for (i, payload) in self.iter_active() {
            visit(i, payload);
        }
    }

    /// Check contiguity of the active range and the shape of the free list.
    pub fn verify(&self) -> Result<(), PoolError> {
        let violated = |msg: String| Err(PoolError::InvariantViolated(msg));

        for (i, slot) in self.slots.iter().enumerate() {
            let in_range = i < self.num_active;
            if slot.payload.active != in_range {
                return violated(format!(
                    "slot {i} active={} but active range is 0..{}",
                    slot.payload.active, self.num_active
                ));
            }
        }

        let mut seen = vec![false; self.capacity()];
        let mut count = 0;
        let mut cursor = self.free_head;
        while let Some(i) = cursor {
            if i >= self.capacity() {
                return violated(format!("free list points past capacity at {i}"));
            }
            if i < self.num_active {
                return violated(format!("active slot {i} is on the free list"));
            }
            if seen[i] {
                return violated(format!("free list cycles at slot {i}"));
            }
            seen[i] = true;
            count += 1;
            cursor = self.slots[i].next_free;
        }

        let inactive = self.capacity() - self.num_active;
        if count != inactive {
            return violated(format!(
                "free list covers {count} slots, expected {inactive}"
            ));
        }
        Ok(())
    }

    fn swap_payloads(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let tmp = self.slots[a].payload;
        self.slots[a].payload = self.slots[b].payload;
        self.slots[b].payload = tmp;
    }

    /// Remove `index` from the free list wherever it sits.
    fn unlink_free(&mut self, index: usize) {
        let next = self.slots[index].next_free;
        if self.free_head == Some(index) {
            self.free_head = next;
            return;
        }
        let mut cursor = self.free_head;
        while let Some(i) = cursor {
            if self.slots[i].next_free == Some(index) {
                self.slots[i].next_free = next;
                return;
            }
            cursor = self.slots[i].next_free;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reps(n: u32) -> Vec<RepresentationHandle> {
        (0..n).map(RepresentationHandle).collect()
    }

    fn pool(capacity: usize) -> PooledEntityAllocator {
        PooledEntityAllocator::new(capacity, &reps(3)).unwrap()
    }

    /// Walk the free list from the head.
    fn free_list(p: &PooledEntityAllocator) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = p.free_head;
        while let Some(i) = cursor {
            out.push(i);
            cursor = p.slots[i].next_free;
        }
        out
    }

    #[test]
    fn new_pool_links_every_slot() {
        let p = pool(5);
        assert_eq!(p.num_active(), 0);
        assert_eq!(free_list(&p), vec![0, 1, 2, 3, 4]);
        p.verify().unwrap();
    }

    #[test]
    fn representations_assigned_round_robin() {
        let p = pool(7);
        let assigned: Vec<u32> = (0..7).map(|i| p.get(i).unwrap().representation.0).collect();
        assert_eq!(assigned, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            PooledEntityAllocator::new(0, &reps(1)).unwrap_err(),
            PoolError::ZeroCapacity
        );
    }

    #[test]
    fn empty_representation_set_rejected() {
        assert_eq!(
            PooledEntityAllocator::new(4, &[]).unwrap_err(),
            PoolError::NoRepresentations
        );
    }

    #[test]
    fn acquire_places_slot_at_end_of_active_range() {
        let mut p = pool(4);
        let a = p.acquire(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let b = p.acquire(Vec3::X).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(p.num_active(), 2);
        assert_eq!(p.get(0).unwrap().movement.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(p.get(1).unwrap().active);
        p.verify().unwrap();
    }

    #[test]
    fn acquire_on_full_pool_is_exhausted() {
        let mut p = pool(2);
        p.acquire(Vec3::ZERO).unwrap();
        p.acquire(Vec3::ZERO).unwrap();
        assert!(p.is_full());
        assert_eq!(
            p.acquire(Vec3::ZERO).unwrap_err(),
            PoolError::Exhausted { capacity: 2 }
        );
        assert_eq!(p.num_active(), 2);
    }

    #[test]
    fn release_moves_last_active_into_hole() {
        let mut p = pool(4);
        for i in 0..4 {
            p.acquire(Vec3::splat(i as f32)).unwrap();
        }
        p.release(1);
        assert_eq!(p.num_active(), 3);
        // Former index 3 now lives at index 1.
        assert_eq!(p.get(1).unwrap().movement.position, Vec3::splat(3.0));
        assert_eq!(p.free_head(), Some(3));
        assert!(!p.get(3).unwrap().active);
        p.verify().unwrap();
    }

    #[test]
    fn release_carries_representation_with_payload() {
        let mut p = pool(4);
        for _ in 0..4 {
            p.acquire(Vec3::ZERO).unwrap();
        }
        let moved = p.get(3).unwrap().representation;
        let released = p.get(0).unwrap().representation;
        p.release(0);
        assert_eq!(p.get(0).unwrap().representation, moved);
        assert_eq!(p.get(3).unwrap().representation, released);
    }

    #[test]
    fn release_last_active_is_noop_swap() {
        let mut p = pool(3);
        p.acquire(Vec3::X).unwrap();
        p.acquire(Vec3::Y).unwrap();
        p.release(1);
        assert_eq!(p.num_active(), 1);
        assert_eq!(p.get(0).unwrap().movement.position, Vec3::X);
        assert_eq!(p.get(1).unwrap().movement.position, Vec3::Y);
        assert_eq!(free_list(&p), vec![1, 2]);
        p.verify().unwrap();
    }

    #[test]
    fn release_only_touches_head_and_released_link() {
        let mut p = pool(5);
        for _ in 0..4 {
            p.acquire(Vec3::ZERO).unwrap();
        }
        let before: Vec<Option<usize>> = p.slots.iter().map(|s| s.next_free).collect();
        p.release(0);
        let after: Vec<Option<usize>> = p.slots.iter().map(|s| s.next_free).collect();
        for i in 0..5 {
            if i != 3 {
                assert_eq!(before[i], after[i], "link of slot {i} changed");
            }
        }
        assert_eq!(after[3], Some(4));
    }

    #[test]
    #[should_panic(expected = "outside active range")]
    fn release_outside_active_range_panics() {
        let mut p = pool(3);
        p.acquire(Vec3::ZERO).unwrap();
        p.release(1);
    }

    #[test]
    fn fill_release_one_and_reacquire() {
        let mut p = pool(3);
        for _ in 0..3 {
            p.acquire(Vec3::ZERO).unwrap();
        }
        p.release(2);
        let idx = p.acquire(Vec3::Z).unwrap();
        assert_eq!(idx, 2);
        assert!(p.is_full());
        p.verify().unwrap();
    }

    #[test]
    fn capacity_four_release_and_reuse() {
        let mut p = pool(4);
        for i in 0..4 {
            assert_eq!(p.acquire(Vec3::splat(i as f32)).unwrap(), i);
        }
        assert!(p.acquire(Vec3::ZERO).is_err());

        p.release(1);
        assert_eq!(p.num_active(), 3);
        let remaining: Vec<f32> = p.iter_active().map(|(_, s)| s.movement.position.x).collect();
        assert_eq!(remaining, vec![0.0, 3.0, 2.0]);
        // The slot that held index 1's payload was swapped to the end and freed.
        assert_eq!(p.free_head(), Some(3));
        assert_eq!(p.get(3).unwrap().movement.position, Vec3::splat(1.0));

        assert_eq!(p.acquire(Vec3::splat(9.0)).unwrap(), 3);
        assert!(p.is_full());
        p.verify().unwrap();
    }

    #[test]
    fn set_movement_rejects_inactive_slot() {
        let mut p = pool(2);
        p.acquire(Vec3::ZERO).unwrap();
        let m = MovementState::new(Vec3::ONE, 1.5);
        assert!(p.set_movement(0, m));
        assert!(!p.set_movement(1, m));
        assert_eq!(p.get(0).unwrap().movement, m);
    }

    #[test]
    fn resize_active_grows_and_shrinks_from_the_end() {
        let mut p = pool(5);
        p.acquire(Vec3::X).unwrap();
        p.resize_active(4).unwrap();
        assert_eq!(p.num_active(), 4);
        assert_eq!(p.get(0).unwrap().movement.position, Vec3::X);
        p.verify().unwrap();

        p.resize_active(1).unwrap();
        assert_eq!(p.num_active(), 1);
        assert_eq!(p.get(0).unwrap().movement.position, Vec3::X);
        assert_eq!(free_list(&p), vec![1, 2, 3, 4]);
        p.verify().unwrap();
    }

    #[test]
    fn resize_past_capacity_changes_nothing() {
        let mut p = pool(3);
        p.acquire(Vec3::ZERO).unwrap();
        assert_eq!(
            p.resize_active(4).unwrap_err(),
            PoolError::Exhausted { capacity: 3 }
        );
        assert_eq!(p.num_active(), 1);
        p.verify().unwrap();
    }

    #[test]
    fn set_representation_only_on_active_slots() {
        let mut p = pool(3);
        p.acquire(Vec3::ZERO).unwrap();
        assert!(p.set_representation(0, RepresentationHandle(9)));
        assert_eq!(p.get(0).unwrap().representation, RepresentationHandle(9));
        assert!(!p.set_representation(1, RepresentationHandle(9)));
        assert_eq!(p.get(1).unwrap().representation, RepresentationHandle(1));
    }

    #[test]
    fn traversal_covers_exactly_the_active_range() {
        let mut p = pool(6);
        for i in 0..4 {
            p.acquire(Vec3::splat(i as f32)).unwrap();
        }
        p.release(0);
        let visited: Vec<usize> = p.iter_active().map(|(i, _)| i).collect();
        assert_eq!(visited, vec![0, 1, 2]);
        // Restartable.
        assert_eq!(p.iter_active().count(), 3);
        let mut count = 0;
        p.for_each_active(|_, payload| {
            assert!(payload.active);
            count += 1;
        });
        assert_eq!(count, 3);
    }

    #[test]
    fn acquire_repairs_out_of_order_free_list() {
        let mut p = pool(4);
        p.acquire(Vec3::ZERO).unwrap();
        // Hand-build the list 2 -> 1 -> 3 to force the migration path.
        p.slots[2].next_free = Some(1);
        p.slots[1].next_free = Some(3);
        p.slots[3].next_free = None;
        p.free_head = Some(2);
        let rep_at_head = p.get(2).unwrap().representation;

        let idx = p.acquire(Vec3::ONE).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(p.get(1).unwrap().representation, rep_at_head);
        assert_eq!(free_list(&p), vec![2, 3]);
        p.verify().unwrap();
    }

    #[test]
    fn random_churn_preserves_invariants() {
        let mut p = pool(16);
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        for step in 0..2_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let want_acquire = state % 3 != 0;
            if want_acquire && !p.is_full() {
                p.acquire(Vec3::splat(step as f32)).unwrap();
            } else if p.num_active() > 0 {
                let idx = (state >> 8) as usize % p.num_active();
                p.release(idx);
            }
            assert!(p.num_active() <= p.capacity());
            p.verify().unwrap();
        }
    }
}
