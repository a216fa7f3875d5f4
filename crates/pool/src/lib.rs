//! Collectible pool: fixed-capacity storage for high-churn entities.
//!
//! # Invariants
//! - Active slots occupy the contiguous range `[0, num_active)`.
//! - Every inactive slot is reachable from the free-list head exactly once;
//!   no active slot is on the free list.
//! - Storage is allocated once; acquire and release never touch the heap.

mod allocator;

pub use allocator::{CollectiblePayload, PoolError, PooledEntityAllocator, PooledSlot};
