//! Per-slot exclusive locking scope.
//!
//! In-process stand-in for a transactional row lock: one async mutex per slot
//! id, held across an entire read-decide-write sequence so a capacity check
//! is never interleaved with another writer's check for the same slot. No
//! operation ever holds two slot locks at once; the auto-assign path acquires
//! them release-before-next.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::slot::SlotId;

#[derive(Default)]
pub struct SlotLocks {
    locks: DashMap<SlotId, Arc<Mutex<()>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive scope for one slot.
    ///
    /// The guard must be dropped before locking any other slot.
    pub async fn acquire(&self, slot: SlotId) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(self.locks.entry(slot).or_default().value());
        mutex.lock_owned().await
    }
}
