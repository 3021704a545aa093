//! Per-parent mutual exclusion
//!
//! Allocations against the same parent run one at a time; different
//! parents never wait on each other. Slots are created on demand and
//! dropped once no lease or waiter refers to them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ipam_shared_types::ParentRef;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{AllocationError, Result};

type Slots = Arc<Mutex<HashMap<ParentRef, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Locked,
}

#[derive(Debug, Clone, Default)]
pub struct ParentGuard {
    slots: Slots,
}

impl ParentGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for exclusive access to `parent`
    pub async fn acquire(&self, parent: ParentRef, timeout: Duration) -> Result<ParentLease> {
        let slot = lock_slots(&self.slots).entry(parent).or_default().clone();

        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(held) => {
                log::debug!("Acquired allocation guard for {}", parent);
                Ok(ParentLease {
                    parent,
                    slots: self.slots.clone(),
                    held: Some(held),
                })
            }
            Err(_) => {
                prune(&mut lock_slots(&self.slots), &parent);
                log::warn!("Timed out after {:?} waiting for {}", timeout, parent);
                Err(AllocationError::Conflict {
                    parent,
                    message: format!(
                        "another allocation is in progress (waited {} ms)",
                        timeout.as_millis()
                    ),
                })
            }
        }
    }

    pub fn state(&self, parent: &ParentRef) -> GuardState {
        match lock_slots(&self.slots).get(parent) {
            Some(slot) if slot.try_lock().is_err() => GuardState::Locked,
            _ => GuardState::Idle,
        }
    }

    /// Number of parents with a live slot
    pub fn tracked(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

/// Exclusive access to one parent; released on drop
#[derive(Debug)]
pub struct ParentLease {
    parent: ParentRef,
    slots: Slots,
    held: Option<OwnedMutexGuard<()>>,
}

impl ParentLease {
    pub fn parent(&self) -> ParentRef {
        self.parent
    }
}

impl Drop for ParentLease {
    fn drop(&mut self) {
        let mut slots = lock_slots(&self.slots);
        drop(self.held.take());
        prune(&mut slots, &self.parent);
        log::debug!("Released allocation guard for {}", self.parent);
    }
}

fn lock_slots(slots: &Slots) -> MutexGuard<'_, HashMap<ParentRef, Arc<AsyncMutex<()>>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop the slot of `parent` when only the map still refers to it
fn prune(slots: &mut HashMap<ParentRef, Arc<AsyncMutex<()>>>, parent: &ParentRef) {
    if slots
        .get(parent)
        .is_some_and(|slot| Arc::strong_count(slot) == 1)
    {
        slots.remove(parent);
    }
}
