use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use shelf_ids::{FixtureId, ProductId, SlotId};

use crate::{RemoteError, RemoteStore};

/// One call observed by a [`MemoryStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteCall {
    /// `assign(product, slot)`.
    Assign {
        /// Product written.
        product: ProductId,
        /// Target slot.
        slot: SlotId,
    },
    /// `unassign(slot)`.
    Unassign(SlotId),
    /// `read_fixture_occupancy(fixture)`.
    Read(FixtureId),
}

impl RemoteCall {
    /// True for assign/unassign calls.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Read(_))
    }
}

/// In-process remote store with failure injection and a call log.
///
/// Clones share state, so a test can keep one handle as a spy while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Current occupancy across all fixtures.
    occupancy: Arc<Mutex<HashMap<SlotId, ProductId>>>,
    /// Every call in arrival order.
    calls: Arc<Mutex<Vec<RemoteCall>>>,
    /// Slots whose writes are rejected.
    failing_slots: Arc<Mutex<HashSet<SlotId>>>,
    /// When set, every call fails as unreachable.
    unavailable: Arc<AtomicBool>,
    /// Number of upcoming reads that fail.
    read_failures: Arc<AtomicU32>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot directly, bypassing the call log.
    pub fn put(&self, slot: SlotId, product: impl Into<ProductId>) {
        self.occupancy.lock().insert(slot, product.into());
    }

    /// Current occupant of `slot`.
    pub fn occupant(&self, slot: SlotId) -> Option<ProductId> {
        self.occupancy.lock().get(&slot).cloned()
    }

    /// Reject writes to `slot` while `fail` is set.
    pub fn set_fail_slot(&self, slot: SlotId, fail: bool) {
        let mut g = self.failing_slots.lock();
        if fail {
            g.insert(slot);
        } else {
            g.remove(&slot);
        }
    }

    /// Make every call fail as unreachable while `v` is set.
    pub fn set_unavailable(&self, v: bool) {
        self.unavailable.store(v, Ordering::SeqCst);
    }

    /// Fail the next `n` occupancy reads.
    pub fn fail_next_reads(&self, n: u32) {
        self.read_failures.store(n, Ordering::SeqCst);
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of assign/unassign calls seen.
    pub fn write_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_write()).count()
    }

    /// Number of occupancy reads seen.
    pub fn read_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| !c.is_write()).count()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Record a call.
    fn note(&self, call: RemoteCall) {
        self.calls.lock().push(call);
    }

    /// Common failure checks for writes.
    fn check_write(&self, slot: SlotId) -> Result<(), RemoteError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("store offline".into()));
        }
        if self.failing_slots.lock().contains(&slot) {
            return Err(RemoteError::Rejected(format!("slot {slot} is locked")));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn assign(&self, product: &ProductId, slot: SlotId) -> Result<(), RemoteError> {
        self.note(RemoteCall::Assign {
            product: product.clone(),
            slot,
        });
        self.check_write(slot)?;
        self.occupancy.lock().insert(slot, product.clone());
        Ok(())
    }

    async fn unassign(&self, slot: SlotId) -> Result<(), RemoteError> {
        self.note(RemoteCall::Unassign(slot));
        self.check_write(slot)?;
        self.occupancy.lock().remove(&slot);
        Ok(())
    }

    async fn read_fixture_occupancy(
        &self,
        fixture: FixtureId,
    ) -> Result<HashMap<SlotId, ProductId>, RemoteError> {
        self.note(RemoteCall::Read(fixture));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("store offline".into()));
        }
        let pending_failures = self
            .read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending_failures.is_ok() {
            return Err(RemoteError::Unavailable("read timed out".into()));
        }
        Ok(self
            .occupancy
            .lock()
            .iter()
            .filter(|(slot, _)| slot.fixture() == fixture)
            .map(|(slot, product)| (*slot, product.clone()))
            .collect())
    }
}
