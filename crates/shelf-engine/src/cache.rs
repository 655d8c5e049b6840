//! Last-known authoritative occupancy per fixture.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use shelf_ids::{FixtureId, ProductId, SlotId};
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::{
    Catalog, Error, Fixture, PendingChange, PendingChangeSet, Product, RefreshPolicy, RemoteStore,
    Result, SlotIndex,
};

/// Occupancy of one fixture as read from the remote store.
///
/// Snapshots are immutable; a refresh produces a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSnapshot {
    /// Fixture the snapshot describes.
    fixture: FixtureId,
    /// Per-fixture read counter, starting at 1.
    generation: u64,
    /// Occupied slots only.
    slots: BTreeMap<SlotId, Product>,
}

impl RemoteSnapshot {
    /// Assemble a snapshot from occupied slots.
    pub fn new(fixture: FixtureId, generation: u64, slots: BTreeMap<SlotId, Product>) -> Self {
        Self {
            fixture,
            generation,
            slots,
        }
    }

    /// Fixture the snapshot describes.
    pub fn fixture(&self) -> FixtureId {
        self.fixture
    }

    /// Monotonic read counter for this fixture.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Committed product in `slot`, if any.
    pub fn product(&self, slot: SlotId) -> Option<&Product> {
        self.slots.get(&slot)
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Product)> {
        self.slots.iter().map(|(slot, product)| (*slot, product))
    }
}

/// What a slot shows right now: pending intent over last-known remote state.
pub fn merge<'a>(
    slot: SlotId,
    pending: &'a PendingChangeSet,
    snapshot: Option<&'a RemoteSnapshot>,
) -> Option<&'a Product> {
    match pending.get(slot) {
        Some(PendingChange::Assign(product)) => Some(product),
        Some(PendingChange::Remove) => None,
        None => snapshot.and_then(|s| s.product(slot)),
    }
}

/// Cache of remote snapshots, replaced wholesale on each successful refresh.
pub struct RemoteStateCache {
    /// Authoritative store.
    remote: Arc<dyn RemoteStore>,
    /// Resolves product ids read from the store.
    catalog: Arc<dyn Catalog>,
    /// Retry schedule for reads.
    policy: RefreshPolicy,
    /// Last good snapshot per fixture.
    snapshots: HashMap<FixtureId, Arc<RemoteSnapshot>>,
}

impl RemoteStateCache {
    /// Create an empty cache.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        catalog: Arc<dyn Catalog>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            remote,
            catalog,
            policy,
            snapshots: HashMap::new(),
        }
    }

    /// Re-read the fixture's occupancy and replace the cached snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&mut self, fixture: &Fixture) -> Result<Arc<RemoteSnapshot>> {
        let raw = self.read_with_retry(fixture.id()).await?;
        let index = SlotIndex::new(*fixture);
        let mut slots = BTreeMap::new();
        for (slot, id) in raw {
            if !index.contains(slot) {
                warn!(fixture = %fixture.id(), %slot, "dropping foreign slot from occupancy read");
                continue;
            }
            let product = match self.catalog.product(&id).await {
                Some(product) => product,
                None => {
                    debug!(product = %id, "product missing from catalog");
                    Product::bare(id)
                }
            };
            slots.insert(slot, product);
        }
        let generation = self
            .snapshots
            .get(&fixture.id())
            .map_or(1, |s| s.generation() + 1);
        let snapshot = Arc::new(RemoteSnapshot::new(fixture.id(), generation, slots));
        self.snapshots.insert(fixture.id(), snapshot.clone());
        debug!(
            fixture = %fixture.id(),
            generation,
            occupied = snapshot.occupied(),
            "snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// Last successful snapshot for `fixture`.
    pub fn current(&self, fixture: FixtureId) -> Result<Arc<RemoteSnapshot>> {
        self.snapshots
            .get(&fixture)
            .cloned()
            .ok_or(Error::NotLoaded(fixture))
    }

    /// Borrow the last successful snapshot, if any.
    pub fn loaded(&self, fixture: FixtureId) -> Option<&RemoteSnapshot> {
        self.snapshots.get(&fixture).map(Arc::as_ref)
    }

    /// Read occupancy, retrying per the policy.
    async fn read_with_retry(&self, fixture: FixtureId) -> Result<HashMap<SlotId, ProductId>> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.remote.read_fixture_occupancy(fixture).await {
                Ok(raw) => {
                    trace!(%fixture, attempt, "occupancy read");
                    return Ok(raw);
                }
                Err(source) if attempt >= attempts => {
                    warn!(%fixture, attempt, error = %source, "giving up on occupancy read");
                    return Err(Error::RemoteUnavailable { fixture, source });
                }
                Err(err) => {
                    let delay = self.policy.backoff(attempt);
                    warn!(%fixture, attempt, error = %err, ?delay, "occupancy read failed");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
