use std::sync::Arc;

use shelf_ids::SlotId;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    AllowAll, BatchEntry, BatchOp, BatchResult, Catalog, EditPolicy, EngineCfg, Error, Fixture,
    PendingChange, PendingChangeSet, Product, RemoteSnapshot, RemoteStateCache, RemoteStore,
    Result, SessionState, ShelfEvent, SlotIndex, cache::merge, events::EventHub,
};

/// Editing session for one fixture.
///
/// Staging only touches the pending set. [`ReconciliationEngine::commit_all`]
/// sends each pending entry to the remote store as an independent write,
/// clears the pending set whatever the outcomes, and re-reads the fixture.
/// Commit and cancel take `&mut self`, so one session can never run two
/// commits at once.
pub struct ReconciliationEngine {
    /// Identifier math for the edited fixture.
    index: SlotIndex,
    /// Staged changes.
    pending: PendingChangeSet,
    /// Last-known remote state.
    cache: RemoteStateCache,
    /// Target of commit writes.
    remote: Arc<dyn RemoteStore>,
    /// Gate for staging.
    policy: Arc<dyn EditPolicy>,
    /// Change notifications.
    events: EventHub,
}

impl ReconciliationEngine {
    /// Create a session for `fixture`. No snapshot is loaded until the first
    /// [`refresh`](Self::refresh).
    pub fn new(
        fixture: Fixture,
        remote: Arc<dyn RemoteStore>,
        catalog: Arc<dyn Catalog>,
        cfg: &EngineCfg,
    ) -> Self {
        Self {
            index: SlotIndex::new(fixture),
            pending: PendingChangeSet::new(),
            cache: RemoteStateCache::new(remote.clone(), catalog, cfg.refresh.clone()),
            remote,
            policy: Arc::new(AllowAll),
            events: EventHub::new(cfg.event_capacity),
        }
    }

    /// Replace the edit policy.
    #[must_use]
    pub fn with_edit_policy(mut self, policy: Arc<dyn EditPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// The edited fixture.
    pub fn fixture(&self) -> &Fixture {
        self.index.fixture()
    }

    /// Slot index for the edited fixture.
    pub fn index(&self) -> &SlotIndex {
        &self.index
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ShelfEvent> {
        self.events.subscribe()
    }

    /// Stage a change for `slot`: `Some(product)` assigns, `None` clears.
    ///
    /// Returns `true` when the pending set changed.
    pub fn stage(&mut self, slot: SlotId, product: Option<Product>) -> Result<bool> {
        self.index.check(slot)?;
        let fixture = self.index.fixture().id();
        if !self.policy.can_edit(fixture) {
            return Err(Error::ReadOnly(fixture));
        }
        let changed = match product {
            Some(product) => {
                debug!(%slot, product = %product.id, "stage assignment");
                self.pending.stage_assignment(slot, product)
            }
            None => {
                debug!(%slot, "stage removal");
                self.pending
                    .stage_removal(slot, self.cache.loaded(fixture))
            }
        };
        if changed {
            self.events.publish(ShelfEvent::Staged {
                slot,
                change: self.pending.get(slot).cloned(),
            });
        }
        Ok(changed)
    }

    /// [`stage`](Self::stage) addressed by 1-based grid position.
    pub fn stage_at(&mut self, row: u32, column: u32, product: Option<Product>) -> Result<bool> {
        let slot = self.index.slot_id(row, column)?;
        self.stage(slot, product)
    }

    /// Discard every staged change without contacting the remote store.
    ///
    /// Returns the number of changes dropped.
    pub fn cancel_all(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        if discarded > 0 {
            debug!(discarded, "pending changes cancelled");
            self.events.publish(ShelfEvent::Cancelled {
                fixture: self.index.fixture().id(),
                discarded,
            });
        }
        discarded
    }

    /// Send every staged change to the remote store, then refresh.
    ///
    /// Assignments go first, then removals, each in slot order, one awaited
    /// call at a time. A failed write is recorded and the next one proceeds.
    /// The pending set is drained before the first write, so it is empty
    /// whatever the outcomes. If the follow-up refresh fails, the error
    /// carries the write outcomes.
    pub async fn commit_all(&mut self) -> Result<BatchResult> {
        if self.pending.is_empty() {
            return Ok(BatchResult::default());
        }
        let fixture = self.index.fixture().id();
        let mut assignments = Vec::new();
        let mut removals = Vec::new();
        for (slot, change) in self.pending.drain() {
            match change {
                PendingChange::Assign(product) => assignments.push((slot, product.id)),
                PendingChange::Remove => removals.push(slot),
            }
        }

        let mut batch = BatchResult::default();
        for (slot, product) in assignments {
            let outcome = self.remote.assign(&product, slot).await;
            if let Err(err) = &outcome {
                warn!(%slot, %product, error = %err, "assign failed");
            }
            batch.record(BatchEntry {
                op: BatchOp::Assign,
                slot,
                product: Some(product),
                outcome: outcome.into(),
            });
        }
        for slot in removals {
            let outcome = self.remote.unassign(slot).await;
            if let Err(err) = &outcome {
                warn!(%slot, error = %err, "unassign failed");
            }
            batch.record(BatchEntry {
                op: BatchOp::Clear,
                slot,
                product: None,
                outcome: outcome.into(),
            });
        }

        info!(%fixture, %batch, "commit finished");
        self.events.publish(ShelfEvent::Committed {
            fixture,
            succeeded: batch.succeeded(),
            failed: batch.failed(),
        });

        match self.refresh().await {
            Ok(_) => Ok(batch),
            Err(err) => Err(Error::RefreshAfterCommit {
                batch,
                source: Box::new(err),
            }),
        }
    }

    /// Re-read the fixture from the remote store, retrying per the configured
    /// policy. The previous snapshot survives a failure.
    ///
    /// Staged removals of slots the new snapshot shows empty are dropped.
    pub async fn refresh(&mut self) -> Result<Arc<RemoteSnapshot>> {
        let fixture = *self.index.fixture();
        match self.cache.refresh(&fixture).await {
            Ok(snapshot) => {
                for slot in self.pending.prune_removals(&snapshot) {
                    debug!(%slot, "dropping removal of a slot already empty");
                    self.events.publish(ShelfEvent::Staged { slot, change: None });
                }
                self.events.publish(ShelfEvent::Refreshed {
                    fixture: fixture.id(),
                    generation: snapshot.generation(),
                });
                Ok(snapshot)
            }
            Err(err) => {
                self.events.publish(ShelfEvent::RefreshFailed {
                    fixture: fixture.id(),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Last successfully fetched snapshot.
    pub fn snapshot(&self) -> Result<Arc<RemoteSnapshot>> {
        self.cache.current(self.index.fixture().id())
    }

    /// Staged changes, for review.
    pub fn pending(&self) -> &PendingChangeSet {
        &self.pending
    }

    /// `(assignments, removals)` currently staged.
    pub fn pending_count(&self) -> (usize, usize) {
        self.pending.pending_count()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Clean or dirty, from the pending set.
    pub fn state(&self) -> SessionState {
        if self.pending.is_empty() {
            SessionState::Clean
        } else {
            SessionState::Dirty
        }
    }

    /// What `slot` should display now.
    pub fn merged_view(&self, slot: SlotId) -> Result<Option<&Product>> {
        self.index.check(slot)?;
        Ok(merge(
            slot,
            &self.pending,
            self.cache.loaded(self.index.fixture().id()),
        ))
    }

    /// Merged view of every slot in row-major order.
    pub fn merged_grid(&self) -> Vec<(SlotId, Option<&Product>)> {
        let snapshot = self.cache.loaded(self.index.fixture().id());
        self.index
            .slots()
            .map(|slot| (slot, merge(slot, &self.pending, snapshot)))
            .collect()
    }
}
