use shelf_ids::{FixtureId, SlotId};
use tokio::sync::broadcast;
use tracing::trace;

use crate::PendingChange;

/// Notifications published by an editing session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShelfEvent {
    /// A slot's pending state changed; `None` means no pending change remains.
    Staged {
        /// Slot affected.
        slot: SlotId,
        /// Resulting pending change.
        change: Option<PendingChange>,
    },
    /// Pending changes were discarded.
    Cancelled {
        /// Fixture edited.
        fixture: FixtureId,
        /// Number of changes dropped.
        discarded: usize,
    },
    /// A commit finished issuing writes.
    Committed {
        /// Fixture edited.
        fixture: FixtureId,
        /// Writes accepted.
        succeeded: usize,
        /// Writes failed.
        failed: usize,
    },
    /// A new snapshot replaced the cached one.
    Refreshed {
        /// Fixture read.
        fixture: FixtureId,
        /// Generation of the new snapshot.
        generation: u64,
    },
    /// A refresh gave up; the previous snapshot is retained.
    RefreshFailed {
        /// Fixture read.
        fixture: FixtureId,
        /// Rendered failure.
        reason: String,
    },
}

/// Broadcast fan-out for [`ShelfEvent`]s.
#[derive(Debug)]
pub(crate) struct EventHub {
    /// Sender side; receivers are created on subscribe.
    tx: broadcast::Sender<ShelfEvent>,
}

impl EventHub {
    /// Create a hub buffering `capacity` events per subscriber.
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ShelfEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub(crate) fn publish(&self, event: ShelfEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!(?event, "no event subscribers");
        }
    }
}
