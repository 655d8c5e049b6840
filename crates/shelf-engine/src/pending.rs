//! Staged, not-yet-committed slot changes.

use std::{collections::BTreeMap, mem};

use shelf_ids::SlotId;

use crate::{Product, RemoteSnapshot};

/// What should happen to a slot on commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingChange {
    /// Write this product into the slot.
    Assign(Product),
    /// Clear whatever product the remote store holds in the slot.
    Remove,
}

impl PendingChange {
    /// The product to write, for assignments.
    pub fn product(&self) -> Option<&Product> {
        match self {
            Self::Assign(product) => Some(product),
            Self::Remove => None,
        }
    }
}

/// Pending change set keyed by slot.
///
/// A slot maps to at most one [`PendingChange`], so an assignment and a
/// removal for the same slot can never coexist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingChangeSet {
    /// Ordered so that review lists and commit order are stable.
    entries: BTreeMap<SlotId, PendingChange>,
}

impl PendingChangeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `product` for `slot`, replacing any earlier stage for the slot.
    ///
    /// Returns `true` when the set changed.
    pub fn stage_assignment(&mut self, slot: SlotId, product: Product) -> bool {
        let change = PendingChange::Assign(product);
        if self.entries.get(&slot) == Some(&change) {
            return false;
        }
        self.entries.insert(slot, change);
        true
    }

    /// Stage a clear of `slot`.
    ///
    /// A staged assignment is dropped first. A removal is then staged only if
    /// `remote` shows a committed product in the slot; an unloaded snapshot
    /// counts as occupied, since clearing an empty remote slot is harmless.
    /// Returns `true` when the set changed.
    pub fn stage_removal(&mut self, slot: SlotId, remote: Option<&RemoteSnapshot>) -> bool {
        let occupied = remote.is_none_or(|snap| snap.product(slot).is_some());
        let previous = if occupied {
            self.entries.insert(slot, PendingChange::Remove)
        } else {
            self.entries.remove(&slot)
        };
        match previous {
            Some(PendingChange::Remove) => !occupied,
            Some(PendingChange::Assign(_)) => true,
            None => occupied,
        }
    }

    /// Drop every staged change.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop removals staged for slots that `remote` shows empty, returning the
    /// slots dropped.
    pub fn prune_removals(&mut self, remote: &RemoteSnapshot) -> Vec<SlotId> {
        let stale: Vec<SlotId> = self
            .removals()
            .filter(|slot| remote.product(*slot).is_none())
            .collect();
        for slot in &stale {
            self.entries.remove(slot);
        }
        stale
    }

    /// Take every staged change in slot order, leaving the set empty.
    pub fn drain(&mut self) -> Vec<(SlotId, PendingChange)> {
        mem::take(&mut self.entries).into_iter().collect()
    }

    /// Staged change for `slot`, if any.
    pub fn get(&self, slot: SlotId) -> Option<&PendingChange> {
        self.entries.get(&slot)
    }

    /// `(assignments, removals)` currently staged.
    pub fn pending_count(&self) -> (usize, usize) {
        let assignments = self
            .entries
            .values()
            .filter(|c| matches!(c, PendingChange::Assign(_)))
            .count();
        (assignments, self.entries.len() - assignments)
    }

    /// Total staged changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All staged changes in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (SlotId, &PendingChange)> {
        self.entries.iter().map(|(slot, change)| (*slot, change))
    }

    /// Staged assignments in slot order.
    pub fn assignments(&self) -> impl Iterator<Item = (SlotId, &Product)> {
        self.entries
            .iter()
            .filter_map(|(slot, change)| change.product().map(|p| (*slot, p)))
    }

    /// Staged removals in slot order.
    pub fn removals(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.entries
            .iter()
            .filter(|(_, change)| matches!(change, PendingChange::Remove))
            .map(|(slot, _)| *slot)
    }
}
