//! Outcome tally of one bulk commit.

use std::fmt;

use serde::Serialize;
use shelf_ids::{ProductId, SlotId};

use crate::RemoteError;

/// Remote operation issued for one pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOp {
    /// Write a product into a slot.
    Assign,
    /// Clear a slot.
    Clear,
}

/// Result of one remote operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EntryOutcome {
    /// The store accepted the write.
    Succeeded,
    /// The store failed or refused the write.
    Failed(String),
}

impl EntryOutcome {
    /// True for [`EntryOutcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<Result<(), RemoteError>> for EntryOutcome {
    fn from(result: Result<(), RemoteError>) -> Self {
        match result {
            Ok(()) => Self::Succeeded,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

/// One line of the commit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    /// Operation attempted.
    pub op: BatchOp,
    /// Target slot.
    pub slot: SlotId,
    /// Product written, for assignments.
    pub product: Option<ProductId>,
    /// What the store said.
    pub outcome: EntryOutcome,
}

/// Immutable tally produced by a commit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Entries the store accepted.
    succeeded: usize,
    /// Entries that failed.
    failed: usize,
    /// Per-entry log in issue order.
    entries: Vec<BatchEntry>,
}

impl BatchResult {
    /// Append an entry, updating the counters.
    pub(crate) fn record(&mut self, entry: BatchEntry) {
        if entry.outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(entry);
    }

    /// Entries the store accepted.
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Entries that failed.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Entries attempted.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was attempted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-entry log in issue order.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Failed entries only, for actionable reporting.
    pub fn failures(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_success())
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}
