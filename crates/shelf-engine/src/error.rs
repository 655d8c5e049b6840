use std::result::Result as StdResult;

use shelf_ids::{FixtureId, SlotId};
use thiserror::Error;

use crate::{BatchResult, RemoteError};

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the shelf engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A fixture was declared with zero rows or columns, or too many slots.
    #[error("fixture {fixture} has invalid geometry {rows}x{columns}")]
    InvalidGeometry {
        /// Offending fixture.
        fixture: FixtureId,
        /// Requested rows.
        rows: u32,
        /// Requested columns.
        columns: u32,
    },

    /// A 1-based position lies outside the fixture grid.
    #[error("position ({row}, {column}) is outside fixture {fixture} ({rows}x{columns})")]
    OutOfBounds {
        /// Fixture addressed.
        fixture: FixtureId,
        /// Requested row.
        row: u32,
        /// Requested column.
        column: u32,
        /// Fixture row count.
        rows: u32,
        /// Fixture column count.
        columns: u32,
    },

    /// A slot identifier was not minted by this fixture's slot index.
    #[error("slot {slot} does not belong to fixture {fixture}")]
    UnknownSlot {
        /// Fixture addressed.
        fixture: FixtureId,
        /// Foreign or malformed slot identifier.
        slot: SlotId,
    },

    /// The remote occupancy read could not complete.
    #[error("remote store unavailable for fixture {fixture}: {source}")]
    RemoteUnavailable {
        /// Fixture being read.
        fixture: FixtureId,
        /// Last failure reported by the store.
        source: RemoteError,
    },

    /// No snapshot has been loaded for the fixture yet.
    #[error("no snapshot loaded for fixture {0}")]
    NotLoaded(FixtureId),

    /// The edit policy refused staging for this fixture.
    #[error("fixture {0} is read-only for this session")]
    ReadOnly(FixtureId),

    /// All writes were attempted but the follow-up refresh failed.
    ///
    /// The pending set is already cleared; refresh again later.
    #[error("commit finished ({batch}) but refresh failed: {source}")]
    RefreshAfterCommit {
        /// Outcome of the writes.
        batch: BatchResult,
        /// Refresh failure.
        source: Box<Self>,
    },

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for expected operating conditions that a later retry may resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable { .. } | Self::RefreshAfterCommit { .. } | Self::NotLoaded(_)
        )
    }

    /// The batch outcome carried by a post-commit refresh failure.
    pub fn batch(&self) -> Option<&BatchResult> {
        match self {
            Self::RefreshAfterCommit { batch, .. } => Some(batch),
            _ => None,
        }
    }
}
