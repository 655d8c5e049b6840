//! Shelf Engine
//!
//! The shelf engine coordinates staged edits to the slots of a grid-shaped
//! storage fixture:
//! - stages product assignments and slot clears locally, without remote calls
//! - commits the whole pending set as independent remote writes
//! - tallies per-entry outcomes into a [`BatchResult`]
//! - re-reads the authoritative occupancy afterward and merges it with any
//!   pending intent for display
//!
//! The primary type is [`ReconciliationEngine`]. Remote collaborators are
//! injected through the [`RemoteStore`], [`Catalog`] and [`EditPolicy`]
//! traits; [`MemoryStore`] is an in-process store for tests and simulation.
use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

mod batch;
mod cache;
mod config;
mod engine;
mod error;
mod events;
mod memory;
mod pending;
mod remote;
mod slot_index;
pub mod test_support;

pub use batch::{BatchEntry, BatchOp, BatchResult, EntryOutcome};
pub use cache::{RemoteSnapshot, RemoteStateCache, merge};
pub use config::{EngineCfg, RefreshPolicy};
pub use engine::ReconciliationEngine;
pub use error::{Error, Result};
pub use events::ShelfEvent;
pub use memory::{MemoryStore, RemoteCall};
pub use pending::{PendingChange, PendingChangeSet};
pub use remote::{AllowAll, Catalog, EditPolicy, RemoteError, RemoteStore, StaticCatalog};
pub use shelf_ids::{FixtureId, ProductId, SlotId};
pub use slot_index::{SlotIndex, position, slot_id};

/// A product as supplied by the catalog. The engine never mutates products.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier written to the remote store.
    pub id: ProductId,
    /// Human-readable display name.
    pub name: String,
    /// Free-form display attributes (brand, size, colour...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Product {
    /// Construct a product with a display name and no attributes.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// A product known only by its identifier; the id doubles as the name.
    pub fn bare(id: ProductId) -> Self {
        let name = id.as_str().to_string();
        Self {
            id,
            name,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach a display attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A storage fixture laid out as a `rows x columns` grid of slots.
///
/// Geometry is fixed for the lifetime of an editing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fixture {
    /// Fixture identifier.
    id: FixtureId,
    /// Number of rows, at least one.
    rows: u32,
    /// Number of columns, at least one.
    columns: u32,
}

impl Fixture {
    /// Construct a fixture, rejecting empty geometry or a slot count that
    /// does not fit a slot ordinal.
    pub fn new(id: impl Into<FixtureId>, rows: u32, columns: u32) -> Result<Self> {
        let id = id.into();
        if rows == 0 || columns == 0 || rows.checked_mul(columns).is_none() {
            return Err(Error::InvalidGeometry {
                fixture: id,
                rows,
                columns,
            });
        }
        Ok(Self { id, rows, columns })
    }

    /// Fixture identifier.
    pub const fn id(&self) -> FixtureId {
        self.id
    }

    /// Number of rows.
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Total number of slots.
    pub const fn slot_count(&self) -> u32 {
        self.rows * self.columns
    }
}

/// Editing-session state derived from the pending change set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No staged changes.
    Clean,
    /// At least one staged change awaits commit or cancel.
    Dirty,
}
