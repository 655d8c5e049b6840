//! Shared identifiers for fixtures, slots and products.
#![warn(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a storage fixture (a shelf).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureId(u64);

impl FixtureId {
    /// Wrap a raw fixture number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw fixture number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for FixtureId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Identifier for one slot of a fixture.
///
/// A slot id couples the owning fixture with the slot's row-major ordinal.
/// Only a fixture's slot index should mint these, so that identifier math
/// lives in exactly one place. The derived ordering is row-major within a
/// fixture, which gives collections keyed by `SlotId` a stable report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId {
    /// Fixture owning the slot.
    fixture: FixtureId,
    /// Zero-based row-major ordinal within the fixture.
    ordinal: u32,
}

impl SlotId {
    /// Construct an identifier from its raw parts.
    ///
    /// This performs no bounds checking; prefer a fixture's slot index.
    #[must_use]
    pub const fn from_parts(fixture: FixtureId, ordinal: u32) -> Self {
        Self { fixture, ordinal }
    }

    /// Fixture owning the slot.
    #[must_use]
    pub const fn fixture(self) -> FixtureId {
        self.fixture
    }

    /// Zero-based row-major ordinal within the fixture.
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.fixture, self.ordinal)
    }
}

/// Opaque product identifier as issued by the product catalog.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Wrap a catalog identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
