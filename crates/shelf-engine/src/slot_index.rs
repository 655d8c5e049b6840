//! Slot identifier math: the single mapping between grid positions and slot ids.

use shelf_ids::SlotId;

use crate::{Error, Fixture, Result};

/// Map a 1-based `(row, column)` position of `fixture` to its slot id.
pub fn slot_id(fixture: &Fixture, row: u32, column: u32) -> Result<SlotId> {
    if row == 0 || column == 0 || row > fixture.rows() || column > fixture.columns() {
        return Err(Error::OutOfBounds {
            fixture: fixture.id(),
            row,
            column,
            rows: fixture.rows(),
            columns: fixture.columns(),
        });
    }
    let ordinal = (row - 1) * fixture.columns() + (column - 1);
    Ok(SlotId::from_parts(fixture.id(), ordinal))
}

/// Inverse of [`slot_id`]: recover the 1-based `(row, column)` of a slot.
pub fn position(fixture: &Fixture, slot: SlotId) -> Result<(u32, u32)> {
    if slot.fixture() != fixture.id() || slot.ordinal() >= fixture.slot_count() {
        return Err(Error::UnknownSlot {
            fixture: fixture.id(),
            slot,
        });
    }
    let row = slot.ordinal() / fixture.columns() + 1;
    let column = slot.ordinal() % fixture.columns() + 1;
    Ok((row, column))
}

/// Slot index bound to one fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotIndex {
    /// Fixture whose slots this index addresses.
    fixture: Fixture,
}

impl SlotIndex {
    /// Create an index for `fixture`.
    pub const fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    /// The indexed fixture.
    pub const fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// See [`slot_id`].
    pub fn slot_id(&self, row: u32, column: u32) -> Result<SlotId> {
        slot_id(&self.fixture, row, column)
    }

    /// See [`position`].
    pub fn position(&self, slot: SlotId) -> Result<(u32, u32)> {
        position(&self.fixture, slot)
    }

    /// True when `slot` was minted by this index.
    pub fn contains(&self, slot: SlotId) -> bool {
        self.position(slot).is_ok()
    }

    /// Reject slots minted elsewhere.
    pub fn check(&self, slot: SlotId) -> Result<()> {
        self.position(slot).map(|_| ())
    }

    /// Every slot of the fixture in row-major order.
    pub fn slots(&self) -> impl Iterator<Item = SlotId> + use<> {
        let id = self.fixture.id();
        (0..self.fixture.slot_count()).map(move |ordinal| SlotId::from_parts(id, ordinal))
    }
}
