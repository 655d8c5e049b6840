//! Scenario file schema.

use std::{fs, path::Path};

use serde::Deserialize;
use shelf_engine::{EngineCfg, Product};

use crate::error::{Error, Result};

/// A scripted editing session.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Fixture geometry.
    pub fixture: FixtureSpec,
    /// Products known to the catalog.
    #[serde(default)]
    pub catalog: Vec<Product>,
    /// Initial remote occupancy.
    #[serde(default)]
    pub occupancy: Vec<Placement>,
    /// Slots whose remote writes are rejected.
    #[serde(default)]
    pub fail: Vec<Cell>,
    /// Engine settings; defaults when absent.
    #[serde(default)]
    pub config: Option<EngineCfg>,
    /// Steps to run in order.
    pub steps: Vec<Step>,
}

/// Fixture geometry.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSpec {
    /// Fixture number.
    pub id: u64,
    /// Row count.
    pub rows: u32,
    /// Column count.
    pub columns: u32,
}

/// A product placed at a 1-based position.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Placement {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub column: u32,
    /// Product id.
    pub product: String,
}

/// A 1-based position.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cell {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub column: u32,
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
pub enum Step {
    /// Stage an assignment (`product: Some(..)`) or a clear (`None`).
    Stage {
        /// 1-based row.
        row: u32,
        /// 1-based column.
        column: u32,
        /// Product id to place, or `None` to clear.
        product: Option<String>,
    },
    /// Discard all staged changes.
    Cancel,
    /// Commit staged changes and refresh.
    Commit,
    /// Re-read the fixture.
    Refresh,
    /// Report the merged grid.
    Show,
    /// Take the whole store offline (`true`) or back online.
    Offline(bool),
}

impl Scenario {
    /// Parse scenario text.
    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }
}
