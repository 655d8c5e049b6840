//! Execute a scenario against a [`MemoryStore`] and emit JSON report lines.

use std::{collections::HashMap, io::Write, sync::Arc};

use serde_json::{Value, json};
use shelf_engine::{
    Error as EngineError, Fixture, MemoryStore, Product, ProductId, ReconciliationEngine,
    StaticCatalog,
};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    scenario::{Scenario, Step},
};

/// Totals across all commits of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Commits executed.
    pub commits: usize,
    /// Writes accepted.
    pub succeeded: usize,
    /// Writes failed.
    pub failed: usize,
    /// Post-commit refreshes that failed.
    pub refresh_failures: usize,
}

/// Drives one scenario.
pub struct Runner {
    /// Editing session under test.
    engine: ReconciliationEngine,
    /// Store handle kept for outage toggles.
    store: MemoryStore,
    /// Products by id, for resolving stage steps.
    products: HashMap<ProductId, Product>,
}

impl Runner {
    /// Seed a store from the scenario and build the session.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let spec = scenario.fixture;
        let fixture = Fixture::new(spec.id, spec.rows, spec.columns)?;
        let store = MemoryStore::new();
        for placement in &scenario.occupancy {
            let slot = shelf_engine::slot_id(&fixture, placement.row, placement.column)?;
            store.put(slot, placement.product.as_str());
        }
        for cell in &scenario.fail {
            let slot = shelf_engine::slot_id(&fixture, cell.row, cell.column)?;
            store.set_fail_slot(slot, true);
        }
        let catalog: StaticCatalog = scenario.catalog.iter().cloned().collect();
        let cfg = scenario.config.clone().unwrap_or_default();
        cfg.validate()?;
        let engine = ReconciliationEngine::new(
            fixture,
            Arc::new(store.clone()),
            Arc::new(catalog),
            &cfg,
        );
        let products = scenario
            .catalog
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        Ok(Self {
            engine,
            store,
            products,
        })
    }

    /// Load the initial snapshot, run every step, and write one JSON line per
    /// commit, refresh and show step.
    pub async fn run(&mut self, steps: &[Step], out: &mut impl Write) -> Result<RunSummary> {
        self.engine.refresh().await?;
        let mut summary = RunSummary::default();
        for (index, step) in steps.iter().enumerate() {
            debug!(index, ?step, "step");
            match step {
                Step::Stage {
                    row,
                    column,
                    product,
                } => {
                    let product = product
                        .as_deref()
                        .map(|id| self.product(index, id))
                        .transpose()?;
                    self.engine.stage_at(*row, *column, product)?;
                }
                Step::Cancel => {
                    let discarded = self.engine.cancel_all();
                    info!(discarded, "cancelled");
                }
                Step::Commit => {
                    let line = self.commit(index, &mut summary).await?;
                    writeln!(out, "{}", serde_json::to_string(&line)?)?;
                }
                Step::Refresh => {
                    let line = match self.engine.refresh().await {
                        Ok(snap) => {
                            json!({"step": index, "refresh": {"generation": snap.generation()}})
                        }
                        Err(err) if err.is_transient() => {
                            warn!(error = %err, "refresh failed");
                            json!({"step": index, "refresh": {"error": err.to_string()}})
                        }
                        Err(err) => return Err(err.into()),
                    };
                    writeln!(out, "{}", serde_json::to_string(&line)?)?;
                }
                Step::Show => {
                    let line = self.show(index)?;
                    writeln!(out, "{}", serde_json::to_string(&line)?)?;
                }
                Step::Offline(offline) => {
                    self.store.set_unavailable(*offline);
                    info!(offline, "store availability changed");
                }
            }
        }
        Ok(summary)
    }

    /// Resolve a product id named by step `index`.
    fn product(&self, index: usize, id: &str) -> Result<Product> {
        self.products
            .get(&ProductId::from(id))
            .cloned()
            .ok_or_else(|| Error::UnknownProduct {
                step: index,
                product: id.to_string(),
            })
    }

    /// Commit and render the report line. A failed follow-up refresh is
    /// reported, not fatal.
    async fn commit(&mut self, index: usize, summary: &mut RunSummary) -> Result<Value> {
        let (batch, refresh_error) = match self.engine.commit_all().await {
            Ok(batch) => (batch, None),
            Err(EngineError::RefreshAfterCommit { batch, source }) => {
                warn!(error = %source, "refresh after commit failed");
                summary.refresh_failures += 1;
                (batch, Some(source.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        summary.commits += 1;
        summary.succeeded += batch.succeeded();
        summary.failed += batch.failed();
        let mut line = json!({
            "step": index,
            "commit": serde_json::to_value(&batch)?,
        });
        if let Some(err) = refresh_error {
            line["refresh_error"] = Value::String(err);
        }
        Ok(line)
    }

    /// Render the merged grid as rows of product ids (or null).
    fn show(&self, index: usize) -> Result<Value> {
        let fixture = *self.engine.fixture();
        let mut rows = vec![vec![Value::Null; fixture.columns() as usize]; fixture.rows() as usize];
        for (slot, product) in self.engine.merged_grid() {
            let (row, column) = self.engine.index().position(slot)?;
            if let Some(product) = product {
                rows[row as usize - 1][column as usize - 1] = Value::String(product.id.to_string());
            }
        }
        let (assignments, removals) = self.engine.pending_count();
        Ok(json!({
            "step": index,
            "state": self.engine.state(),
            "pending": {"assignments": assignments, "removals": removals},
            "grid": rows,
        }))
    }
}
