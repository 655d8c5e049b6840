//! Minimal test support utilities for `shelf-engine` consumers.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::runtime::Builder;

use crate::{
    EngineCfg, Fixture, MemoryStore, Product, ReconciliationEngine, RefreshPolicy, StaticCatalog,
};

/// Engine configuration that retries refreshes without waiting.
pub fn fast_cfg() -> EngineCfg {
    EngineCfg {
        refresh: RefreshPolicy {
            attempts: 3,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        },
        ..EngineCfg::default()
    }
}

/// A small grocery catalog used across tests and demos.
pub fn grocery_catalog() -> StaticCatalog {
    [
        Product::new("milk", "Milk").with_attribute("size", "1l"),
        Product::new("eggs", "Eggs").with_attribute("size", "dozen"),
        Product::new("bread", "Bread"),
        Product::new("tea", "Tea"),
        Product::new("rice", "Rice"),
    ]
    .into_iter()
    .collect()
}

/// Build an engine over `store` with the grocery catalog and [`fast_cfg`].
pub fn engine_over(fixture: Fixture, store: &MemoryStore) -> ReconciliationEngine {
    ReconciliationEngine::new(
        fixture,
        Arc::new(store.clone()),
        Arc::new(grocery_catalog()),
        &fast_cfg(),
    )
}

/// Run an async test body on its own two-worker runtime, then shut the
/// runtime down without waiting on stray tasks.
pub fn run_async_test<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let rt = Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("build test runtime");
    rt.block_on(fut);
    rt.shutdown_timeout(Duration::from_millis(50));
}
