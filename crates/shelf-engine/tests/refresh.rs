use std::{sync::Arc, time::Duration};

use shelf_engine::{
    EngineCfg, Error, Fixture, FixtureId, MemoryStore, PendingChange, Product,
    ReconciliationEngine, RefreshPolicy, RemoteCall, RemoteStateCache, ShelfEvent, SlotId,
    test_support::{engine_over, grocery_catalog, run_async_test},
};

fn shelf() -> Fixture {
    Fixture::new(7, 3, 4).unwrap()
}

#[tokio::test]
async fn snapshot_before_refresh_is_not_loaded() {
    let store = MemoryStore::new();
    let engine = engine_over(shelf(), &store);
    assert!(matches!(
        engine.snapshot(),
        Err(Error::NotLoaded(id)) if id == FixtureId::new(7)
    ));
}

#[tokio::test]
async fn transient_read_failures_are_retried() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let slot = engine.index().slot_id(2, 4).unwrap();
    store.put(slot, "eggs");
    store.fail_next_reads(2);

    let snap = engine.refresh().await.unwrap();
    assert_eq!(snap.product(slot).map(|p| p.name.as_str()), Some("Eggs"));
    assert_eq!(store.read_count(), 3);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let slot = engine.index().slot_id(1, 1).unwrap();
    store.put(slot, "milk");
    engine.refresh().await.unwrap();
    let mut rx = engine.subscribe();

    store.put(slot, "tea");
    store.set_unavailable(true);
    let err = engine.refresh().await.unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable { .. }));
    assert!(err.is_transient());

    let snap = engine.snapshot().unwrap();
    assert_eq!(snap.generation(), 1);
    assert_eq!(snap.product(slot).map(|p| p.id.as_str()), Some("milk"));
    assert!(matches!(
        rx.recv().await.unwrap(),
        ShelfEvent::RefreshFailed { .. }
    ));

    store.set_unavailable(false);
    let snap = engine.refresh().await.unwrap();
    assert_eq!(snap.generation(), 2);
    assert_eq!(snap.product(slot).map(|p| p.id.as_str()), Some("tea"));
}

#[tokio::test]
async fn readers_keep_their_snapshot_across_refresh() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let slot = engine.index().slot_id(3, 3).unwrap();
    store.put(slot, "rice");
    let held = engine.refresh().await.unwrap();

    store.put(slot, "bread");
    engine.refresh().await.unwrap();
    assert_eq!(held.product(slot).map(|p| p.id.as_str()), Some("rice"));
    assert_eq!(
        engine.snapshot().unwrap().product(slot).map(|p| p.id.as_str()),
        Some("bread")
    );
}

#[tokio::test]
async fn unknown_products_and_foreign_slots() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let slot = engine.index().slot_id(1, 2).unwrap();
    store.put(slot, "sku-991");
    // An id the store should never return for this fixture.
    store.put(SlotId::from_parts(FixtureId::new(7), 40), "milk");

    let snap = engine.refresh().await.unwrap();
    let product = snap.product(slot).unwrap();
    assert_eq!(product.name, "sku-991");
    assert!(product.attributes.is_empty());
    assert_eq!(snap.occupied(), 1);
}

#[tokio::test]
async fn merged_grid_combines_pending_and_remote() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let index = *engine.index();
    store.put(index.slot_id(1, 1).unwrap(), "milk");
    store.put(index.slot_id(1, 2).unwrap(), "bread");
    engine.refresh().await.unwrap();

    engine.stage_at(1, 2, None).unwrap();
    engine.stage_at(3, 4, Some(Product::new("tea", "Tea"))).unwrap();

    let grid = engine.merged_grid();
    assert_eq!(grid.len(), 12);
    let names: Vec<_> = grid
        .iter()
        .filter_map(|(slot, p)| p.map(|p| (index.position(*slot).unwrap(), p.name.clone())))
        .collect();
    assert_eq!(
        names,
        vec![((1, 1), "Milk".to_string()), ((3, 4), "Tea".to_string())]
    );
    // Staging never touches the snapshot.
    assert_eq!(engine.snapshot().unwrap().occupied(), 2);
}

#[tokio::test(start_paused = true)]
async fn backoff_waits_between_attempts() {
    let store = MemoryStore::new();
    let cfg = EngineCfg {
        refresh: RefreshPolicy {
            attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
        },
        ..EngineCfg::default()
    };
    let mut engine = ReconciliationEngine::new(
        shelf(),
        Arc::new(store.clone()),
        Arc::new(grocery_catalog()),
        &cfg,
    );
    store.fail_next_reads(2);
    let start = tokio::time::Instant::now();
    engine.refresh().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[test]
fn cache_serves_several_fixtures() {
    run_async_test(async {
        let store = MemoryStore::new();
        let a = Fixture::new(1, 2, 2).unwrap();
        let b = Fixture::new(2, 1, 5).unwrap();
        let milk_slot = shelf_engine::slot_id(&a, 2, 2).unwrap();
        store.put(milk_slot, "milk");
        store.put(shelf_engine::slot_id(&b, 1, 5).unwrap(), "tea");

        let mut cache = RemoteStateCache::new(
            Arc::new(store.clone()),
            Arc::new(grocery_catalog()),
            RefreshPolicy::once(),
        );
        assert!(matches!(cache.current(a.id()), Err(Error::NotLoaded(_))));
        cache.refresh(&a).await.unwrap();
        cache.refresh(&b).await.unwrap();
        let held: Vec<_> = cache
            .current(a.id())
            .unwrap()
            .iter()
            .map(|(slot, p)| (slot, p.name.clone()))
            .collect();
        assert_eq!(held, vec![(milk_slot, "Milk".to_string())]);
        assert_eq!(cache.current(b.id()).unwrap().occupied(), 1);
        assert_eq!(
            store.calls(),
            vec![RemoteCall::Read(a.id()), RemoteCall::Read(b.id())]
        );
    });
}

#[tokio::test]
async fn refresh_drops_clears_of_slots_found_empty() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let stocked = engine.index().slot_id(1, 1).unwrap();
    let bare = engine.index().slot_id(2, 3).unwrap();
    store.put(stocked, "milk");

    // Nothing loaded yet, so both clears are staged.
    engine.stage(stocked, None).unwrap();
    engine.stage(bare, None).unwrap();
    assert_eq!(engine.pending_count(), (0, 2));
    let mut rx = engine.subscribe();

    engine.refresh().await.unwrap();
    assert_eq!(engine.pending().get(stocked), Some(&PendingChange::Remove));
    assert_eq!(engine.pending().get(bare), None);
    assert_eq!(
        rx.recv().await.unwrap(),
        ShelfEvent::Staged {
            slot: bare,
            change: None
        }
    );
    assert!(matches!(
        rx.recv().await.unwrap(),
        ShelfEvent::Refreshed { generation: 1, .. }
    ));

    store.reset_calls();
    let batch = engine.commit_all().await.unwrap();
    assert_eq!((batch.succeeded(), batch.failed()), (1, 0));
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.occupant(stocked), None);
}
