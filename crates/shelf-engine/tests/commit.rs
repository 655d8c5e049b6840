use shelf_engine::{
    BatchOp, BatchResult, EntryOutcome, Error, Fixture, MemoryStore, Product, RemoteCall, SessionState,
    ShelfEvent, test_support::engine_over,
};

fn shelf() -> Fixture {
    Fixture::new(7, 3, 4).unwrap()
}

#[tokio::test]
async fn clearing_milk_commits_one_unassign_and_refreshes_empty() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let slot = engine.index().slot_id(1, 1).unwrap();
    store.put(slot, "milk");
    let before = engine.refresh().await.unwrap();
    assert_eq!(before.product(slot).map(|p| p.name.as_str()), Some("Milk"));

    engine.stage(slot, None).unwrap();
    assert_eq!(engine.pending_count(), (0, 1));
    let batch = engine.commit_all().await.unwrap();

    assert_eq!((batch.succeeded(), batch.failed()), (1, 0));
    assert_eq!(batch.entries()[0].op, BatchOp::Clear);
    assert!(engine.is_empty());
    assert_eq!(engine.merged_view(slot).unwrap(), None);
    let after = engine.snapshot().unwrap();
    assert!(after.product(slot).is_none());
    assert!(after.generation() > before.generation());
}

#[tokio::test]
async fn empty_commit_makes_no_calls() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let batch = engine.commit_all().await.unwrap();
    assert_eq!((batch.succeeded(), batch.failed()), (0, 0));
    assert!(batch.is_empty());
    assert!(store.calls().is_empty());
    assert!(Error::NotLoaded(shelf().id()).batch().is_none());
}

#[tokio::test]
async fn partial_failures_are_tallied_and_pending_is_cleared() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let index = *engine.index();

    // Two occupied slots to clear, one of them locked.
    let clear_ok = index.slot_id(3, 1).unwrap();
    let clear_locked = index.slot_id(3, 2).unwrap();
    store.put(clear_ok, "rice");
    store.put(clear_locked, "tea");
    store.set_fail_slot(clear_locked, true);
    engine.refresh().await.unwrap();

    // Three assignments, one to a locked slot.
    let locked = index.slot_id(1, 4).unwrap();
    store.set_fail_slot(locked, true);
    engine.stage_at(1, 1, Some(Product::new("milk", "Milk"))).unwrap();
    engine.stage_at(1, 2, Some(Product::new("eggs", "Eggs"))).unwrap();
    engine.stage(locked, Some(Product::new("bread", "Bread"))).unwrap();
    engine.stage(clear_ok, None).unwrap();
    engine.stage(clear_locked, None).unwrap();
    assert_eq!(engine.pending_count(), (3, 2));
    store.reset_calls();

    let batch = engine.commit_all().await.unwrap();

    assert_eq!((batch.succeeded(), batch.failed()), (3, 2));
    assert_eq!(engine.state(), SessionState::Clean);
    let failed: Vec<_> = batch.failures().map(|e| e.slot).collect();
    assert_eq!(failed, vec![locked, clear_locked]);
    assert!(matches!(
        batch.failures().next().map(|e| &e.outcome),
        Some(EntryOutcome::Failed(_))
    ));

    // Reconciled view reflects ground truth, not the optimistic intent.
    assert_eq!(
        engine.merged_view(index.slot_id(1, 1).unwrap()).unwrap().map(|p| p.name.as_str()),
        Some("Milk")
    );
    assert!(engine.merged_view(locked).unwrap().is_none());
    assert!(engine.merged_view(clear_ok).unwrap().is_none());
    assert_eq!(store.occupant(clear_ok), None);
    assert_eq!(store.occupant(clear_locked).as_ref().map(|p| p.as_str()), Some("tea"));
    assert_eq!(store.occupant(locked), None);
    assert_eq!(
        engine.merged_view(clear_locked).unwrap().map(|p| p.name.as_str()),
        Some("Tea")
    );
}

#[tokio::test]
async fn writes_are_assignments_first_then_removals_in_slot_order() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    let index = *engine.index();
    let a = index.slot_id(1, 1).unwrap();
    let b = index.slot_id(2, 3).unwrap();
    let c = index.slot_id(3, 4).unwrap();
    store.put(a, "tea");
    engine.refresh().await.unwrap();

    engine.stage(c, Some(Product::new("rice", "Rice"))).unwrap();
    engine.stage(a, None).unwrap();
    engine.stage(b, Some(Product::new("milk", "Milk"))).unwrap();
    store.reset_calls();
    engine.commit_all().await.unwrap();

    let writes: Vec<_> = store.calls().into_iter().filter(RemoteCall::is_write).collect();
    assert_eq!(
        writes,
        vec![
            RemoteCall::Assign {
                product: "milk".into(),
                slot: b
            },
            RemoteCall::Assign {
                product: "rice".into(),
                slot: c
            },
            RemoteCall::Unassign(a),
        ]
    );
    assert_eq!(store.read_count(), 1, "one refresh after the writes");
}

#[tokio::test]
async fn n_entries_with_k_failures() {
    for k in 0..=4 {
        let store = MemoryStore::new();
        let mut engine = engine_over(shelf(), &store);
        let slots: Vec<_> = engine.index().slots().take(6).collect();
        for (i, slot) in slots.iter().enumerate() {
            if i < k {
                store.set_fail_slot(*slot, true);
            }
            engine.stage(*slot, Some(Product::new("tea", "Tea"))).unwrap();
        }
        let batch = engine.commit_all().await.unwrap();
        assert_eq!(batch.succeeded(), 6 - k);
        assert_eq!(batch.failed(), k);
        assert!(engine.is_empty());
    }
}

#[tokio::test]
async fn refresh_failure_after_commit_carries_batch() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    engine.refresh().await.unwrap();
    engine.stage_at(2, 2, Some(Product::new("milk", "Milk"))).unwrap();
    // More read failures than the retry budget.
    store.fail_next_reads(10);

    let err = engine.commit_all().await.unwrap_err();
    let Error::RefreshAfterCommit { batch, source } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!((batch.succeeded(), batch.failed()), (1, 0));
    assert!(matches!(**source, Error::RemoteUnavailable { .. }));
    assert_eq!(err.batch().map(BatchResult::succeeded), Some(1));
    assert!(err.is_transient());
    assert!(engine.is_empty(), "pending stays cleared after refresh failure");

    // Stale-but-consistent: the pre-commit snapshot is still served.
    let slot = engine.index().slot_id(2, 2).unwrap();
    assert_eq!(engine.snapshot().unwrap().generation(), 1);
    assert!(engine.merged_view(slot).unwrap().is_none());

    // A later refresh catches up.
    store.fail_next_reads(0);
    engine.refresh().await.unwrap();
    assert_eq!(
        engine.merged_view(slot).unwrap().map(|p| p.id.as_str()),
        Some("milk")
    );
}

#[tokio::test]
async fn commit_publishes_summary_and_refresh() {
    let store = MemoryStore::new();
    let mut engine = engine_over(shelf(), &store);
    engine.stage_at(1, 1, Some(Product::new("milk", "Milk"))).unwrap();
    let mut rx = engine.subscribe();
    engine.commit_all().await.unwrap();

    assert!(matches!(
        rx.recv().await.unwrap(),
        ShelfEvent::Committed {
            succeeded: 1,
            failed: 0,
            ..
        }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        ShelfEvent::Refreshed { generation: 1, .. }
    ));
}
