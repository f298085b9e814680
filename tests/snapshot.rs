//! Snapshot-contract tests against the in-memory snapshot store.

use lodestore::{
    CancellationToken, NoSnapshots, SnapshotInfo, SnapshotStore, StoreError, payload,
    snapshot::inmemory,
};
use serde_json::json;

fn none() -> CancellationToken {
    CancellationToken::new()
}

fn info(aggregate: &str, version: i64) -> SnapshotInfo {
    SnapshotInfo {
        aggregate_id: aggregate.to_string(),
        version,
        payload: Some(payload(json!({"balance": version * 10}))),
        schema_version: "1".to_string(),
    }
}

#[tokio::test]
async fn add_then_get_returns_the_stored_snapshot() {
    let store = inmemory::Store::new();
    assert!(store.add("acct-1", info("acct-1", 3), &none()).await.unwrap());

    let loaded = store.get("acct-1", 3, &none()).await.unwrap().unwrap();
    assert_eq!(loaded.version, 3);
    assert_eq!(**loaded.payload.as_ref().unwrap(), json!({"balance": 30}));
}

#[tokio::test]
async fn get_falls_back_to_the_nearest_lower_version() {
    let store = inmemory::Store::new();
    store.add("acct-1", info("acct-1", 2), &none()).await.unwrap();
    store.add("acct-1", info("acct-1", 8), &none()).await.unwrap();

    let at_five = store.get("acct-1", 5, &none()).await.unwrap().unwrap();
    assert_eq!(at_five.version, 2);
    assert!(store.get("acct-1", 1, &none()).await.unwrap().is_none());
}

#[tokio::test]
async fn versions_must_strictly_increase() {
    let store = inmemory::Store::new();
    store.add("acct-1", info("acct-1", 5), &none()).await.unwrap();

    let err = store.add("acct-1", info("acct-1", 5), &none()).await;
    assert!(matches!(
        err,
        Err(StoreError::StaleSnapshot { ref aggregate_id, version: 5 }) if aggregate_id == "acct-1"
    ));
    assert!(store.add("acct-1", info("acct-1", 4), &none()).await.is_err());
    assert!(store.add("acct-1", info("acct-1", 6), &none()).await.unwrap());
}

#[tokio::test]
async fn remove_then_get_skips_the_removed_versions() {
    let store = inmemory::Store::new();
    for version in [1, 2, 3] {
        store
            .add("acct-1", info("acct-1", version), &none())
            .await
            .unwrap();
    }

    store.remove("acct-1", 2, 3, &none()).await.unwrap();
    let latest = store.get("acct-1", i64::MAX, &none()).await.unwrap().unwrap();
    assert_eq!(latest.version, 1);

    // Idempotent, including on unknown aggregates.
    store.remove("acct-1", 2, 3, &none()).await.unwrap();
    store.remove("ghost", 0, i64::MAX, &none()).await.unwrap();
}

#[tokio::test]
async fn no_snapshots_is_a_transparent_stub() {
    let store = NoSnapshots::new();
    assert!(store.get("a", i64::MAX, &none()).await.unwrap().is_none());
    assert!(!store.add("a", info("a", 1), &none()).await.unwrap());
    store.remove("a", 0, i64::MAX, &none()).await.unwrap();
}

#[tokio::test]
async fn cancellation_surfaces_from_snapshot_operations() {
    let store = inmemory::Store::new();
    let token = CancellationToken::new();
    token.cancel();

    assert!(matches!(
        store.get("a", i64::MAX, &token).await,
        Err(StoreError::Cancelled)
    ));
    assert!(matches!(
        store.add("a", info("a", 1), &token).await,
        Err(StoreError::Cancelled)
    ));
    assert!(matches!(
        store.remove("a", 0, i64::MAX, &token).await,
        Err(StoreError::Cancelled)
    ));
}
