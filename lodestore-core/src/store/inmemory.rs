//! In-memory reference backend.
//!
//! This implementation is the authoritative source of the engine semantics:
//! other backends must emulate its observable behavior, including the
//! hole-avoidance rule for duplicate indices. It is also the backend of
//! choice for tests and examples.
//!
//! # State
//!
//! Chunks live in a single arena keyed by position (the global log);
//! partitions reference them by position, so no chunk is aliased between the
//! two views. A process-wide mutex protects structural updates and the
//! bounded snapshot copy at the start of a scan; it is never held across an
//! await or a subscription callback.
//!
//! # Hole avoidance
//!
//! Positions are allocated from an atomic counter before the structural
//! write. When the write then fails a uniqueness check (duplicate index or
//! repeated operation), the allocated position would become a permanent hole
//! in the global log; instead a payload-less filler chunk is written to the
//! reserved [`EMPTY_PARTITION_ID`] partition under the same critical
//! section, and the append outcome (error or idempotent no-op) propagates to
//! the caller.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use uuid::Uuid;

use crate::{
    cancel::CancellationToken,
    chunk::{AUTO_INDEX, Chunk, EMPTY_PARTITION_ID, Payload},
    error::StoreError,
    store::Persistence,
    subscription::{Subscription, pump},
};

/// Payload sharing mode.
///
/// With [`Shared`](PayloadCloning::Shared) the store and all readers hold
/// `Arc` clones of the same value. With [`Deep`](PayloadCloning::Deep) the
/// value is re-allocated on store, on the chunk returned from an append, and
/// on every delivery, so the store and its callers never alias one payload.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PayloadCloning {
    /// Hand out `Arc` clones; payloads are shared by reference.
    #[default]
    Shared,
    /// Deep-copy the payload at every store/read boundary.
    Deep,
}

impl PayloadCloning {
    fn apply(self, payload: &Payload) -> Payload {
        match self {
            Self::Shared => Arc::clone(payload),
            Self::Deep => Arc::new((**payload).clone()),
        }
    }
}

/// Configuration knobs for the in-memory store.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Payload sharing mode. Defaults to [`PayloadCloning::Shared`].
    pub cloning: PayloadCloning,
    /// Artificial delay injected before each operation. Test-only knob;
    /// defaults to no delay.
    pub latency: Option<Duration>,
}

/// Thread-safe in-memory chunk store.
///
/// Cloning the store yields a handle to the same state.
///
/// # Example
///
/// ```
/// use lodestore_core::store::inmemory;
///
/// let store = inmemory::Store::new();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Store {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sequence: AtomicI64,
    state: Mutex<State>,
    cloning: PayloadCloning,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct State {
    /// Global log: every chunk, keyed by position.
    chunks: BTreeMap<i64, Chunk>,
    /// Partition views referencing chunks by position.
    partitions: HashMap<String, Partition>,
}

#[derive(Debug, Default)]
struct Partition {
    /// index -> position of the owning chunk.
    by_index: BTreeMap<i64, i64>,
    /// operation id -> index, enforcing append idempotency.
    operations: HashMap<String, i64>,
}

enum WriteOutcome {
    Written,
    DuplicateOperation,
    DuplicateIndex,
}

impl Store {
    /// Create a store with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with explicit options.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            inner: Arc::new(Inner {
                sequence: AtomicI64::new(0),
                state: Mutex::new(State::default()),
                cloning: options.cloning,
                latency: options.latency,
            }),
        }
    }

    /// Scan the global log by descending position starting at
    /// `from_position`, delivering at most `limit` chunks.
    ///
    /// Backward global scans are backend-specific; the reference backend
    /// supports both directions.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation. Read and callback failures
    /// terminate the scan through `on_error` and are not returned.
    #[tracing::instrument(skip(self, subscription, token))]
    pub async fn read_all_backward<S>(
        &self,
        from_position: i64,
        subscription: &mut S,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<(), StoreError>
    where
        S: Subscription,
    {
        self.simulate_latency(token).await?;
        let batch = {
            let state = self.lock();
            state
                .chunks
                .range(..=from_position)
                .rev()
                .take(limit)
                .map(|(_, chunk)| self.deliverable(chunk.clone()))
                .collect()
        };
        pump(subscription, from_position, Ok(batch), |c| c.position, token).await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .expect("in-memory store lock poisoned")
    }

    async fn simulate_latency(&self, token: &CancellationToken) -> Result<(), StoreError> {
        token.check()?;
        if let Some(delay) = self.inner.latency {
            tokio::time::sleep(delay).await;
            token.check()?;
        }
        Ok(())
    }

    /// Re-allocate the payload when deep cloning is configured.
    fn deliverable(&self, mut chunk: Chunk) -> Chunk {
        if self.inner.cloning == PayloadCloning::Deep {
            if let Some(payload) = chunk.payload.as_ref() {
                chunk.payload = Some(Arc::new((**payload).clone()));
            }
        }
        chunk
    }
}

impl State {
    fn write(&mut self, chunk: Chunk) -> WriteOutcome {
        let partition = self
            .partitions
            .entry(chunk.partition_id.clone())
            .or_default();

        // Operation idempotency wins over index uniqueness: a repeated
        // operation is a no-op even when its index would also collide.
        // Either way the allocated position gets a filler so the global log
        // stays gap-free.
        if partition.operations.contains_key(&chunk.operation_id) {
            self.write_filler(chunk.position);
            return WriteOutcome::DuplicateOperation;
        }
        if partition.by_index.contains_key(&chunk.index) {
            self.write_filler(chunk.position);
            return WriteOutcome::DuplicateIndex;
        }

        partition
            .operations
            .insert(chunk.operation_id.clone(), chunk.index);
        partition.by_index.insert(chunk.index, chunk.position);
        self.chunks.insert(chunk.position, chunk);
        WriteOutcome::Written
    }

    /// Keep the allocated position observable after a failed append.
    fn write_filler(&mut self, position: i64) {
        let filler = Chunk {
            position,
            partition_id: EMPTY_PARTITION_ID.to_string(),
            index: position,
            payload: None,
            operation_id: position.to_string(),
            deleted: false,
        };
        let empty = self
            .partitions
            .entry(EMPTY_PARTITION_ID.to_string())
            .or_default();
        empty
            .operations
            .insert(filler.operation_id.clone(), filler.index);
        empty.by_index.insert(filler.index, filler.position);
        self.chunks.insert(position, filler);
    }

    fn delete_range(&mut self, partition_id: &str, from_lower: i64, to_upper: i64) -> usize {
        if from_lower > to_upper {
            return 0;
        }
        let Some(partition) = self.partitions.get_mut(partition_id) else {
            return 0;
        };
        let matched: Vec<(i64, i64)> = partition
            .by_index
            .range(from_lower..=to_upper)
            .map(|(index, position)| (*index, *position))
            .collect();
        for (index, position) in &matched {
            partition.by_index.remove(index);
            if let Some(chunk) = self.chunks.remove(position) {
                partition.operations.remove(&chunk.operation_id);
            }
        }
        if partition.by_index.is_empty() {
            self.partitions.remove(partition_id);
        }
        matched.len()
    }
}

impl Persistence for Store {
    #[tracing::instrument(skip(self, payload, operation_id, token))]
    async fn append<'a>(
        &'a self,
        partition_id: &'a str,
        index: i64,
        payload: Option<Payload>,
        operation_id: Option<&'a str>,
        token: &'a CancellationToken,
    ) -> Result<Option<Chunk>, StoreError> {
        self.simulate_latency(token).await?;

        // No awaits below this line: once a position is allocated it must be
        // written (as a chunk or as a filler) before this call returns.
        let position = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let index = if index == AUTO_INDEX { position } else { index };
        let operation_id =
            operation_id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let payload = payload.map(|p| self.inner.cloning.apply(&p));

        let chunk = Chunk {
            position,
            partition_id: partition_id.to_string(),
            index,
            payload,
            operation_id,
            deleted: false,
        };

        let outcome = {
            let mut state = self.lock();
            let delivered = self.deliverable(chunk.clone());
            match state.write(chunk) {
                WriteOutcome::Written => Ok(Some(delivered)),
                WriteOutcome::DuplicateOperation => Ok(None),
                WriteOutcome::DuplicateIndex => Err(StoreError::DuplicateStreamIndex {
                    partition_id: partition_id.to_string(),
                    index,
                }),
            }
        };

        match &outcome {
            Ok(Some(_)) => tracing::debug!(position, index, "chunk appended"),
            Ok(None) => tracing::debug!(position, index, "duplicate operation, append skipped"),
            Err(_) => tracing::debug!(position, index, "duplicate index, filler written"),
        }
        outcome
    }

    #[tracing::instrument(skip(self, subscription, token))]
    async fn read_forward<'a, S>(
        &'a self,
        partition_id: &'a str,
        from_lower: i64,
        subscription: &'a mut S,
        to_upper: i64,
        limit: usize,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError>
    where
        S: Subscription + 'a,
    {
        self.simulate_latency(token).await?;
        let batch = {
            let state = self.lock();
            partition_slice(&state, partition_id, from_lower, to_upper, limit, false)
                .into_iter()
                .map(|chunk| self.deliverable(chunk))
                .collect()
        };
        pump(subscription, from_lower, Ok(batch), |c| c.index, token).await
    }

    #[tracing::instrument(skip(self, subscription, token))]
    async fn read_backward<'a, S>(
        &'a self,
        partition_id: &'a str,
        from_upper: i64,
        subscription: &'a mut S,
        to_lower: i64,
        limit: usize,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError>
    where
        S: Subscription + 'a,
    {
        self.simulate_latency(token).await?;
        let batch = {
            let state = self.lock();
            partition_slice(&state, partition_id, to_lower, from_upper, limit, true)
                .into_iter()
                .map(|chunk| self.deliverable(chunk))
                .collect()
        };
        pump(subscription, from_upper, Ok(batch), |c| c.index, token).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn read_single_backward<'a>(
        &'a self,
        partition_id: &'a str,
        from_upper: i64,
        token: &'a CancellationToken,
    ) -> Result<Option<Chunk>, StoreError> {
        self.simulate_latency(token).await?;
        let state = self.lock();
        let found = state
            .partitions
            .get(partition_id)
            .and_then(|p| p.by_index.range(..=from_upper).next_back())
            .and_then(|(_, position)| state.chunks.get(position))
            .map(|chunk| self.deliverable(chunk.clone()));
        Ok(found)
    }

    #[tracing::instrument(skip(self, subscription, token))]
    async fn read_all<'a, S>(
        &'a self,
        from_position: i64,
        subscription: &'a mut S,
        limit: usize,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError>
    where
        S: Subscription + 'a,
    {
        self.simulate_latency(token).await?;
        let batch = {
            let state = self.lock();
            state
                .chunks
                .range(from_position..)
                .take(limit)
                .map(|(_, chunk)| self.deliverable(chunk.clone()))
                .collect()
        };
        pump(subscription, from_position, Ok(batch), |c| c.position, token).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn last_position<'a>(&'a self, token: &'a CancellationToken) -> Result<i64, StoreError> {
        self.simulate_latency(token).await?;
        let state = self.lock();
        Ok(state.chunks.keys().next_back().copied().unwrap_or(0))
    }

    #[tracing::instrument(skip(self, token))]
    async fn delete<'a>(
        &'a self,
        partition_id: &'a str,
        from_lower: i64,
        to_upper: i64,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError> {
        self.simulate_latency(token).await?;
        let removed = {
            let mut state = self.lock();
            state.delete_range(partition_id, from_lower, to_upper)
        };
        if removed == 0 {
            return Err(StoreError::StreamDelete(partition_id.to_string()));
        }
        tracing::debug!(removed, "chunks deleted");
        Ok(())
    }

    async fn init<'a>(&'a self, token: &'a CancellationToken) -> Result<(), StoreError> {
        token.check()
    }

    #[tracing::instrument(skip(self, token))]
    async fn destroy_all<'a>(&'a self, token: &'a CancellationToken) -> Result<(), StoreError> {
        token.check()?;
        let mut state = self.lock();
        state.chunks.clear();
        state.partitions.clear();
        drop(state);
        self.inner.sequence.store(0, Ordering::SeqCst);
        Ok(())
    }
}

/// Copy the matching slice of a partition, bounded by `limit`.
///
/// Bounds are inclusive; an inverted range yields an empty slice.
fn partition_slice(
    state: &State,
    partition_id: &str,
    lower: i64,
    upper: i64,
    limit: usize,
    descending: bool,
) -> Vec<Chunk> {
    if lower > upper {
        return Vec::new();
    }
    let Some(partition) = state.partitions.get(partition_id) else {
        return Vec::new();
    };
    let positions: Vec<i64> = if descending {
        partition
            .by_index
            .range(lower..=upper)
            .rev()
            .take(limit)
            .map(|(_, position)| *position)
            .collect()
    } else {
        partition
            .by_index
            .range(lower..=upper)
            .take(limit)
            .map(|(_, position)| *position)
            .collect()
    };
    positions
        .into_iter()
        .filter_map(|position| state.chunks.get(&position).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{chunk::payload, store::PersistenceExt as _, subscription::Collector};

    fn none() -> CancellationToken {
        CancellationToken::new()
    }

    async fn put(store: &Store, partition: &str, index: i64, value: &str) -> Chunk {
        store
            .append(partition, index, Some(payload(json!(value))), None, &none())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn positions_are_allocated_from_one() {
        let store = Store::new();
        let first = put(&store, "S1", 1, "a").await;
        let second = put(&store, "S1", 2, "b").await;
        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);
    }

    #[tokio::test]
    async fn auto_index_uses_the_position() {
        let store = Store::new();
        put(&store, "other", 1, "x").await;
        let chunk = store
            .append("S1", AUTO_INDEX, Some(payload(json!("a"))), None, &none())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk.index, chunk.position);
        assert_eq!(chunk.index, 2);
    }

    #[tokio::test]
    async fn missing_operation_id_gets_generated() {
        let store = Store::new();
        let first = put(&store, "S1", 1, "a").await;
        let second = put(&store, "S1", 2, "b").await;
        assert!(!first.operation_id.is_empty());
        assert_ne!(first.operation_id, second.operation_id);
    }

    #[tokio::test]
    async fn duplicate_index_fails_and_writes_a_filler() {
        let store = Store::new();
        put(&store, "S1", 1, "first").await;
        let err = store
            .append("S1", 1, Some(payload(json!("second"))), None, &none())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicated index 1 on stream S1");

        // The burned position is observable through the reserved partition.
        let mut collector = Collector::new();
        store
            .read_all(0, &mut collector, usize::MAX, &none())
            .await
            .unwrap();
        assert_eq!(collector.positions(), vec![1, 2]);
        assert!(collector.chunks()[1].is_filler());
    }

    #[tokio::test]
    async fn duplicate_operation_is_a_silent_no_op() {
        let store = Store::new();
        store
            .append("S1", 1, Some(payload(json!("a"))), Some("op-1"), &none())
            .await
            .unwrap();
        let second = store
            .append("S1", 2, Some(payload(json!("a"))), Some("op-1"), &none())
            .await
            .unwrap();
        assert!(second.is_none());

        let mut collector = Collector::new();
        store
            .read_partition("S1", &mut collector, &none())
            .await
            .unwrap();
        assert_eq!(collector.indices(), vec![1]);

        // The burned position gets a filler, keeping the log gap-free.
        let mut all = Collector::new();
        store
            .read_all(0, &mut all, usize::MAX, &none())
            .await
            .unwrap();
        assert_eq!(all.positions(), vec![1, 2]);
        assert!(all.chunks()[1].is_filler());
    }

    #[tokio::test]
    async fn operation_match_wins_over_index_collision() {
        let store = Store::new();
        store
            .append("S1", 1, Some(payload(json!("a"))), Some("o1"), &none())
            .await
            .unwrap();
        store
            .append("S1", 2, Some(payload(json!("b"))), Some("o2"), &none())
            .await
            .unwrap();

        // Index 2 collides with o2's chunk, but the repeated operation id
        // still resolves to the idempotent no-op.
        let third = store
            .append("S1", 2, Some(payload(json!("c"))), Some("o1"), &none())
            .await
            .unwrap();
        assert!(third.is_none());
    }

    #[tokio::test]
    async fn same_operation_on_two_partitions_is_allowed() {
        let store = Store::new();
        let a = store
            .append("S1", 1, None, Some("op-1"), &none())
            .await
            .unwrap();
        let b = store
            .append("S2", 1, None, Some("op-1"), &none())
            .await
            .unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn forward_and_backward_scans_agree() {
        let store = Store::new();
        for (i, v) in [(1, "a"), (2, "b"), (3, "c")] {
            put(&store, "S1", i, v).await;
        }

        let mut forward = Collector::new();
        store
            .read_forward("S1", 0, &mut forward, i64::MAX, usize::MAX, &none())
            .await
            .unwrap();
        assert_eq!(forward.indices(), vec![1, 2, 3]);

        let mut backward = Collector::new();
        store
            .read_backward("S1", i64::MAX, &mut backward, i64::MIN, usize::MAX, &none())
            .await
            .unwrap();
        assert_eq!(backward.indices(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn range_and_limit_bound_the_scan() {
        let store = Store::new();
        for i in 1..=5 {
            put(&store, "S1", i, "x").await;
        }

        let mut ranged = Collector::new();
        store
            .read_forward("S1", 2, &mut ranged, 4, usize::MAX, &none())
            .await
            .unwrap();
        assert_eq!(ranged.indices(), vec![2, 3, 4]);

        let mut limited = Collector::new();
        store
            .read_forward("S1", 0, &mut limited, i64::MAX, 2, &none())
            .await
            .unwrap();
        assert_eq!(limited.indices(), vec![1, 2]);
    }

    #[tokio::test]
    async fn inverted_range_is_empty() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        let mut collector = Collector::new();
        store
            .read_forward("S1", 5, &mut collector, 2, usize::MAX, &none())
            .await
            .unwrap();
        assert!(collector.chunks().is_empty());
    }

    #[tokio::test]
    async fn read_single_backward_applies_upper_bound_literally() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        put(&store, "S1", 5, "b").await;

        let found = store.read_single_backward("S1", 4, &none()).await.unwrap();
        assert_eq!(found.unwrap().index, 1);

        let none_found = store.read_single_backward("S1", 0, &none()).await.unwrap();
        assert!(none_found.is_none());
    }

    #[tokio::test]
    async fn peek_returns_the_latest_chunk() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        put(&store, "S1", 9, "b").await;
        let latest = store.peek("S1", &none()).await.unwrap().unwrap();
        assert_eq!(latest.index, 9);
    }

    #[tokio::test]
    async fn delete_range_removes_and_rejects_empty_matches() {
        let store = Store::new();
        for i in 1..=3 {
            put(&store, "S1", i, "x").await;
        }
        store.delete("S1", 2, 2, &none()).await.unwrap();

        let mut collector = Collector::new();
        store
            .read_partition("S1", &mut collector, &none())
            .await
            .unwrap();
        assert_eq!(collector.indices(), vec![1, 3]);

        let err = store
            .delete("unknown", i64::MIN, i64::MAX, &none())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StreamDelete(ref p) if p == "unknown"));

        // Deleting the already-removed index again also matches nothing.
        let err = store.delete_index("S1", 2, &none()).await.unwrap_err();
        assert!(matches!(err, StoreError::StreamDelete(_)));
    }

    #[tokio::test]
    async fn deleting_every_chunk_forgets_the_partition() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        store.delete_partition("S1", &none()).await.unwrap();
        let err = store.delete_partition("S1", &none()).await.unwrap_err();
        assert!(matches!(err, StoreError::StreamDelete(_)));
    }

    #[tokio::test]
    async fn deleted_index_can_be_reused() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        store.delete_index("S1", 1, &none()).await.unwrap();
        let rewritten = store
            .append("S1", 1, Some(payload(json!("b"))), None, &none())
            .await
            .unwrap();
        assert!(rewritten.is_some());
    }

    #[tokio::test]
    async fn last_position_tracks_appends_and_fillers() {
        let store = Store::new();
        assert_eq!(store.last_position(&none()).await.unwrap(), 0);
        put(&store, "S1", 1, "a").await;
        let _ = store.append("S1", 1, None, None, &none()).await;
        assert_eq!(store.last_position(&none()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn read_all_backward_descends_from_the_bound() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        put(&store, "S2", 1, "b").await;
        put(&store, "S1", 2, "c").await;

        let mut collector = Collector::new();
        store
            .read_all_backward(i64::MAX, &mut collector, usize::MAX, &none())
            .await
            .unwrap();
        assert_eq!(collector.positions(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn shared_cloning_aliases_payloads() {
        let store = Store::new();
        let value = payload(json!({"n": 1}));
        let chunk = store
            .append("S1", 1, Some(Arc::clone(&value)), None, &none())
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&value, chunk.payload.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn deep_cloning_isolates_payloads() {
        let store = Store::with_options(Options {
            cloning: PayloadCloning::Deep,
            latency: None,
        });
        let value = payload(json!({"n": 1}));
        let chunk = store
            .append("S1", 1, Some(Arc::clone(&value)), None, &none())
            .await
            .unwrap()
            .unwrap();
        assert!(!Arc::ptr_eq(&value, chunk.payload.as_ref().unwrap()));
        assert_eq!(**chunk.payload.as_ref().unwrap(), json!({"n": 1}));

        let read_back = store
            .read_single_backward("S1", i64::MAX, &none())
            .await
            .unwrap()
            .unwrap();
        assert!(!Arc::ptr_eq(
            chunk.payload.as_ref().unwrap(),
            read_back.payload.as_ref().unwrap()
        ));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_any_write() {
        let store = Store::new();
        let token = CancellationToken::new();
        token.cancel();
        let result = store.append("S1", 1, None, None, &token).await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
        assert_eq!(store.last_position(&none()).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn injected_latency_delays_operations() {
        let store = Store::with_options(Options {
            cloning: PayloadCloning::Shared,
            latency: Some(Duration::from_millis(50)),
        });
        let started = tokio::time::Instant::now();
        put(&store, "S1", 1, "a").await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn destroy_all_resets_positions() {
        let store = Store::new();
        put(&store, "S1", 1, "a").await;
        store.destroy_all(&none()).await.unwrap();
        assert_eq!(store.last_position(&none()).await.unwrap(), 0);
        let fresh = put(&store, "S1", 1, "a").await;
        assert_eq!(fresh.position, 1);
    }
}
