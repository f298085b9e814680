//! Snapshot persistence for aggregate-style consumers.
//!
//! The store keeps at most one snapshot per `(aggregate, version)` pair and
//! rejects writes whose version is not strictly greater than the latest one,
//! so replaying consumers can trust that a stored snapshot never moves
//! backwards. This module provides:
//!
//! - [`SnapshotInfo`] - one persisted snapshot
//! - [`SnapshotStore`] - the persistence contract
//! - [`NoSnapshots`] - no-op implementation for consumers that replay from
//!   scratch
//! - [`inmemory`] - in-memory reference implementation

use std::future::Future;

use crate::{cancel::CancellationToken, chunk::Payload, error::StoreError};

pub mod inmemory;

/// Point-in-time aggregate state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Aggregate the snapshot belongs to.
    pub aggregate_id: String,
    /// Aggregate version at snapshot time. Strictly increasing per aggregate.
    pub version: i64,
    /// Opaque snapshot payload.
    pub payload: Option<Payload>,
    /// Payload schema marker, interpreted by the consumer.
    pub schema_version: String,
}

/// At-most-once-per-version snapshot persistence.
pub trait SnapshotStore: Send + Sync {
    /// Load the most recent snapshot with `version <= requested`.
    ///
    /// Returns `None` when the aggregate has no snapshot at or below the
    /// requested version. Pass `i64::MAX` for the latest snapshot.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation; [`StoreError::Persistence`]
    /// on backend failure.
    fn get<'a>(
        &'a self,
        aggregate_id: &'a str,
        version: i64,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<Option<SnapshotInfo>, StoreError>> + Send + 'a;

    /// Persist a snapshot. Returns `true` when it was stored.
    ///
    /// # Errors
    ///
    /// [`StoreError::StaleSnapshot`] when `info.version` is not strictly
    /// greater than the latest stored version for the aggregate;
    /// [`StoreError::Cancelled`] on cancellation;
    /// [`StoreError::Persistence`] on backend failure.
    fn add<'a>(
        &'a self,
        aggregate_id: &'a str,
        info: SnapshotInfo,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send + 'a;

    /// Remove every snapshot with version in `[from_version, to_version]`.
    /// Idempotent: removing nothing is not an error.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation; [`StoreError::Persistence`]
    /// on backend failure.
    fn remove<'a>(
        &'a self,
        aggregate_id: &'a str,
        from_version: i64,
        to_version: i64,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;
}

/// No-op snapshot store.
///
/// Loads nothing, stores nothing (`add` reports `false`), removes nothing.
/// Use when consumers always replay from the start of the stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSnapshots;

impl NoSnapshots {
    /// Create a no-op snapshot store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotStore for NoSnapshots {
    async fn get<'a>(
        &'a self,
        _aggregate_id: &'a str,
        _version: i64,
        token: &'a CancellationToken,
    ) -> Result<Option<SnapshotInfo>, StoreError> {
        token.check()?;
        Ok(None)
    }

    async fn add<'a>(
        &'a self,
        _aggregate_id: &'a str,
        _info: SnapshotInfo,
        token: &'a CancellationToken,
    ) -> Result<bool, StoreError> {
        token.check()?;
        Ok(false)
    }

    async fn remove<'a>(
        &'a self,
        _aggregate_id: &'a str,
        _from_version: i64,
        _to_version: i64,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError> {
        token.check()
    }
}
