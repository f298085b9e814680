//! The persistence engine contract.
//!
//! [`Persistence`] defines append/scan/delete/read-last-position semantics
//! that every backend must satisfy with identical observable behavior. The
//! [`inmemory`] module holds the reference implementation, which is the
//! authoritative source of those semantics; the relational backend lives in
//! a separate crate and must emulate it.
//!
//! # Range and limit sentinels
//!
//! - `index ==` [`AUTO_INDEX`](crate::chunk::AUTO_INDEX) in an append assigns
//!   the index from the allocated position.
//! - `i64::MAX` as an upper bound and `i64::MIN` as a lower bound mean
//!   "unbounded".
//! - `usize::MAX` as a limit means "unbounded".

use std::future::Future;

use crate::{
    cancel::CancellationToken,
    chunk::{Chunk, Payload},
    error::StoreError,
    subscription::Subscription,
};

pub mod inmemory;

/// Abstraction over the append-only, partition-indexed chunk log.
///
/// All operations are cancellable through the supplied token; a cancelled
/// operation fails with [`StoreError::Cancelled`].
pub trait Persistence: Send + Sync {
    /// Append one chunk to a partition.
    ///
    /// Allocates a new globally monotonic position. When `index` is
    /// [`AUTO_INDEX`](crate::chunk::AUTO_INDEX) the position doubles as the
    /// index; when `operation_id` is `None` a fresh unique id is generated.
    ///
    /// Returns the written chunk, or `None` when a chunk with the same
    /// `(partition, operation)` pair already exists. The duplicate case is
    /// an idempotent no-op, not an error.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateStreamIndex`] when `(partition, index)` already
    /// exists under a different operation id; [`StoreError::Cancelled`] on
    /// cancellation; [`StoreError::Persistence`] on backend failure.
    fn append<'a>(
        &'a self,
        partition_id: &'a str,
        index: i64,
        payload: Option<Payload>,
        operation_id: Option<&'a str>,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<Option<Chunk>, StoreError>> + Send + 'a;

    /// Scan a partition by ascending index over `[from_lower, to_upper]`,
    /// delivering at most `limit` chunks to the subscription.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation. Read and callback failures
    /// terminate the scan through `on_error` and are not returned.
    fn read_forward<'a, S>(
        &'a self,
        partition_id: &'a str,
        from_lower: i64,
        subscription: &'a mut S,
        to_upper: i64,
        limit: usize,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a
    where
        S: Subscription + 'a;

    /// Scan a partition by descending index over `[to_lower, from_upper]`.
    ///
    /// # Errors
    ///
    /// As [`read_forward`](Persistence::read_forward).
    fn read_backward<'a, S>(
        &'a self,
        partition_id: &'a str,
        from_upper: i64,
        subscription: &'a mut S,
        to_lower: i64,
        limit: usize,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a
    where
        S: Subscription + 'a;

    /// The chunk with the greatest `index <= from_upper` in the partition.
    ///
    /// `from_upper` is applied literally: passing `0` returns a chunk only
    /// if one exists with a non-positive index.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation; [`StoreError::Persistence`]
    /// on backend failure.
    fn read_single_backward<'a>(
        &'a self,
        partition_id: &'a str,
        from_upper: i64,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<Option<Chunk>, StoreError>> + Send + 'a;

    /// Scan the global log by ascending position starting at
    /// `from_position`, delivering at most `limit` chunks.
    ///
    /// Positions are strictly ascending but not necessarily contiguous:
    /// relational backends may leave gaps where duplicate appends failed.
    ///
    /// # Errors
    ///
    /// As [`read_forward`](Persistence::read_forward).
    fn read_all<'a, S>(
        &'a self,
        from_position: i64,
        subscription: &'a mut S,
        limit: usize,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a
    where
        S: Subscription + 'a;

    /// The greatest position currently persisted, or `0` when empty.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation; [`StoreError::Persistence`]
    /// on backend failure.
    fn last_position<'a>(
        &'a self,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send + 'a;

    /// Remove every chunk in the partition with `index` in
    /// `[from_lower, to_upper]`.
    ///
    /// # Errors
    ///
    /// [`StoreError::StreamDelete`] when no chunk matched (including a
    /// non-existent partition); [`StoreError::Cancelled`] on cancellation;
    /// [`StoreError::Persistence`] on backend failure.
    fn delete<'a>(
        &'a self,
        partition_id: &'a str,
        from_lower: i64,
        to_upper: i64,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;

    /// Prepare storage: create the backing table for relational backends,
    /// no-op for the in-memory backend. Idempotent.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation; [`StoreError::Persistence`]
    /// on backend failure.
    fn init<'a>(
        &'a self,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;

    /// Remove all storage state. Intended for tests and operational resets.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] on cancellation; [`StoreError::Persistence`]
    /// on backend failure.
    fn destroy_all<'a>(
        &'a self,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;
}

/// Convenience forms of the [`Persistence`] operations.
///
/// Blanket-implemented for every backend.
pub trait PersistenceExt: Persistence {
    /// Scan a whole partition forward, unbounded.
    ///
    /// # Errors
    ///
    /// As [`Persistence::read_forward`].
    fn read_partition<'a, S>(
        &'a self,
        partition_id: &'a str,
        subscription: &'a mut S,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a
    where
        S: Subscription + 'a,
    {
        self.read_forward(partition_id, 0, subscription, i64::MAX, usize::MAX, token)
    }

    /// The partition's most recent chunk (greatest index), if any.
    ///
    /// # Errors
    ///
    /// As [`Persistence::read_single_backward`].
    fn peek<'a>(
        &'a self,
        partition_id: &'a str,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<Option<Chunk>, StoreError>> + Send + 'a {
        self.read_single_backward(partition_id, i64::MAX, token)
    }

    /// Delete the single chunk at `index`.
    ///
    /// # Errors
    ///
    /// As [`Persistence::delete`].
    fn delete_index<'a>(
        &'a self,
        partition_id: &'a str,
        index: i64,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a {
        self.delete(partition_id, index, index, token)
    }

    /// Delete every chunk in the partition.
    ///
    /// # Errors
    ///
    /// As [`Persistence::delete`].
    fn delete_partition<'a>(
        &'a self,
        partition_id: &'a str,
        token: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a {
        self.delete(partition_id, i64::MIN, i64::MAX, token)
    }
}

impl<P: Persistence + ?Sized> PersistenceExt for P {}
