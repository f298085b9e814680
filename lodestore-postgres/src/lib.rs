//! PostgreSQL backend for the lodestore chunk store.
//!
//! This crate maps the [`Persistence`] contract onto a single table with two
//! unique constraints, letting the database enforce the append invariants:
//!
//! - [`Store`] - an implementation of [`lodestore_core::store::Persistence`]
//! - [`snapshot::Store`] - an implementation of
//!   [`lodestore_core::snapshot::SnapshotStore`]
//!
//! Both use the same database and can share a connection pool.
//!
//! Positions come from the table's `BIGSERIAL` sequence, so they are strictly
//! ascending but not necessarily contiguous: an append that fails on a
//! uniqueness constraint burns a sequence value. Global scans are defined in
//! terms of ascending position, not contiguity, so consumers are unaffected.
//!
//! Deletion is a soft delete. Where the in-memory backend removes chunks
//! physically, this backend tombstones them in place (`deleted = TRUE`) and
//! filters the flag from every read. The unique indexes cover live rows
//! only, so a tombstoned index or operation id can be appended again.

pub mod snapshot;

mod queries;

pub use queries::Queries;

use lodestore_core::{
    cancel::CancellationToken,
    chunk::{AUTO_INDEX, Chunk, Payload},
    codec::{Codec, JsonCodec},
    error::StoreError,
    store::Persistence,
    subscription::{Subscription, pump},
};
use sqlx::{PgPool, Row as _, postgres::PgRow};
use uuid::Uuid;

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "chunks";

/// A PostgreSQL-backed chunk store.
///
/// Each operation acquires a connection from the pool, uses it, and releases
/// it; concurrency control is delegated to the database, whose unique
/// constraints are the source of truth for append atomicity.
///
/// The codec serializes payloads into the text-typed `payload` column and is
/// required at construction.
#[derive(Clone, Debug)]
pub struct Store<C = JsonCodec> {
    pool: PgPool,
    codec: C,
    queries: Queries,
}

impl<C> Store<C> {
    /// Construct a store over the default table.
    #[must_use]
    pub fn new(pool: PgPool, codec: C) -> Self {
        Self::with_table(pool, codec, DEFAULT_TABLE)
    }

    /// Construct a store over a specific table.
    #[must_use]
    pub fn with_table(pool: PgPool, codec: C, table: &str) -> Self {
        Self::with_queries(pool, codec, Queries::for_table(table))
    }

    /// Construct a store with a custom template set.
    #[must_use]
    pub const fn with_queries(pool: PgPool, codec: C, queries: Queries) -> Self {
        Self {
            pool,
            codec,
            queries,
        }
    }

    /// The SQL templates this store issues.
    #[must_use]
    pub const fn queries(&self) -> &Queries {
        &self.queries
    }
}

impl<C: Codec> Store<C> {
    fn chunk_from_row(&self, row: &PgRow) -> Result<Chunk, StoreError> {
        let raw_payload: Option<String> = row
            .try_get("payload")
            .map_err(|e| StoreError::caused_by("failed to read payload column", e))?;
        let payload: Option<Payload> = raw_payload
            .map(|text| {
                self.codec
                    .deserialize(&text)
                    .map(std::sync::Arc::new)
                    .map_err(|e| StoreError::caused_by("payload deserialization failed", e))
            })
            .transpose()?;

        Ok(Chunk {
            position: row
                .try_get("position")
                .map_err(|e| StoreError::caused_by("failed to read position column", e))?,
            partition_id: row
                .try_get("partition_id")
                .map_err(|e| StoreError::caused_by("failed to read partition column", e))?,
            index: row
                .try_get("idx")
                .map_err(|e| StoreError::caused_by("failed to read index column", e))?,
            payload,
            operation_id: row
                .try_get("operation_id")
                .map_err(|e| StoreError::caused_by("failed to read operation column", e))?,
            deleted: row
                .try_get("deleted")
                .map_err(|e| StoreError::caused_by("failed to read deleted column", e))?,
        })
    }

    fn chunks_from_rows(&self, rows: &[PgRow]) -> Result<Vec<Chunk>, StoreError> {
        rows.iter().map(|row| self.chunk_from_row(row)).collect()
    }
}

fn db_err(error: sqlx::Error) -> StoreError {
    StoreError::caused_by("database error", error)
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Map an insert failure onto the append contract.
///
/// A unique violation on the operation index is the idempotent duplicate
/// (`Ok(None)`) — reachable only when a concurrent append commits the same
/// operation between the pre-insert lookup and the insert; one on the index
/// constraint is [`StoreError::DuplicateStreamIndex`]. Anything else is a
/// backend failure.
fn classify_append_error(
    queries: &Queries,
    error: sqlx::Error,
    partition_id: &str,
    index: i64,
) -> Result<Option<Chunk>, StoreError> {
    if let Some(db) = error.as_database_error() {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(name) if name == queries.operation_constraint => {
                    tracing::debug!(partition_id, "duplicate operation, append skipped");
                    return Ok(None);
                }
                Some(name) if name == queries.index_constraint => {
                    return Err(StoreError::DuplicateStreamIndex {
                        partition_id: partition_id.to_string(),
                        index,
                    });
                }
                _ => {}
            }
        }
    }
    Err(db_err(error))
}

impl<C> Persistence for Store<C>
where
    C: Codec + 'static,
{
    #[tracing::instrument(skip(self, payload, operation_id, token))]
    async fn append<'a>(
        &'a self,
        partition_id: &'a str,
        index: i64,
        payload: Option<Payload>,
        operation_id: Option<&'a str>,
        token: &'a CancellationToken,
    ) -> Result<Option<Chunk>, StoreError> {
        token.check()?;
        let operation_id =
            operation_id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let payload_text = payload
            .as_ref()
            .map(|value| {
                self.codec
                    .serialize(value)
                    .map_err(|e| StoreError::caused_by("payload serialization failed", e))
            })
            .transpose()?;

        // Resolve operation idempotency before the insert so a repeated
        // operation wins over a simultaneous index collision, matching the
        // reference backend's check order.
        let existing: Option<i64> = sqlx::query_scalar(&self.queries.operation_exists)
            .bind(partition_id)
            .bind(&operation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            tracing::debug!(partition_id, "duplicate operation, append skipped");
            return Ok(None);
        }

        let position: i64 = sqlx::query_scalar(&self.queries.next_position)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let index = if index == AUTO_INDEX { position } else { index };

        token.check()?;
        let inserted = sqlx::query(&self.queries.persist)
            .bind(position)
            .bind(partition_id)
            .bind(index)
            .bind(payload_text.as_deref())
            .bind(&operation_id)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => {
                tracing::debug!(position, index, "chunk appended");
                Ok(Some(Chunk {
                    position,
                    partition_id: partition_id.to_string(),
                    index,
                    payload,
                    operation_id,
                    deleted: false,
                }))
            }
            Err(error) => classify_append_error(&self.queries, error, partition_id, index),
        }
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
        token.check()?;
        let batch = match sqlx::query(&self.queries.read_forward)
            .bind(partition_id)
            .bind(from_lower)
            .bind(to_upper)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => self.chunks_from_rows(&rows),
            Err(error) => Err(db_err(error)),
        };
        pump(subscription, from_lower, batch, |c| c.index, token).await
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
        token.check()?;
        let batch = match sqlx::query(&self.queries.read_backward)
            .bind(partition_id)
            .bind(from_upper)
            .bind(to_lower)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => self.chunks_from_rows(&rows),
            Err(error) => Err(db_err(error)),
        };
        pump(subscription, from_upper, batch, |c| c.index, token).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn read_single_backward<'a>(
        &'a self,
        partition_id: &'a str,
        from_upper: i64,
        token: &'a CancellationToken,
    ) -> Result<Option<Chunk>, StoreError> {
        token.check()?;
        let row = sqlx::query(&self.queries.get_last_chunk)
            .bind(partition_id)
            .bind(from_upper)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|row| self.chunk_from_row(&row)).transpose()
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
        token.check()?;
        let batch = match sqlx::query(&self.queries.read_all)
            .bind(from_position)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => self.chunks_from_rows(&rows),
            Err(error) => Err(db_err(error)),
        };
        pump(subscription, from_position, batch, |c| c.position, token).await
    }

    #[tracing::instrument(skip(self, token))]
    async fn last_position<'a>(&'a self, token: &'a CancellationToken) -> Result<i64, StoreError> {
        token.check()?;
        sqlx::query_scalar(&self.queries.last_position)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Tombstone the matching chunks in place.
    ///
    /// The `deleted = FALSE` guard makes a re-delete of an already
    /// tombstoned range affect zero rows, which is reported as
    /// [`StoreError::StreamDelete`] just like an empty match.
    #[tracing::instrument(skip(self, token))]
    async fn delete<'a>(
        &'a self,
        partition_id: &'a str,
        from_lower: i64,
        to_upper: i64,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError> {
        token.check()?;
        let result = sqlx::query(&self.queries.delete_stream)
            .bind(partition_id)
            .bind(from_lower)
            .bind(to_upper)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::StreamDelete(partition_id.to_string()));
        }
        tracing::debug!(removed = result.rows_affected(), "chunks tombstoned");
        Ok(())
    }

    /// Apply the table schema (idempotent, `CREATE ... IF NOT EXISTS`).
    #[tracing::instrument(skip(self, token))]
    async fn init<'a>(&'a self, token: &'a CancellationToken) -> Result<(), StoreError> {
        token.check()?;
        sqlx::query(&self.queries.create_table)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        sqlx::query(&self.queries.create_index_unique)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        sqlx::query(&self.queries.create_operation_unique)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, token))]
    async fn destroy_all<'a>(&'a self, token: &'a CancellationToken) -> Result<(), StoreError> {
        token.check()?;
        sqlx::query(&self.queries.drop_table)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
