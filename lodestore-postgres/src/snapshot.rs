//! PostgreSQL-backed snapshot store implementation.
//!
//! Snapshots live in their own table keyed by `(aggregate_id, version)`.
//! Staleness is enforced in the insert statement itself, so concurrent
//! writers cannot race an older snapshot past a newer one.

use lodestore_core::{
    cancel::CancellationToken,
    chunk::Payload,
    codec::{Codec, JsonCodec},
    error::StoreError,
    snapshot::{SnapshotInfo, SnapshotStore},
};
use sqlx::{PgPool, Row as _};

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "snapshots";

/// A PostgreSQL-backed snapshot store.
///
/// Uses the same database as the chunk store and can share its pool. The
/// codec serializes snapshot payloads into the text-typed `payload` column.
#[derive(Clone, Debug)]
pub struct Store<C = JsonCodec> {
    pool: PgPool,
    codec: C,
    table: String,
}

impl<C> Store<C> {
    /// Construct a snapshot store over the default table.
    #[must_use]
    pub fn new(pool: PgPool, codec: C) -> Self {
        Self::with_table(pool, codec, DEFAULT_TABLE)
    }

    /// Construct a snapshot store over a specific table.
    #[must_use]
    pub fn with_table(pool: PgPool, codec: C, table: &str) -> Self {
        Self {
            pool,
            codec,
            table: table.to_string(),
        }
    }

    /// Apply the snapshot schema (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] if the DDL fails.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             aggregate_id   TEXT NOT NULL,\
             version        BIGINT NOT NULL,\
             payload        TEXT NULL,\
             schema_version TEXT NOT NULL,\
             PRIMARY KEY (aggregate_id, version)\
             )",
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Drop the snapshot table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] if the DDL fails.
    #[tracing::instrument(skip(self))]
    pub async fn destroy_all(&self) -> Result<(), StoreError> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(error: sqlx::Error) -> StoreError {
    StoreError::caused_by("database error", error)
}

impl<C> SnapshotStore for Store<C>
where
    C: Codec + 'static,
{
    #[tracing::instrument(skip(self, token))]
    async fn get<'a>(
        &'a self,
        aggregate_id: &'a str,
        version: i64,
        token: &'a CancellationToken,
    ) -> Result<Option<SnapshotInfo>, StoreError> {
        token.check()?;
        let row = sqlx::query(&format!(
            "SELECT version, payload, schema_version FROM {} \
             WHERE aggregate_id = $1 AND version <= $2 \
             ORDER BY version DESC LIMIT 1",
            self.table
        ))
        .bind(aggregate_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            tracing::trace!(found = false, "snapshot lookup");
            return Ok(None);
        };

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

        Ok(Some(SnapshotInfo {
            aggregate_id: aggregate_id.to_string(),
            version: row
                .try_get("version")
                .map_err(|e| StoreError::caused_by("failed to read version column", e))?,
            payload,
            schema_version: row
                .try_get("schema_version")
                .map_err(|e| StoreError::caused_by("failed to read schema column", e))?,
        }))
    }

    #[tracing::instrument(skip(self, info, token), fields(version = info.version))]
    async fn add<'a>(
        &'a self,
        aggregate_id: &'a str,
        info: SnapshotInfo,
        token: &'a CancellationToken,
    ) -> Result<bool, StoreError> {
        token.check()?;
        let payload_text = info
            .payload
            .as_ref()
            .map(|value| {
                self.codec
                    .serialize(value)
                    .map_err(|e| StoreError::caused_by("payload serialization failed", e))
            })
            .transpose()?;

        // The guard subquery rejects any version at or below the latest
        // stored one; a concurrent same-version insert falls back to the
        // primary-key violation, which is the same staleness outcome.
        let result = sqlx::query(&format!(
            "INSERT INTO {table} (aggregate_id, version, payload, schema_version) \
             SELECT $1, $2, $3, $4 \
             WHERE NOT EXISTS (\
             SELECT 1 FROM {table} WHERE aggregate_id = $1 AND version >= $2\
             )",
            table = self.table
        ))
        .bind(aggregate_id)
        .bind(info.version)
        .bind(payload_text.as_deref())
        .bind(&info.schema_version)
        .execute(&self.pool)
        .await;

        let stale = StoreError::StaleSnapshot {
            aggregate_id: aggregate_id.to_string(),
            version: info.version,
        };
        match result {
            Ok(outcome) if outcome.rows_affected() == 0 => Err(stale),
            Ok(_) => Ok(true),
            Err(error) => {
                if error
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    Err(stale)
                } else {
                    Err(db_err(error))
                }
            }
        }
    }

    #[tracing::instrument(skip(self, token))]
    async fn remove<'a>(
        &'a self,
        aggregate_id: &'a str,
        from_version: i64,
        to_version: i64,
        token: &'a CancellationToken,
    ) -> Result<(), StoreError> {
        token.check()?;
        sqlx::query(&format!(
            "DELETE FROM {} WHERE aggregate_id = $1 AND version >= $2 AND version <= $3",
            self.table
        ))
        .bind(aggregate_id)
        .bind(from_version)
        .bind(to_version)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
