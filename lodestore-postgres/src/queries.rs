//! Table-name-parameterized SQL templates.
//!
//! Every statement the backend issues is built here, keyed off a single
//! table name, so swapping tables (or adapting the dialect) is confined to
//! configuration instead of being spread through the store.
//!
//! Uniqueness is enforced by partial unique indexes over live rows
//! (`WHERE deleted = FALSE`): deletion tombstones chunks in place, and a
//! tombstoned index or operation id must not block a later append.

/// The SQL template set for one chunk table.
///
/// Constraint names matter: the store classifies unique-violation errors by
/// comparing the violated constraint against [`index_constraint`] and
/// [`operation_constraint`].
///
/// [`index_constraint`]: Queries::index_constraint
/// [`operation_constraint`]: Queries::operation_constraint
#[derive(Clone, Debug)]
pub struct Queries {
    /// Table the templates operate on.
    pub table: String,
    /// Idempotent DDL creating the table.
    pub create_table: String,
    /// Idempotent DDL creating the `(partition_id, idx)` unique index over
    /// live rows.
    pub create_index_unique: String,
    /// Idempotent DDL creating the `(partition_id, operation_id)` unique
    /// index over live rows.
    pub create_operation_unique: String,
    /// Allocate the next position from the backing sequence.
    pub next_position: String,
    /// Look up a live chunk by `(partition_id, operation_id)`.
    pub operation_exists: String,
    /// Insert one chunk with an explicit position.
    pub persist: String,
    /// Ascending per-partition range scan.
    pub read_forward: String,
    /// Descending per-partition range scan.
    pub read_backward: String,
    /// Single chunk with the greatest index at or below a bound.
    pub get_last_chunk: String,
    /// Ascending global scan from a position.
    pub read_all: String,
    /// Greatest persisted position, or 0.
    pub last_position: String,
    /// Tombstone a partition range in place.
    pub delete_stream: String,
    /// Teardown DDL.
    pub drop_table: String,
    /// Name of the `(partition_id, idx)` unique index.
    pub index_constraint: String,
    /// Name of the `(partition_id, operation_id)` unique index.
    pub operation_constraint: String,
}

impl Queries {
    /// Build the template set for `table`.
    ///
    /// The name is spliced into the statements verbatim and must be a plain
    /// SQL identifier.
    #[must_use]
    pub fn for_table(table: &str) -> Self {
        let index_constraint = format!("{table}_partition_idx_uq");
        let operation_constraint = format!("{table}_partition_operation_uq");
        let columns = "position, partition_id, idx, payload, operation_id, deleted";
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 position     BIGSERIAL PRIMARY KEY,\
                 partition_id TEXT NOT NULL,\
                 idx          BIGINT NOT NULL,\
                 payload      TEXT NULL,\
                 operation_id TEXT NOT NULL,\
                 deleted      BOOLEAN NOT NULL DEFAULT FALSE\
                 )"
            ),
            create_index_unique: format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {index_constraint} \
                 ON {table} (partition_id, idx) WHERE deleted = FALSE"
            ),
            create_operation_unique: format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {operation_constraint} \
                 ON {table} (partition_id, operation_id) WHERE deleted = FALSE"
            ),
            next_position: format!(
                "SELECT nextval(pg_get_serial_sequence('{table}', 'position'))"
            ),
            operation_exists: format!(
                "SELECT position FROM {table} \
                 WHERE partition_id = $1 AND operation_id = $2 AND deleted = FALSE"
            ),
            persist: format!(
                "INSERT INTO {table} (position, partition_id, idx, payload, operation_id) \
                 VALUES ($1, $2, $3, $4, $5)"
            ),
            read_forward: format!(
                "SELECT {columns} FROM {table} \
                 WHERE partition_id = $1 AND idx >= $2 AND idx <= $3 AND deleted = FALSE \
                 ORDER BY idx ASC LIMIT $4"
            ),
            read_backward: format!(
                "SELECT {columns} FROM {table} \
                 WHERE partition_id = $1 AND idx <= $2 AND idx >= $3 AND deleted = FALSE \
                 ORDER BY idx DESC LIMIT $4"
            ),
            get_last_chunk: format!(
                "SELECT {columns} FROM {table} \
                 WHERE partition_id = $1 AND idx <= $2 AND deleted = FALSE \
                 ORDER BY idx DESC LIMIT 1"
            ),
            read_all: format!(
                "SELECT {columns} FROM {table} \
                 WHERE position >= $1 AND deleted = FALSE \
                 ORDER BY position ASC LIMIT $2"
            ),
            last_position: format!("SELECT COALESCE(MAX(position), 0) FROM {table}"),
            delete_stream: format!(
                "UPDATE {table} SET deleted = TRUE \
                 WHERE deleted = FALSE AND partition_id = $1 AND idx >= $2 AND idx <= $3"
            ),
            drop_table: format!("DROP TABLE IF EXISTS {table}"),
            table: table.to_string(),
            index_constraint,
            operation_constraint,
        }
    }
}
