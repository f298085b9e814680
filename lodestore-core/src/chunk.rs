//! The chunk data model.
//!
//! A [`Chunk`] is the atomic unit of storage: an immutable record appended to
//! a named partition and to the global log. The engine never interprets the
//! payload; it is carried as an opaque JSON value behind an [`Arc`] so that
//! backends can choose between sharing and deep-copying (see
//! [`store::inmemory::PayloadCloning`](crate::store::inmemory::PayloadCloning)).

use std::sync::Arc;

/// Opaque chunk payload.
pub type Payload = Arc<serde_json::Value>;

/// Index sentinel: let the store assign `index := position` at append time.
pub const AUTO_INDEX: i64 = -1;

/// Reserved partition id that receives hole-filler chunks.
///
/// When an append fails a uniqueness check, the in-memory backend writes a
/// payload-less filler chunk under this id so the already-allocated position
/// stays observable and the global log remains gap-free. The id is reserved:
/// scans against it behave like any other partition scan, but callers should
/// not append to it.
pub const EMPTY_PARTITION_ID: &str = "::empty";

/// Wrap a JSON value as a chunk payload.
#[must_use]
pub fn payload(value: serde_json::Value) -> Payload {
    Arc::new(value)
}

/// One immutable append record.
///
/// Chunks are created by [`Persistence::append`](crate::store::Persistence::append),
/// never mutated, and destroyed only by range deletion or engine teardown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Globally monotonic ordering key, assigned at append time.
    pub position: i64,
    /// Logical stream the chunk belongs to. Non-empty.
    pub partition_id: String,
    /// Per-partition ordering key. Caller-supplied positive value, or
    /// assigned from `position` when the caller passed [`AUTO_INDEX`].
    pub index: i64,
    /// Opaque payload; `None` for filler chunks and payload-less appends.
    pub payload: Option<Payload>,
    /// Idempotency token, unique within the partition.
    pub operation_id: String,
    /// Tombstone flag. Only the relational backend surfaces this; the
    /// in-memory backend removes chunks physically.
    pub deleted: bool,
}

impl Chunk {
    /// Whether this chunk is a hole-filler written to the reserved partition.
    #[must_use]
    pub fn is_filler(&self) -> bool {
        self.partition_id == EMPTY_PARTITION_ID
    }
}
