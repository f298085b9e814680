//! The shared error taxonomy.
//!
//! Every backend surfaces the same set of domain errors so that callers can
//! switch implementations without changing their failure handling. Driver
//! errors that do not map onto a domain error are wrapped in
//! [`StoreError::Persistence`] with their source preserved.

use thiserror::Error;

/// Errors raised by persistence and snapshot operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A chunk with the same `(partition, index)` pair already exists and was
    /// written by a different operation.
    #[error("Duplicated index {index} on stream {partition_id}")]
    DuplicateStreamIndex {
        /// Partition the conflicting append targeted.
        partition_id: String,
        /// Index that collided.
        index: i64,
    },

    /// A range delete matched no chunks, or the partition does not exist.
    #[error("delete on stream {0} matched no chunks")]
    StreamDelete(String),

    /// A snapshot write whose version is not strictly greater than the latest
    /// stored version for the aggregate.
    #[error("stale snapshot for aggregate {aggregate_id} at version {version}")]
    StaleSnapshot {
        /// Aggregate the snapshot belongs to.
        aggregate_id: String,
        /// Rejected version.
        version: i64,
    },

    /// Generic backend failure: driver error, codec failure, configuration
    /// problem.
    #[error("{message}")]
    Persistence {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying cause, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// The operation observed a cancellation request and aborted.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Create a [`StoreError::Persistence`] without an underlying cause.
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Create a [`StoreError::Persistence`] wrapping an underlying cause.
    #[must_use]
    pub fn caused_by(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
