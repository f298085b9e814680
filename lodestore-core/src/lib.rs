//! Core traits and types for the lodestore chunk store.
//!
//! This crate provides the persistence abstraction of an append-only,
//! partition-indexed log of opaque payloads:
//!
//! - [`chunk`] - The [`Chunk`](chunk::Chunk) data model and sentinels
//! - [`store`] - The [`Persistence`](store::Persistence) engine contract and
//!   the in-memory reference backend
//! - [`subscription`] - The push-based scan protocol
//! - [`snapshot`] - Snapshot persistence for aggregate consumers
//! - [`codec`] - Payload serialization for text-typed backends
//! - [`cancel`] - Cooperative cancellation
//! - [`error`] - The shared error taxonomy
//!
//! # Example
//!
//! ```
//! use lodestore_core::{
//!     cancel::CancellationToken,
//!     chunk::payload,
//!     store::{Persistence as _, inmemory},
//!     subscription::Collector,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lodestore_core::error::StoreError> {
//! let store = inmemory::Store::new();
//! let token = CancellationToken::new();
//!
//! store
//!     .append("orders", 1, Some(payload(serde_json::json!("created"))), None, &token)
//!     .await?;
//!
//! let mut collector = Collector::new();
//! store
//!     .read_forward("orders", 0, &mut collector, i64::MAX, usize::MAX, &token)
//!     .await?;
//! assert_eq!(collector.indices(), vec![1]);
//! # Ok(())
//! # }
//! ```
//!
//! Most users should depend on the `lodestore` crate, which re-exports these
//! types together with the optional backends.

pub mod cancel;
pub mod chunk;
pub mod codec;
pub mod error;
pub mod snapshot;
pub mod store;
pub mod subscription;

// Test utilities module: public when feature enabled, internal for crate tests
#[cfg(feature = "test-util")]
pub mod test;

#[cfg(all(test, not(feature = "test-util")))]
pub(crate) mod test;
