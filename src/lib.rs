#![doc = include_str!("../README.md")]

#[cfg(feature = "test-util")]
pub use lodestore_core::test;
pub use lodestore_core::{
    cancel::CancellationToken,
    chunk,
    chunk::{AUTO_INDEX, Chunk, EMPTY_PARTITION_ID, Payload, payload},
    codec,
    codec::{Codec, JsonCodec},
    error::StoreError,
    snapshot,
    snapshot::{NoSnapshots, SnapshotInfo, SnapshotStore},
    subscription,
    subscription::{Collector, Subscription},
};

pub mod store {

    pub use lodestore_core::store::{Persistence, PersistenceExt, inmemory};

    #[cfg(feature = "postgres")]
    pub mod postgres {
        pub use lodestore_postgres::{DEFAULT_TABLE, Queries, Store, snapshot};
    }
}
