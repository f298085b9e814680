//! In-memory snapshot store implementation.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use super::{SnapshotInfo, SnapshotStore};
use crate::{cancel::CancellationToken, error::StoreError};

type VersionMap = BTreeMap<i64, SnapshotInfo>;

/// Thread-safe in-memory snapshot store.
///
/// Snapshots are held per aggregate in version order, so `get` resolves the
/// "most recent at or below" rule with a range lookup.
#[derive(Clone, Debug, Default)]
pub struct Store {
    snapshots: Arc<RwLock<HashMap<String, VersionMap>>>,
}

impl Store {
    /// Create an empty snapshot store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for Store {
    #[tracing::instrument(skip(self, token))]
    async fn get<'a>(
        &'a self,
        aggregate_id: &'a str,
        version: i64,
        token: &'a CancellationToken,
    ) -> Result<Option<SnapshotInfo>, StoreError> {
        token.check()?;
        let snapshots = self
            .snapshots
            .read()
            .expect("snapshot store lock poisoned");
        let found = snapshots
            .get(aggregate_id)
            .and_then(|versions| versions.range(..=version).next_back())
            .map(|(_, info)| info.clone());
        tracing::trace!(found = found.is_some(), "snapshot lookup");
        Ok(found)
    }

    #[tracing::instrument(skip(self, info, token), fields(version = info.version))]
    async fn add<'a>(
        &'a self,
        aggregate_id: &'a str,
        info: SnapshotInfo,
        token: &'a CancellationToken,
    ) -> Result<bool, StoreError> {
        token.check()?;
        let mut snapshots = self
            .snapshots
            .write()
            .expect("snapshot store lock poisoned");
        let versions = snapshots.entry(aggregate_id.to_string()).or_default();
        if let Some((&latest, _)) = versions.last_key_value() {
            if info.version <= latest {
                return Err(StoreError::StaleSnapshot {
                    aggregate_id: aggregate_id.to_string(),
                    version: info.version,
                });
            }
        }
        versions.insert(info.version, info);
        Ok(true)
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
        if from_version > to_version {
            return Ok(());
        }
        let mut snapshots = self
            .snapshots
            .write()
            .expect("snapshot store lock poisoned");
        if let Some(versions) = snapshots.get_mut(aggregate_id) {
            let matched: Vec<i64> = versions
                .range(from_version..=to_version)
                .map(|(version, _)| *version)
                .collect();
            for version in matched {
                versions.remove(&version);
            }
            if versions.is_empty() {
                snapshots.remove(aggregate_id);
            }
        }
        Ok(())
    }
}
