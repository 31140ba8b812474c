//! In-process backup store.
//!
//! Clones share state, so two engines built on clones of one store behave
//! like two devices talking to the same backend. Blobs are kept as JSON text
//! so readers never alias a writer's values.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{parse_version_payloads, RemoteStore};
use crate::error::{Error, Result};
use crate::models::{Dataset, SyncId, TripId, TripVersion};

/// Failure to inject into the next write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Unavailable,
    Stale,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    blobs: HashMap<SyncId, String>,
    versions: Vec<serde_json::Value>,
    offline: bool,
    next_write_failure: Option<StoreFailure>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw blob as another client would have written it.
    pub fn seed_raw(&self, sync_id: &SyncId, raw: impl Into<String>) {
        self.state().blobs.insert(sync_id.clone(), raw.into());
    }

    /// Raw blob currently stored under `sync_id`.
    #[must_use]
    pub fn raw_blob(&self, sync_id: &SyncId) -> Option<String> {
        self.state().blobs.get(sync_id).cloned()
    }

    /// While offline every call fails with `RemoteUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Make the next `write` fail once.
    pub fn fail_next_write(&self, failure: StoreFailure) {
        self.state().next_write_failure = Some(failure);
    }

    #[must_use]
    pub fn version_count(&self) -> usize {
        self.state().versions.len()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn online_state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let state = self.state();
        if state.offline {
            return Err(Error::RemoteUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(state)
    }
}

impl RemoteStore for MemoryStore {
    async fn fetch(&self, sync_id: &SyncId) -> Result<Option<Dataset>> {
        let raw = self.online_state()?.blobs.get(sync_id).cloned();
        raw.map(|raw| Dataset::from_json(&raw)).transpose()
    }

    async fn write(&self, sync_id: &SyncId, dataset: &Dataset) -> Result<()> {
        let payload = serde_json::to_string(dataset)?;
        let mut state = self.online_state()?;
        match state.next_write_failure.take() {
            Some(StoreFailure::Unavailable) => Err(Error::RemoteUnavailable(
                "injected write failure".to_string(),
            )),
            Some(StoreFailure::Stale) => Err(Error::WriteConflict(format!(
                "blob for {sync_id} changed since it was read"
            ))),
            None => {
                state.blobs.insert(sync_id.clone(), payload);
                Ok(())
            }
        }
    }

    async fn append_version(&self, trip_id: &TripId, version: &TripVersion) -> Result<()> {
        if &version.trip_id != trip_id {
            return Err(Error::InvalidInput(format!(
                "version {} belongs to trip {}, not {trip_id}",
                version.id, version.trip_id
            )));
        }
        let payload = serde_json::to_value(version)?;
        let mut state = self.online_state()?;
        let version_id = version.id.as_str();
        let duplicate = state.versions.iter().any(|stored| {
            stored.get("id").and_then(serde_json::Value::as_str) == Some(version_id.as_str())
        });
        if duplicate {
            return Err(Error::InvalidInput(format!(
                "version {version_id} already exists"
            )));
        }
        state.versions.push(payload);
        Ok(())
    }

    async fn list_versions(&self, trip_id: &TripId) -> Result<Vec<TripVersion>> {
        let payloads = self.online_state()?.versions.clone();
        Ok(parse_version_payloads(payloads)
            .into_iter()
            .filter(|version| &version.trip_id == trip_id)
            .collect())
    }

    async fn search_versions(&self, query: &str) -> Result<Vec<TripVersion>> {
        let payloads = self.online_state()?.versions.clone();
        Ok(parse_version_payloads(payloads)
            .into_iter()
            .filter(|version| version.matches_query(query))
            .collect())
    }

    async fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<TripVersion>> {
        let payloads = self.online_state()?.versions.clone();
        Ok(parse_version_payloads(payloads)
            .into_iter()
            .filter(|version| version.id.as_str().starts_with(prefix))
            .collect())
    }
}
