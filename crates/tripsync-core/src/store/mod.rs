//! Remote backup store adapters.
//!
//! # Consistency model
//!
//! A store keeps exactly one dataset blob per sync identifier and replaces it
//! wholesale on [`RemoteStore::write`]. There is no compare-and-swap in the
//! contract: when two devices write the same identifier at nearly the same
//! time, the last write wins. Adapters that can detect a stale write report
//! [`Error::WriteConflict`](crate::Error::WriteConflict); the sync engine
//! turns that into a retryable failure and never retries on its own.
//!
//! Trip versions are append-only and never rewritten or deleted by a store.

mod http;
mod memory;
mod sqlite;
mod usage;

pub use http::HttpStore;
pub use memory::{MemoryStore, StoreFailure};
pub use sqlite::SqliteStore;
pub use usage::{StoreCall, UsageCounter, UsageSnapshot};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::models::{Dataset, SyncId, TripId, TripVersion};

/// Key-value backup service addressed by sync identifier (async)
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch the blob stored under `sync_id`, or `None` if nothing was ever written.
    ///
    /// A blob that cannot be decoded, or that was written by a newer schema,
    /// fails with [`Error::Serialization`](crate::Error::Serialization) or
    /// [`Error::Schema`](crate::Error::Schema). Those stay distinct from
    /// `RemoteUnavailable`: re-running the sync cannot fix them.
    async fn fetch(&self, sync_id: &SyncId) -> Result<Option<Dataset>>;

    /// Replace the blob stored under `sync_id`. Last writer wins.
    async fn write(&self, sync_id: &SyncId, dataset: &Dataset) -> Result<()>;

    /// Append a snapshot to the trip's version list. A version id that is
    /// already stored is rejected with `InvalidInput`.
    async fn append_version(&self, trip_id: &TripId, version: &TripVersion) -> Result<()>;

    /// All snapshots recorded for a trip, in any order.
    async fn list_versions(&self, trip_id: &TripId) -> Result<Vec<TripVersion>>;

    /// Every snapshot of any trip whose note or trip title contains `query`,
    /// compared case-insensitively. Results are never truncated.
    async fn search_versions(&self, query: &str) -> Result<Vec<TripVersion>>;

    /// Snapshots of any trip whose id starts with the lower-case `prefix`.
    async fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<TripVersion>>;
}

/// Store chosen at runtime from a [`StoreConfig`]
#[derive(Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
    Http(HttpStore),
}

impl AnyStore {
    /// Open the backend described by `config`. Network calls are counted
    /// into `usage`.
    pub fn open(config: &StoreConfig, usage: UsageCounter) -> Result<Self> {
        let config = config.clone().validate()?;
        let store = match config {
            StoreConfig::Memory => Self::Memory(MemoryStore::new()),
            StoreConfig::Sqlite { path } => Self::Sqlite(SqliteStore::open(&path)?),
            StoreConfig::Http { base_url, api_key } => {
                Self::Http(HttpStore::new(&base_url, api_key, usage)?)
            }
        };
        tracing::debug!("Opened {} backup store", store.backend_name());
        Ok(store)
    }

    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
            Self::Http(_) => "http",
        }
    }
}

impl RemoteStore for AnyStore {
    async fn fetch(&self, sync_id: &SyncId) -> Result<Option<Dataset>> {
        match self {
            Self::Memory(store) => store.fetch(sync_id).await,
            Self::Sqlite(store) => store.fetch(sync_id).await,
            Self::Http(store) => store.fetch(sync_id).await,
        }
    }

    async fn write(&self, sync_id: &SyncId, dataset: &Dataset) -> Result<()> {
        match self {
            Self::Memory(store) => store.write(sync_id, dataset).await,
            Self::Sqlite(store) => store.write(sync_id, dataset).await,
            Self::Http(store) => store.write(sync_id, dataset).await,
        }
    }

    async fn append_version(&self, trip_id: &TripId, version: &TripVersion) -> Result<()> {
        match self {
            Self::Memory(store) => store.append_version(trip_id, version).await,
            Self::Sqlite(store) => store.append_version(trip_id, version).await,
            Self::Http(store) => store.append_version(trip_id, version).await,
        }
    }

    async fn list_versions(&self, trip_id: &TripId) -> Result<Vec<TripVersion>> {
        match self {
            Self::Memory(store) => store.list_versions(trip_id).await,
            Self::Sqlite(store) => store.list_versions(trip_id).await,
            Self::Http(store) => store.list_versions(trip_id).await,
        }
    }

    async fn search_versions(&self, query: &str) -> Result<Vec<TripVersion>> {
        match self {
            Self::Memory(store) => store.search_versions(query).await,
            Self::Sqlite(store) => store.search_versions(query).await,
            Self::Http(store) => store.search_versions(query).await,
        }
    }

    async fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<TripVersion>> {
        match self {
            Self::Memory(store) => store.versions_by_id_prefix(prefix).await,
            Self::Sqlite(store) => store.versions_by_id_prefix(prefix).await,
            Self::Http(store) => store.versions_by_id_prefix(prefix).await,
        }
    }
}

/// Parse stored version payloads, skipping (and logging) malformed ones.
pub(crate) fn parse_version_payloads<I>(payloads: I) -> Vec<TripVersion>
where
    I: IntoIterator<Item = serde_json::Value>,
{
    payloads
        .into_iter()
        .filter_map(
            |payload| match serde_json::from_value::<TripVersion>(payload) {
                Ok(version) if version.is_well_formed() => Some(version),
                Ok(version) => {
                    tracing::warn!("Skipping malformed trip version {}", version.id);
                    None
                }
                Err(error) => {
                    tracing::warn!("Skipping unreadable trip version: {}", error);
                    None
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trip;

    #[tokio::test]
    async fn test_open_memory_store_from_config() {
        let store = AnyStore::open(&StoreConfig::Memory, UsageCounter::default()).unwrap();
        assert_eq!(store.backend_name(), "memory");

        let sync_id = SyncId::parse("TEST-0001").unwrap();
        assert!(store.fetch(&sync_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_sqlite_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Sqlite {
            path: dir.path().join("backups.db"),
        };
        let store = AnyStore::open(&config, UsageCounter::default()).unwrap();
        assert_eq!(store.backend_name(), "sqlite");

        let sync_id = SyncId::parse("TEST-0001").unwrap();
        let dataset = Dataset::from_trips([Trip::with_id("A".into(), "Seville")]);
        store.write(&sync_id, &dataset).await.unwrap();
        assert_eq!(store.fetch(&sync_id).await.unwrap(), Some(dataset));
    }

    #[test]
    fn test_parse_version_payloads_skips_bad_rows() {
        let good = TripVersion::capture(&Trip::with_id("A".into(), "Seville"), "ok", 1);
        let mut blank = good.clone();
        blank.trip_id = "  ".into();

        let parsed = parse_version_payloads([
            serde_json::to_value(&good).unwrap(),
            serde_json::json!({ "id": "not-a-version" }),
            serde_json::to_value(&blank).unwrap(),
        ]);
        assert_eq!(parsed, vec![good]);
    }
}
