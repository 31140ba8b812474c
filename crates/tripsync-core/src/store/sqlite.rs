//! Backup store on a local or shared `SQLite` file

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{parse_version_payloads, RemoteStore};
use crate::db::{BackupRepository, Database, SqliteBackupRepository};
use crate::error::{Error, Result};
use crate::models::{Dataset, SyncId, TripId, TripVersion};
use crate::util::unix_timestamp_ms_now;

/// Thread-safe `SQLite` backed store. Clones share the connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

impl RemoteStore for SqliteStore {
    async fn fetch(&self, sync_id: &SyncId) -> Result<Option<Dataset>> {
        let db = self.db.lock().await;
        let raw = SqliteBackupRepository::new(db.connection()).load_blob(sync_id)?;
        raw.map(|raw| Dataset::from_json(&raw)).transpose()
    }

    async fn write(&self, sync_id: &SyncId, dataset: &Dataset) -> Result<()> {
        let payload = serde_json::to_string(dataset)?;
        let db = self.db.lock().await;
        SqliteBackupRepository::new(db.connection()).save_blob(
            sync_id,
            &payload,
            unix_timestamp_ms_now(),
        )
    }

    async fn append_version(&self, trip_id: &TripId, version: &TripVersion) -> Result<()> {
        if &version.trip_id != trip_id {
            return Err(Error::InvalidInput(format!(
                "version {} belongs to trip {}, not {trip_id}",
                version.id, version.trip_id
            )));
        }
        let db = self.db.lock().await;
        SqliteBackupRepository::new(db.connection()).insert_version(version)
    }

    async fn list_versions(&self, trip_id: &TripId) -> Result<Vec<TripVersion>> {
        let db = self.db.lock().await;
        let payloads = SqliteBackupRepository::new(db.connection()).list_versions(trip_id)?;
        Ok(parse_version_payloads(payloads))
    }

    async fn search_versions(&self, query: &str) -> Result<Vec<TripVersion>> {
        let db = self.db.lock().await;
        let payloads = SqliteBackupRepository::new(db.connection()).search_versions(query)?;
        Ok(parse_version_payloads(payloads))
    }

    async fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<TripVersion>> {
        let db = self.db.lock().await;
        let payloads = SqliteBackupRepository::new(db.connection()).versions_by_id_prefix(prefix)?;
        Ok(parse_version_payloads(payloads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trip;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_blob_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backups.db");
        let sync_id = SyncId::parse("SQL-0001").unwrap();
        let dataset = Dataset::from_trips([Trip::with_id("A".into(), "Ghent")]);

        SqliteStore::open(&path)
            .unwrap()
            .write(&sync_id, &dataset)
            .await
            .unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.fetch(&sync_id).await.unwrap(), Some(dataset));
    }

    #[tokio::test]
    async fn test_versions_round_trip_through_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let trip = Trip::with_id("A".into(), "Ghent");
        let version = TripVersion::capture(&trip, "canal tour booked", 5);

        store.append_version(&trip.id, &version).await.unwrap();

        assert_eq!(store.list_versions(&trip.id).await.unwrap(), vec![version.clone()]);
        assert_eq!(store.search_versions("CANAL").await.unwrap(), vec![version.clone()]);
        assert!(store.list_versions(&"B".into()).await.unwrap().is_empty());

        let prefix = &version.id.as_str()[..8];
        assert_eq!(
            store.versions_by_id_prefix(prefix).await.unwrap(),
            vec![version]
        );
    }

    #[tokio::test]
    async fn test_duplicate_version_id_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let trip = Trip::with_id("A".into(), "Ghent");
        let version = TripVersion::capture(&trip, "once", 5);

        store.append_version(&trip.id, &version).await.unwrap();
        let error = store.append_version(&trip.id, &version).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }
}
