//! Named, immutable snapshots of single trips.
//!
//! Versions live in the backup store next to the dataset blobs and are only
//! ever appended. Restoring a version hands back a trip for the caller to
//! persist; the version itself is left in place.

use crate::error::{Error, Result};
use crate::models::{Trip, TripId, TripVersion, VersionId};
use crate::store::RemoteStore;
use crate::util::unix_timestamp_ms_now;

/// Trip produced from a stored version
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredTrip {
    pub trip: Trip,
    pub version_id: VersionId,
    /// Trip the version was captured from
    pub source_trip_id: TripId,
    /// Whether the version came from a different trip than the target
    pub cross_trip: bool,
}

/// Version operations against one backup store.
pub struct VersionHistory<S> {
    store: S,
}

impl<S: RemoteStore> VersionHistory<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot `trip` under `note`. An empty note is stored as
    /// [`PLACEHOLDER_NOTE`](crate::models::PLACEHOLDER_NOTE).
    pub async fn save_version(&self, trip: &Trip, note: &str) -> Result<TripVersion> {
        if trip.id.is_blank() {
            return Err(Error::InvalidInput(
                "cannot snapshot a trip without an id".to_string(),
            ));
        }
        let version = TripVersion::capture(trip, note, unix_timestamp_ms_now());
        self.store
            .append_version(&trip.id, &version)
            .await
            .map_err(Error::into_remote_failure)?;
        tracing::info!(
            "Saved version {} of trip {} ({})",
            version.id,
            trip.id,
            version.note
        );
        Ok(version)
    }

    /// All versions of `trip_id`, newest first.
    pub async fn list_versions(&self, trip_id: &TripId) -> Result<Vec<TripVersion>> {
        let mut versions = self
            .store
            .list_versions(trip_id)
            .await
            .map_err(Error::into_remote_failure)?;
        versions.retain(|version| &version.trip_id == trip_id);
        sort_newest_first(&mut versions);
        Ok(versions)
    }

    /// Versions of any trip whose note or trip title contains `query`,
    /// ignoring case. Newest first.
    pub async fn find_versions(&self, query: &str) -> Result<Vec<TripVersion>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }
        let mut versions = self
            .store
            .search_versions(query)
            .await
            .map_err(Error::into_remote_failure)?;
        versions.retain(|version| version.matches_query(query));
        sort_newest_first(&mut versions);
        versions.dedup_by(|a, b| a.id == b.id);
        Ok(versions)
    }

    /// Look up one version of any trip by its id or a unique prefix of it.
    ///
    /// Works without the trip being known locally, so a version found by
    /// [`find_versions`](Self::find_versions) can always be restored.
    pub async fn find_version(&self, reference: &str) -> Result<TripVersion> {
        let prefix = reference.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(Error::InvalidInput(
                "version id must not be empty".to_string(),
            ));
        }

        let mut matches = self
            .store
            .versions_by_id_prefix(&prefix)
            .await
            .map_err(Error::into_remote_failure)?;
        matches.retain(|version| version.id.as_str().starts_with(&prefix));
        sort_newest_first(&mut matches);
        matches.dedup_by(|a, b| a.id == b.id);

        if let Some(exact) = matches.iter().position(|version| version.id.as_str() == prefix) {
            return Ok(matches.swap_remove(exact));
        }
        match matches.len() {
            0 => Err(Error::VersionNotFound(format!(
                "no version id starts with '{prefix}'"
            ))),
            1 => Ok(matches.remove(0)),
            count => Err(Error::InvalidInput(format!(
                "version id prefix '{prefix}' is ambiguous ({count} matches)"
            ))),
        }
    }
}

/// Build the trip to store under `target` from `version`.
///
/// The result equals the snapshotted data except that its id is always
/// `target`, which may differ from the trip the version was taken from.
pub fn restore(version: &TripVersion, target: &TripId) -> Result<RestoredTrip> {
    if !version.is_well_formed() {
        return Err(Error::VersionNotFound(format!(
            "version {} has no usable trip data",
            version.id
        )));
    }
    if target.is_blank() {
        return Err(Error::InvalidInput(
            "restore target must not be empty".to_string(),
        ));
    }

    let mut trip = version.data.clone();
    trip.id = target.clone();
    let cross_trip = &version.trip_id != target;
    if cross_trip {
        tracing::warn!(
            "Restoring version {} of trip {} onto trip {}",
            version.id,
            version.trip_id,
            target
        );
    }

    Ok(RestoredTrip {
        trip,
        version_id: version.id,
        source_trip_id: version.trip_id.clone(),
        cross_trip,
    })
}

fn sort_newest_first(versions: &mut [TripVersion]) {
    versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}
