//! Sync session control flow: fetch, diff, resolve, merge, write.

use super::diff::{detect_conflicts, ConflictReport};
use super::in_flight::InFlight;
use super::merge::{merge, missing_trip_ids, MergeSummary};
use super::resolution::PendingResolution;
use crate::error::{Error, Result};
use crate::models::{Dataset, ResolutionMap, SyncId};
use crate::store::RemoteStore;
use crate::util::unix_timestamp_ms_now;

/// What a sync request ended in. Failures are the `Err` side of the result.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Merged and written without asking the user anything.
    NoConflicts(Dataset),
    /// Paused; the caller collects choices and calls
    /// [`SyncEngine::resolve_and_merge`] or [`PendingResolution::cancel`].
    ConflictsFound(PendingResolution),
}

/// Result of looking up a candidate sync identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierCheck {
    pub sync_id: SyncId,
    pub has_remote_data: bool,
    pub remote_trip_count: usize,
}

/// Drives sync sessions for one identifier against one store.
pub struct SyncEngine<S> {
    store: S,
    sync_id: SyncId,
    in_flight: InFlight,
}

impl<S: RemoteStore> SyncEngine<S> {
    pub fn new(store: S, sync_id: SyncId) -> Self {
        Self {
            store,
            sync_id,
            in_flight: InFlight::default(),
        }
    }

    /// Share the in-flight registry with other engines so that at most one
    /// session per identifier runs across all of them.
    #[must_use]
    pub fn with_in_flight(mut self, in_flight: InFlight) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub const fn sync_id(&self) -> &SyncId {
        &self.sync_id
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Fetch the remote copy and compare it against `local` without writing.
    pub async fn detect_conflicts(&self, local: &Dataset) -> Result<ConflictReport> {
        let remote = self.fetch_remote(&self.sync_id).await?;
        Ok(detect_conflicts(local, remote))
    }

    /// Start a sync session.
    ///
    /// Without conflicts the merged dataset is written and returned. With
    /// conflicts nothing is written and the session stays open, holding the
    /// identifier, until the returned [`PendingResolution`] is consumed.
    /// `local` is never modified; the caller persists whatever is returned.
    pub async fn request_sync(&self, local: &Dataset) -> Result<SyncOutcome> {
        let guard = self.in_flight.acquire(&self.sync_id)?;
        tracing::info!("Sync started for {}", self.sync_id);

        let remote = self.fetch_remote(&self.sync_id).await?;
        let report = detect_conflicts(local, remote);

        if report.has_conflicts() {
            tracing::info!(
                "Sync for {} paused on {} conflicting fields across {} trips",
                self.sync_id,
                report.conflicts.len(),
                report.conflicting_trip_ids().len()
            );
            return Ok(SyncOutcome::ConflictsFound(PendingResolution::new(
                self.sync_id.clone(),
                local.clone(),
                report,
                guard,
            )));
        }

        let merged = self
            .commit(&self.sync_id, local, &report.remote, &ResolutionMap::new())
            .await?;
        drop(guard);
        Ok(SyncOutcome::NoConflicts(merged))
    }

    /// Finish a paused session with the user's choices.
    ///
    /// Conflicting trips missing from `resolutions` keep the local copy.
    /// Entries for trips that had no conflict are ignored. The dataset
    /// returned is exactly what was written.
    pub async fn resolve_and_merge(
        &self,
        pending: PendingResolution,
        resolutions: &ResolutionMap,
    ) -> Result<Dataset> {
        let parts = pending.into_parts();

        for (trip_id, _) in resolutions.iter() {
            if !parts.conflicting.contains(trip_id) {
                tracing::warn!("Ignoring resolution for non-conflicting trip {}", trip_id);
            }
        }
        let mut effective = ResolutionMap::new();
        for trip_id in &parts.conflicting {
            effective.set(trip_id.clone(), resolutions.side(trip_id));
        }

        let merged = self
            .commit(&parts.sync_id, &parts.local, &parts.remote, &effective)
            .await;
        drop(parts.guard);
        merged
    }

    /// Finish a paused session with the choices collected on it.
    pub async fn confirm(&self, pending: PendingResolution) -> Result<Dataset> {
        let resolutions = pending.resolutions().clone();
        self.resolve_and_merge(pending, &resolutions).await
    }

    /// Validate `raw` and report whether data already exists under it.
    ///
    /// Validation happens before any store call. The engine keeps its current
    /// identifier; call [`Self::set_identifier`] once the user has agreed.
    pub async fn inspect_identifier(&self, raw: &str) -> Result<IdentifierCheck> {
        let sync_id = SyncId::parse(raw)?;
        let remote = self
            .store
            .fetch(&sync_id)
            .await
            .map_err(Error::into_remote_failure)?;
        let remote_trip_count = remote.as_ref().map_or(0, |dataset| dataset.trips.len());
        let has_remote_data = remote.is_some_and(|dataset| !dataset.is_empty());
        if has_remote_data {
            tracing::warn!(
                "Sync identifier {} already holds {} trips; the next sync merges with them",
                sync_id,
                remote_trip_count
            );
        }
        Ok(IdentifierCheck {
            sync_id,
            has_remote_data,
            remote_trip_count,
        })
    }

    /// Point later sessions at `sync_id`. Open sessions keep their own.
    pub fn set_identifier(&mut self, sync_id: SyncId) {
        tracing::info!("Sync identifier changed from {} to {}", self.sync_id, sync_id);
        self.sync_id = sync_id;
    }

    async fn fetch_remote(&self, sync_id: &SyncId) -> Result<Dataset> {
        let remote = self
            .store
            .fetch(sync_id)
            .await
            .map_err(Error::into_remote_failure)?;
        if remote.is_none() {
            tracing::debug!("No remote copy for {}; treating it as empty", sync_id);
        }
        Ok(remote.unwrap_or_default())
    }

    async fn commit(
        &self,
        sync_id: &SyncId,
        local: &Dataset,
        remote: &Dataset,
        resolutions: &ResolutionMap,
    ) -> Result<Dataset> {
        let (mut merged, summary) = merge(local, remote, resolutions);
        debug_assert!(missing_trip_ids(local, remote, &merged).is_empty());
        merged.synced_at = Some(unix_timestamp_ms_now());

        self.store
            .write(sync_id, &merged)
            .await
            .map_err(Error::into_remote_failure)?;

        log_summary(sync_id, &summary);
        Ok(merged)
    }
}

fn log_summary(sync_id: &SyncId, summary: &MergeSummary) {
    tracing::info!(
        "Sync for {} wrote {} trips ({} local only, {} remote only, {} kept local, {} took remote)",
        sync_id,
        summary.total(),
        summary.local_only,
        summary.remote_only,
        summary.kept_local,
        summary.took_remote
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Side, Trip, TripId};
    use crate::store::{MemoryStore, StoreFailure};
    use pretty_assertions::assert_eq;

    fn sync_id() -> SyncId {
        SyncId::parse("FAMILY-2025").unwrap()
    }

    fn engine(store: &MemoryStore) -> SyncEngine<MemoryStore> {
        SyncEngine::new(store.clone(), sync_id())
    }

    fn trip(id: &str, title: &str, budget: f64) -> Trip {
        let mut trip = Trip::with_id(TripId::from(id), title);
        trip.budget = budget;
        trip
    }

    async fn seed(store: &MemoryStore, dataset: &Dataset) {
        store.write(&sync_id(), dataset).await.unwrap();
    }

    async fn stored(store: &MemoryStore) -> Dataset {
        store.fetch(&sync_id()).await.unwrap().unwrap()
    }

    fn expect_pending(outcome: SyncOutcome) -> PendingResolution {
        match outcome {
            SyncOutcome::ConflictsFound(pending) => pending,
            SyncOutcome::NoConflicts(_) => panic!("expected conflicts"),
        }
    }

    fn expect_merged(outcome: SyncOutcome) -> Dataset {
        match outcome {
            SyncOutcome::NoConflicts(dataset) => dataset,
            SyncOutcome::ConflictsFound(_) => panic!("expected no conflicts"),
        }
    }

    #[tokio::test]
    async fn test_first_sync_writes_local_data() {
        let store = MemoryStore::new();
        let local = Dataset::from_trips([trip("A", "Lisbon", 900.0)]);

        let merged = expect_merged(engine(&store).request_sync(&local).await.unwrap());

        assert_eq!(merged.trips, local.trips);
        assert!(merged.synced_at.is_some());
        assert_eq!(stored(&store).await, merged);
    }

    #[tokio::test]
    async fn test_disjoint_trips_are_unioned_without_prompt() {
        let store = MemoryStore::new();
        seed(&store, &Dataset::from_trips([trip("B", "Porto", 300.0)])).await;
        let local = Dataset::from_trips([trip("A", "Lisbon", 900.0)]);

        let merged = expect_merged(engine(&store).request_sync(&local).await.unwrap());

        assert_eq!(
            merged.trip_ids(),
            [TripId::from("A"), TripId::from("B")].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn test_budget_conflict_resolved_to_remote() {
        let store = MemoryStore::new();
        let remote = Dataset::from_trips([trip("A", "Lisbon", 200.0)]);
        seed(&store, &remote).await;
        let local = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let engine = engine(&store);

        let mut pending = expect_pending(engine.request_sync(&local).await.unwrap());
        assert_eq!(pending.conflicts().len(), 1);
        assert_eq!(pending.conflicts()[0].local_value, "100");
        assert_eq!(pending.conflicts()[0].remote_value, "200");

        pending.choose(&"A".into(), Side::Remote).unwrap();
        let merged = engine.confirm(pending).await.unwrap();

        assert!((merged.trip(&"A".into()).unwrap().budget - 200.0).abs() < f64::EPSILON);
        assert_eq!(stored(&store).await, merged);
    }

    #[tokio::test]
    async fn test_unresolved_conflicts_keep_local() {
        let store = MemoryStore::new();
        seed(&store, &Dataset::from_trips([trip("A", "Lisbon", 200.0)])).await;
        let local = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let engine = engine(&store);

        let pending = expect_pending(engine.request_sync(&local).await.unwrap());
        let merged = engine
            .resolve_and_merge(pending, &ResolutionMap::new().with("Z", Side::Remote))
            .await
            .unwrap();

        assert!((merged.trip(&"A".into()).unwrap().budget - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_cancel_writes_nothing() {
        let store = MemoryStore::new();
        let remote = Dataset::from_trips([trip("A", "Lisbon", 200.0)]);
        seed(&store, &remote).await;
        let before = store.raw_blob(&sync_id());
        let local = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let engine = engine(&store);

        let pending = expect_pending(engine.request_sync(&local).await.unwrap());
        pending.cancel();

        assert_eq!(store.raw_blob(&sync_id()), before);
        assert!(!engine.in_flight().is_busy(&sync_id()));
    }

    #[tokio::test]
    async fn test_second_session_is_rejected_while_pending() {
        let store = MemoryStore::new();
        seed(&store, &Dataset::from_trips([trip("A", "Lisbon", 200.0)])).await;
        let local = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let engine = engine(&store);

        let pending = expect_pending(engine.request_sync(&local).await.unwrap());
        let error = engine.request_sync(&local).await.unwrap_err();
        assert!(matches!(error, Error::SyncInProgress(_)));

        drop(pending);
        assert!(engine.request_sync(&local).await.is_ok());
    }

    #[tokio::test]
    async fn test_engines_sharing_registry_exclude_each_other() {
        let store = MemoryStore::new();
        seed(&store, &Dataset::from_trips([trip("A", "Lisbon", 200.0)])).await;
        let local = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let registry = InFlight::default();
        let phone = engine(&store).with_in_flight(registry.clone());
        let laptop = engine(&store).with_in_flight(registry);

        let _pending = expect_pending(phone.request_sync(&local).await.unwrap());

        assert!(matches!(
            laptop.request_sync(&local).await,
            Err(Error::SyncInProgress(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_fetch_fails_before_any_resolution() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let engine = engine(&store);

        let error = engine.request_sync(&Dataset::default()).await.unwrap_err();

        assert!(matches!(error, Error::RemoteUnavailable(_)));
        assert!(!engine.in_flight().is_busy(&sync_id()));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_remote_untouched() {
        let store = MemoryStore::new();
        seed(&store, &Dataset::from_trips([trip("A", "Lisbon", 200.0)])).await;
        let before = store.raw_blob(&sync_id());
        let local = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let engine = engine(&store);

        let pending = expect_pending(engine.request_sync(&local).await.unwrap());
        store.fail_next_write(StoreFailure::Unavailable);
        let error = engine.confirm(pending).await.unwrap_err();

        assert!(matches!(error, Error::RemoteUnavailable(_)));
        assert!(error.is_retryable());
        assert_eq!(store.raw_blob(&sync_id()), before);
        assert!(!engine.in_flight().is_busy(&sync_id()));
    }

    #[tokio::test]
    async fn test_stale_write_surfaces_as_remote_unavailable() {
        let store = MemoryStore::new();
        store.fail_next_write(StoreFailure::Stale);

        let error = engine(&store)
            .request_sync(&Dataset::from_trips([trip("A", "Lisbon", 1.0)]))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::RemoteUnavailable(_)));
        assert!(error.to_string().contains("run the sync again"));
    }

    #[tokio::test]
    async fn test_two_devices_converge() {
        let store = MemoryStore::new();
        let phone = engine(&store);
        let laptop = engine(&store);

        let phone_data = Dataset::from_trips([trip("A", "Lisbon", 100.0)]);
        let laptop_data = Dataset::from_trips([trip("B", "Kyoto", 2000.0)]);

        let after_phone = expect_merged(phone.request_sync(&phone_data).await.unwrap());
        let after_laptop = expect_merged(laptop.request_sync(&laptop_data).await.unwrap());
        let phone_again = expect_merged(phone.request_sync(&after_phone).await.unwrap());

        assert_eq!(after_laptop.trip_ids().len(), 2);
        assert_eq!(phone_again.trips, after_laptop.trips);
    }

    #[tokio::test]
    async fn test_invalid_identifier_rejected_before_network() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let error = engine(&store).inspect_identifier("AB").await.unwrap_err();

        assert!(matches!(error, Error::IdentifierInvalid(_)));
    }

    #[tokio::test]
    async fn test_inspect_identifier_reports_existing_data() {
        let store = MemoryStore::new();
        let other = SyncId::parse("WORK-TRIPS").unwrap();
        store
            .write(&other, &Dataset::from_trips([trip("W", "Oslo", 1.0)]))
            .await
            .unwrap();
        let mut engine = engine(&store);

        let check = engine.inspect_identifier(" work-trips ").await.unwrap();
        assert_eq!(
            check,
            IdentifierCheck {
                sync_id: other.clone(),
                has_remote_data: true,
                remote_trip_count: 1,
            }
        );

        let fresh = engine.inspect_identifier("NEW-ID-01").await.unwrap();
        assert!(!fresh.has_remote_data);

        engine.set_identifier(check.sync_id);
        assert_eq!(engine.sync_id(), &other);
    }
}
