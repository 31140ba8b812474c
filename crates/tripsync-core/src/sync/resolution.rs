//! Collecting the user's keep-local / use-remote choices

use std::collections::{BTreeMap, BTreeSet};

use super::diff::ConflictReport;
use super::in_flight::SyncGuard;
use crate::error::{Error, Result};
use crate::models::{ConflictItem, Dataset, ResolutionMap, Side, SyncId, Trip, TripId};

/// A sync paused on conflicts, waiting for the user.
///
/// Holds the fetched remote copy and keeps the identifier marked busy until
/// it is merged, cancelled, or dropped. Dropping it is the same as
/// cancelling: nothing local or remote has been changed.
#[derive(Debug)]
pub struct PendingResolution {
    sync_id: SyncId,
    local: Dataset,
    report: ConflictReport,
    resolutions: ResolutionMap,
    guard: SyncGuard,
}

/// Everything the merge needs once the user has decided
pub(crate) struct ResolvedParts {
    pub sync_id: SyncId,
    pub local: Dataset,
    pub remote: Dataset,
    pub conflicting: BTreeSet<TripId>,
    pub guard: SyncGuard,
}

impl PendingResolution {
    pub(crate) fn new(
        sync_id: SyncId,
        local: Dataset,
        report: ConflictReport,
        guard: SyncGuard,
    ) -> Self {
        let resolutions = ResolutionMap::defaults_for(&report.conflicts);
        Self {
            sync_id,
            local,
            report,
            resolutions,
            guard,
        }
    }

    #[must_use]
    pub const fn sync_id(&self) -> &SyncId {
        &self.sync_id
    }

    #[must_use]
    pub fn conflicts(&self) -> &[ConflictItem] {
        &self.report.conflicts
    }

    /// Conflicts grouped per trip, in trip id order
    #[must_use]
    pub fn conflicts_by_trip(&self) -> BTreeMap<&TripId, Vec<&ConflictItem>> {
        let mut grouped: BTreeMap<&TripId, Vec<&ConflictItem>> = BTreeMap::new();
        for conflict in &self.report.conflicts {
            grouped.entry(&conflict.trip_id).or_default().push(conflict);
        }
        grouped
    }

    #[must_use]
    pub fn conflicting_trip_ids(&self) -> BTreeSet<TripId> {
        self.report.conflicting_trip_ids()
    }

    #[must_use]
    pub fn local_trip(&self, trip_id: &TripId) -> Option<&Trip> {
        self.local.trip(trip_id)
    }

    #[must_use]
    pub fn remote_trip(&self, trip_id: &TripId) -> Option<&Trip> {
        self.report.remote.trip(trip_id)
    }

    /// Current choices; every conflicting trip starts as [`Side::Local`].
    #[must_use]
    pub const fn resolutions(&self) -> &ResolutionMap {
        &self.resolutions
    }

    /// Pick which copy of one conflicting trip to keep.
    pub fn choose(&mut self, trip_id: &TripId, side: Side) -> Result<()> {
        if !self.resolutions.contains(trip_id) {
            return Err(Error::InvalidInput(format!(
                "trip {trip_id} has no conflicts to resolve"
            )));
        }
        self.resolutions.set(trip_id.clone(), side);
        Ok(())
    }

    /// Apply the same choice to every conflicting trip.
    pub fn choose_all(&mut self, side: Side) {
        for trip_id in self.report.conflicting_trip_ids() {
            self.resolutions.set(trip_id, side);
        }
    }

    /// Abandon the sync. The fetched remote copy is discarded.
    pub fn cancel(self) {
        tracing::info!(
            "Sync for {} cancelled with {} unresolved conflicts; nothing written",
            self.sync_id,
            self.report.conflicts.len()
        );
    }

    pub(crate) fn into_parts(self) -> ResolvedParts {
        let conflicting = self.report.conflicting_trip_ids();
        ResolvedParts {
            sync_id: self.sync_id,
            local: self.local,
            remote: self.report.remote,
            conflicting,
            guard: self.guard,
        }
    }
}
