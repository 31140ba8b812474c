//! Combining local and remote datasets

use std::collections::BTreeSet;

use crate::models::{Dataset, ResolutionMap, Side, TripId, CURRENT_SCHEMA_VERSION};

/// Counts describing where each merged trip came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub local_only: usize,
    pub remote_only: usize,
    pub kept_local: usize,
    pub took_remote: usize,
}

impl MergeSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.local_only + self.remote_only + self.kept_local + self.took_remote
    }
}

/// Merge `remote` into `local`.
///
/// Trips on one side only are carried over untouched. For trips on both
/// sides, the resolution decides; unresolved ids keep the local copy. Profile
/// and loose calendar events are always taken from `local`.
pub fn merge(
    local: &Dataset,
    remote: &Dataset,
    resolutions: &ResolutionMap,
) -> (Dataset, MergeSummary) {
    let mut merged = Dataset {
        schema_version: CURRENT_SCHEMA_VERSION,
        trips: local.trips.clone(),
        profile: local.profile.clone(),
        calendar_events: local.calendar_events.clone(),
        synced_at: None,
    };
    let mut summary = MergeSummary::default();

    for (trip_id, remote_trip) in &remote.trips {
        if !local.trips.contains_key(trip_id) {
            merged.upsert_trip(remote_trip.clone());
            summary.remote_only += 1;
            continue;
        }

        match resolutions.side(trip_id) {
            Side::Remote => {
                merged.upsert_trip(remote_trip.clone());
                summary.took_remote += 1;
            }
            Side::Local => summary.kept_local += 1,
        }
    }
    summary.local_only = local
        .trips
        .keys()
        .filter(|trip_id| !remote.trips.contains_key(*trip_id))
        .count();

    (merged, summary)
}

/// Trip ids present before the merge but missing after it. Always empty for
/// output of [`merge`]; checked before anything is written.
pub fn missing_trip_ids(local: &Dataset, remote: &Dataset, merged: &Dataset) -> BTreeSet<TripId> {
    local
        .trips
        .keys()
        .chain(remote.trips.keys())
        .filter(|trip_id| !merged.trips.contains_key(*trip_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalendarEvent, Trip};
    use pretty_assertions::assert_eq;

    fn trip(id: &str, budget: f64) -> Trip {
        let mut trip = Trip::with_id(id.into(), format!("Trip {id}"));
        trip.budget = budget;
        trip
    }

    #[test]
    fn test_disjoint_datasets_form_union() {
        let local = Dataset::from_trips([trip("A", 1.0), trip("B", 2.0)]);
        let remote = Dataset::from_trips([trip("C", 3.0), trip("D", 4.0), trip("E", 5.0)]);

        let (merged, summary) = merge(&local, &remote, &ResolutionMap::new());

        assert_eq!(merged.trips.len(), 5);
        assert_eq!(summary.local_only, 2);
        assert_eq!(summary.remote_only, 3);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn test_remote_resolution_takes_whole_remote_trip() {
        let local = Dataset::from_trips([trip("A", 100.0)]);
        let mut remote_trip = trip("A", 200.0);
        remote_trip.title = "Remote title".to_string();
        remote_trip.location = "Sintra".to_string();
        remote_trip.updated_at = 7;
        let remote = Dataset::from_trips([remote_trip.clone()]);

        let resolutions = ResolutionMap::new().with("A", Side::Remote);
        let (merged, summary) = merge(&local, &remote, &resolutions);

        assert_eq!(merged.trip(&"A".into()), Some(&remote_trip));
        assert_eq!(summary.took_remote, 1);
    }

    #[test]
    fn test_unresolved_conflict_keeps_local() {
        let local_trip = trip("A", 100.0);
        let local = Dataset::from_trips([local_trip.clone()]);
        let remote = Dataset::from_trips([trip("A", 200.0)]);

        let (merged, summary) = merge(&local, &remote, &ResolutionMap::new());

        assert_eq!(merged.trip(&"A".into()), Some(&local_trip));
        assert_eq!(summary.kept_local, 1);
    }

    #[test]
    fn test_budget_scenario() {
        let local = Dataset::from_trips([trip("A", 100.0)]);
        let remote = Dataset::from_trips([trip("A", 200.0), trip("B", 50.0)]);

        let resolutions = ResolutionMap::new().with("A", Side::Remote);
        let (merged, _) = merge(&local, &remote, &resolutions);

        let budgets = merged
            .trips
            .values()
            .map(|trip| (trip.id.to_string(), trip.budget))
            .collect::<Vec<_>>();
        assert_eq!(
            budgets,
            vec![("A".to_string(), 200.0), ("B".to_string(), 50.0)]
        );
    }

    #[test]
    fn test_no_trip_is_lost_for_any_resolution() {
        let local = Dataset::from_trips([trip("A", 1.0), trip("B", 1.0), trip("C", 1.0)]);
        let remote = Dataset::from_trips([trip("B", 2.0), trip("C", 2.0), trip("D", 2.0)]);

        for resolutions in [
            ResolutionMap::new(),
            ResolutionMap::new().with("B", Side::Remote),
            ResolutionMap::new()
                .with("B", Side::Remote)
                .with("C", Side::Remote),
            ResolutionMap::new().with("B", Side::Local).with("C", Side::Remote),
        ] {
            let (merged, _) = merge(&local, &remote, &resolutions);
            assert!(missing_trip_ids(&local, &remote, &merged).is_empty());
            assert_eq!(merged.trips.len(), 4);
        }
    }

    #[test]
    fn test_profile_and_events_come_from_local() {
        let mut local = Dataset::default();
        local.profile.display_name = "Local".to_string();
        local.calendar_events.push(CalendarEvent {
            id: "e1".to_string(),
            title: "Visa appointment".to_string(),
            date: None,
            time: None,
            notes: None,
        });
        let mut remote = Dataset::default();
        remote.profile.display_name = "Remote".to_string();

        let (merged, _) = merge(&local, &remote, &ResolutionMap::new());

        assert_eq!(merged.profile.display_name, "Local");
        assert_eq!(merged.calendar_events, local.calendar_events);
    }

    #[test]
    fn test_resolution_for_one_sided_trip_is_ignored() {
        let local = Dataset::default();
        let remote = Dataset::from_trips([trip("B", 50.0)]);
        let resolutions = ResolutionMap::new().with("B", Side::Local);

        let (merged, _) = merge(&local, &remote, &resolutions);
        assert!(merged.trip(&"B".into()).is_some());
    }
}
