//! Dataset model: everything one sync identifier stores remotely

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::migrations;
use super::trip::{Trip, TripId};
use crate::error::Result;

/// Schema version written by this client
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Traveller profile. Merged by replacement, never diffed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub home_currency: String,
    #[serde(default)]
    pub home_city: Option<String>,
}

/// Calendar entry not attached to any trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Full exportable state for one sync identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub schema_version: u32,
    /// Trips keyed by id; serialized as a list
    #[serde(default, with = "trip_list")]
    pub trips: BTreeMap<TripId, Trip>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    /// When this copy was last written by a sync (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<i64>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            trips: BTreeMap::new(),
            profile: Profile::default(),
            calendar_events: Vec::new(),
            synced_at: None,
        }
    }
}

impl Dataset {
    /// Build a dataset from a list of trips
    pub fn from_trips(trips: impl IntoIterator<Item = Trip>) -> Self {
        let mut dataset = Self::default();
        for trip in trips {
            dataset.upsert_trip(trip);
        }
        dataset
    }

    /// Parse a stored blob, upgrading older schema versions first.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Same as [`Dataset::from_json`] for an already-parsed value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let upgraded = migrations::upgrade(value)?;
        Ok(serde_json::from_value(upgraded)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn trip(&self, id: &TripId) -> Option<&Trip> {
        self.trips.get(id)
    }

    /// Insert or replace a trip, returning the previous copy.
    pub fn upsert_trip(&mut self, trip: Trip) -> Option<Trip> {
        self.trips.insert(trip.id.clone(), trip)
    }

    #[must_use]
    pub fn trip_ids(&self) -> BTreeSet<TripId> {
        self.trips.keys().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty() && self.calendar_events.is_empty() && self.profile == Profile::default()
    }
}

mod trip_list {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::trip::{Trip, TripId};

    pub fn serialize<S: Serializer>(
        trips: &BTreeMap<TripId, Trip>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(trips.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<TripId, Trip>, D::Error> {
        let list = Vec::<Trip>::deserialize(deserializer)?;
        let mut trips = BTreeMap::new();
        for trip in list {
            let id = trip.id.clone();
            if trips.insert(id.clone(), trip).is_some() {
                return Err(D::Error::custom(format!("duplicate trip id {id}")));
            }
        }
        Ok(trips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dataset_json_keeps_trips_as_list() {
        let dataset = Dataset::from_trips([
            Trip::with_id("B".into(), "Berlin"),
            Trip::with_id("A".into(), "Athens"),
        ]);
        let json = dataset.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["trips"].is_array());
        assert_eq!(value["trips"][0]["id"], "A");

        let parsed = Dataset::from_json(&json).unwrap();
        assert_eq!(parsed, dataset);
    }

    #[test]
    fn test_duplicate_trip_ids_are_rejected() {
        let raw = r#"{"schema_version":1,"trips":[{"id":"A","title":"x"},{"id":"A","title":"y"}]}"#;
        let error = Dataset::from_json(raw).unwrap_err();
        assert!(error.to_string().contains("duplicate trip id A"));
    }

    #[test]
    fn test_default_dataset_is_empty() {
        let dataset = Dataset::default();
        assert!(dataset.is_empty());
        assert_eq!(dataset.schema_version, CURRENT_SCHEMA_VERSION);
    }
}
