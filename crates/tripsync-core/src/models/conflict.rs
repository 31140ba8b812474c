//! Conflict and resolution models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::trip::TripId;

/// Trip fields compared during conflict detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripField {
    Title,
    Location,
    Dates,
    Budget,
    Currency,
    Itinerary,
    Expenses,
    Flights,
    Media,
}

impl TripField {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Location => "location",
            Self::Dates => "dates",
            Self::Budget => "budget",
            Self::Currency => "currency",
            Self::Itinerary => "itinerary",
            Self::Expenses => "expenses",
            Self::Flights => "flights",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for TripField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One differing field between the local and remote copy of a trip.
///
/// Values are display renderings; the comparison itself is done on the
/// typed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictItem {
    pub trip_id: TripId,
    /// Local title, falling back to the remote one when blank
    pub trip_title: String,
    pub field: TripField,
    pub local_value: String,
    pub remote_value: String,
}

/// Which copy of a conflicting trip to keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Whole-trip choice per conflicting trip id. Missing entries mean [`Side::Local`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionMap(BTreeMap<TripId, Side>);

impl ResolutionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every distinct trip id in `conflicts` with [`Side::Local`].
    #[must_use]
    pub fn defaults_for(conflicts: &[ConflictItem]) -> Self {
        Self(
            conflicts
                .iter()
                .map(|conflict| (conflict.trip_id.clone(), Side::Local))
                .collect(),
        )
    }

    pub fn set(&mut self, trip_id: TripId, side: Side) {
        self.0.insert(trip_id, side);
    }

    #[must_use]
    pub fn with(mut self, trip_id: impl Into<TripId>, side: Side) -> Self {
        self.set(trip_id.into(), side);
        self
    }

    #[must_use]
    pub fn side(&self, trip_id: &TripId) -> Side {
        self.0.get(trip_id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, trip_id: &TripId) -> bool {
        self.0.contains_key(trip_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TripId, Side)> {
        self.0.iter().map(|(trip_id, side)| (trip_id, *side))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(trip_id: &str, field: TripField) -> ConflictItem {
        ConflictItem {
            trip_id: trip_id.into(),
            trip_title: trip_id.to_string(),
            field,
            local_value: "l".to_string(),
            remote_value: "r".to_string(),
        }
    }

    #[test]
    fn test_defaults_cover_each_trip_once() {
        let conflicts = vec![
            conflict("A", TripField::Budget),
            conflict("A", TripField::Title),
            conflict("B", TripField::Flights),
        ];
        let map = ResolutionMap::defaults_for(&conflicts);
        assert_eq!(map.len(), 2);
        assert_eq!(map.side(&"A".into()), Side::Local);
        assert_eq!(map.side(&"B".into()), Side::Local);
    }

    #[test]
    fn test_missing_entry_defaults_to_local() {
        let map = ResolutionMap::new().with("A", Side::Remote);
        assert_eq!(map.side(&"A".into()), Side::Remote);
        assert_eq!(map.side(&"Z".into()), Side::Local);
        assert!(!map.contains(&"Z".into()));
    }

    #[test]
    fn test_resolution_map_serializes_as_plain_object() {
        let map = ResolutionMap::new().with("A", Side::Remote).with("B", Side::Local);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"A":"remote","B":"local"}"#);
    }
}
