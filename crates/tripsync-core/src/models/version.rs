//! Trip version (named snapshot) model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::trip::{Trip, TripId};

/// Note stored when the user saves a snapshot without describing it
pub const PLACEHOLDER_NOTE: &str = "Manual snapshot";

/// A unique identifier for a trip version, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(Uuid);

impl VersionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Immutable, user-named snapshot of one trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripVersion {
    pub id: VersionId,
    /// Trip the snapshot was taken from
    pub trip_id: TripId,
    /// Capture time (Unix ms)
    pub timestamp: i64,
    pub note: String,
    /// Frozen copy of the trip at capture time
    pub data: Trip,
}

impl TripVersion {
    /// Freeze a copy of `trip`. Empty notes fall back to [`PLACEHOLDER_NOTE`].
    pub fn capture(trip: &Trip, note: &str, timestamp: i64) -> Self {
        let note = note.trim();
        Self {
            id: VersionId::new(),
            trip_id: trip.id.clone(),
            timestamp,
            note: if note.is_empty() {
                PLACEHOLDER_NOTE.to_string()
            } else {
                note.to_string()
            },
            data: trip.clone(),
        }
    }

    #[must_use]
    pub fn trip_title(&self) -> &str {
        &self.data.title
    }

    /// Case-insensitive match on the note or the snapshotted trip title.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.note.to_lowercase().contains(&query)
            || self.data.title.to_lowercase().contains(&query)
    }

    /// A snapshot is usable only when it names a trip and holds trip data.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.trip_id.is_blank() && !self.data.id.is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_uses_placeholder_for_empty_note() {
        let trip = Trip::with_id("A".into(), "Porto");
        let version = TripVersion::capture(&trip, "   ", 42);
        assert_eq!(version.note, PLACEHOLDER_NOTE);
        assert_eq!(version.trip_id, trip.id);
        assert_eq!(version.timestamp, 42);
    }

    #[test]
    fn test_capture_is_detached_from_source() {
        let mut trip = Trip::with_id("A".into(), "Porto");
        trip.budget = 100.0;
        let version = TripVersion::capture(&trip, "before changes", 1);

        trip.budget = 900.0;
        trip.title = "Porto and Braga".to_string();

        assert!((version.data.budget - 100.0).abs() < f64::EPSILON);
        assert_eq!(version.trip_title(), "Porto");
    }

    #[test]
    fn test_matches_query_checks_note_and_title() {
        let trip = Trip::with_id("A".into(), "Iceland Ring Road");
        let version = TripVersion::capture(&trip, "Before flight change", 1);
        assert!(version.matches_query("flight"));
        assert!(version.matches_query("ICELAND"));
        assert!(!version.matches_query("norway"));
        assert!(!version.matches_query("  "));
    }

    #[test]
    fn test_version_id_parse() {
        let id = VersionId::new();
        let parsed: VersionId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
