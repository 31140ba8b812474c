//! Trip aggregate model

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::unix_timestamp_ms_now;

/// Identifier of a trip aggregate.
///
/// Ids are opaque strings so blobs written by older clients (which used
/// millisecond timestamps) stay addressable. New trips get a UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(String);

impl TripId {
    /// Create a new unique trip ID using UUID v7
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TripId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TripId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One scheduled entry on an itinerary day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    #[serde(default)]
    pub time: Option<String>,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single spend recorded against a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// A booked flight leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    #[serde(default)]
    pub airline: Option<String>,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    /// Local departure time as entered, e.g. `2025-03-01T09:40`
    #[serde(default)]
    pub departs_at: Option<String>,
}

/// Media attached to a trip (photos, scanned tickets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// A travel plan: the unit of conflict detection and versioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Immutable identifier
    pub id: TripId,
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub currency: String,
    /// Itinerary keyed by ISO date (`YYYY-MM-DD`)
    #[serde(default)]
    pub itinerary: BTreeMap<String, Vec<ItineraryItem>>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    /// Last local edit (Unix ms). Display only, never compared during sync.
    #[serde(default)]
    pub updated_at: i64,
}

impl Trip {
    /// Create an empty trip with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(TripId::generate(), title)
    }

    /// Create an empty trip with a caller-chosen id
    pub fn with_id(id: TripId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            location: String::new(),
            start_date: None,
            end_date: None,
            budget: 0.0,
            currency: String::new(),
            itinerary: BTreeMap::new(),
            media: Vec::new(),
            expenses: Vec::new(),
            flights: Vec::new(),
            updated_at: unix_timestamp_ms_now(),
        }
    }

    /// Sum of expenses recorded in the trip's own currency.
    #[must_use]
    pub fn spent_in_trip_currency(&self) -> f64 {
        self.expenses
            .iter()
            .filter(|expense| expense.currency.eq_ignore_ascii_case(&self.currency))
            .map(|expense| expense.amount)
            .sum()
    }

    #[must_use]
    pub fn itinerary_item_count(&self) -> usize {
        self.itinerary.values().map(Vec::len).sum()
    }

    /// Human-readable date range, e.g. `2025-03-01 → 2025-03-08`
    #[must_use]
    pub fn date_range_label(&self) -> String {
        let format = |date: Option<NaiveDate>| {
            date.map_or_else(|| "?".to_string(), |date| date.format("%Y-%m-%d").to_string())
        };
        match (self.start_date, self.end_date) {
            (None, None) => "unscheduled".to_string(),
            (start, end) => format!("{} → {}", format(start), format(end)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_id_unique() {
        assert_ne!(TripId::generate(), TripId::generate());
    }

    #[test]
    fn test_trip_new_is_empty() {
        let trip = Trip::new("Lisbon");
        assert_eq!(trip.title, "Lisbon");
        assert!(trip.itinerary.is_empty());
        assert!(trip.updated_at > 0);
    }

    #[test]
    fn test_date_range_label() {
        let mut trip = Trip::with_id("A".into(), "Kyoto");
        assert_eq!(trip.date_range_label(), "unscheduled");

        trip.start_date = NaiveDate::from_ymd_opt(2025, 4, 1);
        assert_eq!(trip.date_range_label(), "2025-04-01 → ?");

        trip.end_date = NaiveDate::from_ymd_opt(2025, 4, 9);
        assert_eq!(trip.date_range_label(), "2025-04-01 → 2025-04-09");
    }

    #[test]
    fn test_spent_ignores_foreign_currency() {
        let mut trip = Trip::with_id("A".into(), "Oslo");
        trip.currency = "NOK".to_string();
        trip.expenses = vec![
            Expense {
                id: "1".to_string(),
                description: "Ferry".to_string(),
                amount: 300.0,
                currency: "nok".to_string(),
                category: None,
                date: None,
            },
            Expense {
                id: "2".to_string(),
                description: "Airport coffee".to_string(),
                amount: 4.5,
                currency: "EUR".to_string(),
                category: None,
                date: None,
            },
        ];
        assert!((trip.spent_in_trip_currency() - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_trip_deserializes_with_missing_optional_fields() {
        let trip: Trip = serde_json::from_str(r#"{"id":"1700000000000","title":"Rome"}"#).unwrap();
        assert_eq!(trip.id.as_str(), "1700000000000");
        assert!(trip.flights.is_empty());
        assert_eq!(trip.updated_at, 0);
    }
}
