//! Dataset blob migrations

use serde_json::{Map, Value};

use super::dataset::CURRENT_SCHEMA_VERSION;
use crate::error::{Error, Result};

/// Bring a raw dataset blob up to the current schema version.
pub fn upgrade(mut value: Value) -> Result<Value> {
    let version = schema_version(&value)?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(Error::Schema(format!(
            "dataset schema_version {version} is newer than supported version {CURRENT_SCHEMA_VERSION}"
        )));
    }
    if version < 1 {
        migrate_v1(&mut value)?;
    }

    Ok(value)
}

/// Blobs written before versioning carry no `schema_version` at all.
fn schema_version(value: &Value) -> Result<u32> {
    let Some(object) = value.as_object() else {
        return Err(Error::Schema("dataset must be a JSON object".to_string()));
    };
    match object.get("schema_version") {
        None | Some(Value::Null) => Ok(0),
        Some(raw) => raw
            .as_u64()
            .and_then(|version| u32::try_from(version).ok())
            .ok_or_else(|| Error::Schema(format!("invalid schema_version {raw}"))),
    }
}

/// Migration to version 1: legacy browser exports (camelCase keys,
/// numeric trip ids, budgets stored as strings)
fn migrate_v1(value: &mut Value) -> Result<()> {
    let root = value
        .as_object_mut()
        .ok_or_else(|| Error::Schema("dataset must be a JSON object".to_string()))?;

    rename_keys(
        root,
        &[
            ("userProfile", "profile"),
            ("events", "calendar_events"),
            ("calendarEvents", "calendar_events"),
        ],
    );

    if let Some(Value::Object(profile)) = root.get_mut("profile") {
        rename_keys(
            profile,
            &[
                ("displayName", "display_name"),
                ("homeCurrency", "home_currency"),
                ("homeCity", "home_city"),
            ],
        );
    }

    if let Some(Value::Array(trips)) = root.get_mut("trips") {
        for trip in trips.iter_mut().filter_map(Value::as_object_mut) {
            migrate_trip_v1(trip);
        }
    }

    root.insert("schema_version".to_string(), Value::from(1));
    tracing::info!("Migrated dataset blob to schema version 1");
    Ok(())
}

fn migrate_trip_v1(trip: &mut Map<String, Value>) {
    rename_keys(
        trip,
        &[
            ("startDate", "start_date"),
            ("endDate", "end_date"),
            ("updatedAt", "updated_at"),
        ],
    );

    if let Some(Value::Number(number)) = trip.get("id") {
        let id = Value::String(number.to_string());
        trip.insert("id".to_string(), id);
    }

    let budget = match trip.get("budget") {
        Some(Value::String(raw)) => Some(raw.trim().parse::<f64>().unwrap_or(0.0)),
        Some(Value::Null) => Some(0.0),
        _ => None,
    };
    if let Some(budget) = budget {
        trip.insert("budget".to_string(), Value::from(budget));
    }

    for date_key in ["start_date", "end_date"] {
        if matches!(trip.get(date_key), Some(Value::String(raw)) if raw.trim().is_empty()) {
            trip.insert(date_key.to_string(), Value::Null);
        }
    }

    if let Some(Value::Array(flights)) = trip.get_mut("flights") {
        for flight in flights.iter_mut().filter_map(Value::as_object_mut) {
            rename_keys(
                flight,
                &[
                    ("flightNumber", "flight_number"),
                    ("departureAirport", "departure_airport"),
                    ("arrivalAirport", "arrival_airport"),
                    ("departsAt", "departs_at"),
                ],
            );
        }
    }
}

fn rename_keys(object: &mut Map<String, Value>, pairs: &[(&str, &str)]) {
    for (from, to) in pairs {
        if object.contains_key(*to) {
            continue;
        }
        if let Some(value) = object.remove(*from) {
            object.insert((*to).to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, TripId};
    use serde_json::json;

    #[test]
    fn test_legacy_blob_is_upgraded() {
        let legacy = json!({
            "trips": [{
                "id": 1_700_000_000_000_i64,
                "title": "Lisbon",
                "startDate": "2025-05-01",
                "endDate": "",
                "budget": "1250.50",
                "flights": [{
                    "id": "f1",
                    "flightNumber": "TP1351",
                    "departureAirport": "BER",
                    "arrivalAirport": "LIS"
                }]
            }],
            "userProfile": { "displayName": "Sam", "homeCurrency": "EUR" },
            "events": [{ "id": "e1", "title": "Dentist" }]
        });

        let dataset = Dataset::from_value(legacy).unwrap();
        let trip = dataset.trip(&TripId::new("1700000000000")).unwrap();
        assert!((trip.budget - 1250.5).abs() < f64::EPSILON);
        assert_eq!(trip.start_date.unwrap().to_string(), "2025-05-01");
        assert_eq!(trip.end_date, None);
        assert_eq!(trip.flights[0].flight_number, "TP1351");
        assert_eq!(dataset.profile.display_name, "Sam");
        assert_eq!(dataset.calendar_events.len(), 1);
        assert_eq!(dataset.schema_version, 1);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let error = upgrade(json!({ "schema_version": 99 })).unwrap_err();
        assert!(matches!(error, Error::Schema(_)));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(upgrade(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_current_blob_passes_through() {
        let current = json!({ "schema_version": 1, "trips": [] });
        assert_eq!(upgrade(current.clone()).unwrap(), current);
    }
}
