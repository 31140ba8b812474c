//! Field-level comparison of the local and remote copy of each trip

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::{
    ConflictItem, Dataset, Expense, Flight, ItineraryItem, MediaItem, Trip, TripField, TripId,
};

/// Result of probing the remote copy.
///
/// Carries the fetched remote dataset so the merge does not fetch it again.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    pub conflicts: Vec<ConflictItem>,
    pub remote: Dataset,
}

impl ConflictReport {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Distinct trip ids that have at least one conflicting field.
    #[must_use]
    pub fn conflicting_trip_ids(&self) -> BTreeSet<TripId> {
        self.conflicts
            .iter()
            .map(|conflict| conflict.trip_id.clone())
            .collect()
    }
}

/// Compare every trip present on both sides. Trips present on one side only
/// are not conflicts.
pub fn detect_conflicts(local: &Dataset, remote: Dataset) -> ConflictReport {
    let conflicts = local
        .trips
        .iter()
        .filter_map(|(trip_id, local_trip)| {
            remote
                .trip(trip_id)
                .map(|remote_trip| diff_trip(local_trip, remote_trip))
        })
        .flatten()
        .collect();

    ConflictReport { conflicts, remote }
}

/// One [`ConflictItem`] per compared field whose values differ.
pub fn diff_trip(local: &Trip, remote: &Trip) -> Vec<ConflictItem> {
    let ours = Comparable::from(local);
    let theirs = Comparable::from(remote);

    let trip_title = if local.title.trim().is_empty() {
        remote.title.clone()
    } else {
        local.title.clone()
    };

    ours.differing_fields(&theirs)
        .into_iter()
        .map(|field| ConflictItem {
            trip_id: local.id.clone(),
            trip_title: trip_title.clone(),
            field,
            local_value: render_field(field, local),
            remote_value: render_field(field, remote),
        })
        .collect()
}

/// Borrowed view of every compared field. It is built by destructuring, so
/// adding a field to `Trip` will not compile until it is classified here.
struct Comparable<'a> {
    title: &'a str,
    location: &'a str,
    dates: (Option<NaiveDate>, Option<NaiveDate>),
    budget: f64,
    currency: &'a str,
    itinerary: &'a BTreeMap<String, Vec<ItineraryItem>>,
    expenses: Vec<&'a Expense>,
    flights: Vec<&'a Flight>,
    media: &'a [MediaItem],
}

impl<'a> From<&'a Trip> for Comparable<'a> {
    fn from(trip: &'a Trip) -> Self {
        let Trip {
            id: _,
            title,
            location,
            start_date,
            end_date,
            budget,
            currency,
            itinerary,
            media,
            expenses,
            flights,
            updated_at: _,
        } = trip;

        Self {
            title,
            location,
            dates: (*start_date, *end_date),
            budget: *budget,
            currency,
            itinerary,
            expenses: sorted_by_id(expenses, |expense| &expense.id),
            flights: sorted_by_id(flights, |flight| &flight.id),
            media,
        }
    }
}

impl Comparable<'_> {
    #[allow(clippy::float_cmp)] // budgets are compared by stored value
    fn differing_fields(&self, other: &Self) -> Vec<TripField> {
        [
            (TripField::Title, self.title != other.title),
            (TripField::Location, self.location != other.location),
            (TripField::Dates, self.dates != other.dates),
            (TripField::Budget, self.budget != other.budget),
            (TripField::Currency, self.currency != other.currency),
            (TripField::Itinerary, self.itinerary != other.itinerary),
            (TripField::Expenses, self.expenses != other.expenses),
            (TripField::Flights, self.flights != other.flights),
            (TripField::Media, self.media != other.media),
        ]
        .into_iter()
        .filter_map(|(field, differs)| differs.then_some(field))
        .collect()
    }
}

// Expenses and flights are keyed records; reordering them is not an edit.
fn sorted_by_id<T>(items: &[T], id: impl Fn(&T) -> &String) -> Vec<&T> {
    let mut sorted = items.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| id(left).cmp(id(right)));
    sorted
}

fn render_field(field: TripField, trip: &Trip) -> String {
    match field {
        TripField::Title => or_placeholder(&trip.title, "(untitled)"),
        TripField::Location => or_placeholder(&trip.location, "(none)"),
        TripField::Dates => trip.date_range_label(),
        TripField::Budget => format_amount(trip.budget),
        TripField::Currency => or_placeholder(&trip.currency, "(none)"),
        TripField::Itinerary => format!(
            "{} days, {} items",
            trip.itinerary.len(),
            trip.itinerary_item_count()
        ),
        TripField::Expenses => {
            let total: f64 = trip.expenses.iter().map(|expense| expense.amount).sum();
            format!("{} expenses, {} total", trip.expenses.len(), format_amount(total))
        }
        TripField::Flights => {
            if trip.flights.is_empty() {
                "(none)".to_string()
            } else {
                trip.flights
                    .iter()
                    .map(|flight| {
                        format!(
                            "{} {}→{}",
                            flight.flight_number, flight.departure_airport, flight.arrival_airport
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
        TripField::Media => format!("{} attachments", trip.media.len()),
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// `100` for whole amounts, `12.50` otherwise.
pub(crate) fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}
