//! Data models for Tripsync

mod conflict;
mod dataset;
mod migrations;
mod sync_id;
mod trip;
mod version;

pub use conflict::{ConflictItem, ResolutionMap, Side, TripField};
pub use dataset::{CalendarEvent, Dataset, Profile, CURRENT_SCHEMA_VERSION};
pub use sync_id::{SyncId, MAX_SYNC_ID_LEN, MIN_SYNC_ID_LEN};
pub use trip::{Expense, Flight, ItineraryItem, MediaItem, Trip, TripId};
pub use version::{TripVersion, VersionId, PLACEHOLDER_NOTE};
