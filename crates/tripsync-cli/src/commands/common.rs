use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tripsync_core::{AnyStore, ConflictItem, Dataset, SyncId, Trip, TripVersion, UsageCounter};

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;

/// Profile, paths and store settings resolved for one command.
#[derive(Debug)]
pub struct Session {
    pub profile_name: String,
    pub profile: CliProfile,
    pub data_path: PathBuf,
    pub usage: UsageCounter,
}

impl Session {
    pub fn load(
        global_profile: Option<&str>,
        cli_data_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(global_profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        Self::from_profile(profile_name, profile, cli_data_path)
    }

    pub fn from_profile(
        profile_name: String,
        profile: CliProfile,
        cli_data_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let data_path = resolve_data_path(cli_data_path, &profile)?;
        Ok(Self {
            profile_name,
            profile,
            data_path,
            usage: UsageCounter::default(),
        })
    }

    pub fn require_sync_id(&self) -> Result<SyncId, CliError> {
        self.profile
            .sync_id()
            .map_err(CliError::Config)?
            .ok_or(CliError::SyncNotConfigured)
    }

    pub fn open_store(&self) -> Result<AnyStore, CliError> {
        let config = self.profile.store_config();
        let store = AnyStore::open(&config, self.usage.clone())?;
        if matches!(store, AnyStore::Memory(_)) {
            tracing::warn!(
                "Profile '{}' uses the in-memory store; nothing is kept after this command",
                self.profile_name
            );
        }
        Ok(store)
    }

    pub fn load_dataset(&self) -> Result<Dataset, CliError> {
        load_local_dataset(&self.data_path)
    }

    pub fn save_dataset(&self, dataset: &Dataset) -> Result<(), CliError> {
        save_local_dataset(&self.data_path, dataset)
    }

    pub fn log_usage(&self) {
        let usage = self.usage.snapshot();
        if usage.total() > 0 {
            tracing::debug!(
                "Backup store calls: {} fetches, {} writes, {} version appends, {} version queries",
                usage.fetches,
                usage.writes,
                usage.version_appends,
                usage.version_queries
            );
        }
    }
}

pub fn resolve_data_path(
    cli_data_path: Option<PathBuf>,
    profile: &CliProfile,
) -> Result<PathBuf, CliError> {
    let explicit =
        cli_data_path.or_else(|| env::var_os("TRIPSYNC_DATA_PATH").map(PathBuf::from));
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = profile.data_path.clone() {
        return Ok(path);
    }
    default_data_path()
}

pub fn default_data_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("tripsync").join("trips.json"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

/// Read the local dataset. A missing file is an empty dataset.
pub fn load_local_dataset(path: &Path) -> Result<Dataset, CliError> {
    if !path.exists() {
        return Ok(Dataset::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Dataset::from_json(&raw)?)
}

/// Replace the local dataset file without leaving a half-written file behind.
pub fn save_local_dataset(path: &Path, dataset: &Dataset) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map_or_else(|| "trips.json".into(), |name| name.to_string_lossy());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp_path, dataset.to_json_pretty()?)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Find a local trip by exact id, unique id prefix, or exact title (ignoring case).
pub fn resolve_trip<'a>(dataset: &'a Dataset, reference: &str) -> Result<&'a Trip, CliError> {
    let reference = normalize_trip_reference(reference)?;

    if let Some(trip) = dataset.trip(&reference.as_str().into()) {
        return Ok(trip);
    }

    let by_prefix = dataset
        .trips
        .values()
        .filter(|trip| trip.id.as_str().starts_with(&reference))
        .collect::<Vec<_>>();
    let candidates = if by_prefix.is_empty() {
        dataset
            .trips
            .values()
            .filter(|trip| trip.title.trim().eq_ignore_ascii_case(&reference))
            .collect::<Vec<_>>()
    } else {
        by_prefix
    };

    match candidates.as_slice() {
        [] => Err(CliError::TripNotFound(reference)),
        [trip] => Ok(*trip),
        many => {
            let options = many
                .iter()
                .take(3)
                .map(|trip| format!("{} ({})", short_id(trip.id.as_str()), trip.title))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousTripReference(format!(
                "Trip reference '{reference}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_trip_reference(reference: &str) -> Result<String, CliError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTripReference)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

#[derive(Debug, Serialize)]
pub struct TripListItem {
    pub id: String,
    pub title: String,
    pub location: String,
    pub dates: String,
    pub budget: f64,
    pub currency: String,
    pub flights: usize,
    pub itinerary_items: usize,
    pub updated_at: i64,
    pub relative_time: String,
}

pub fn trip_to_list_item(trip: &Trip) -> TripListItem {
    let now_ms = Utc::now().timestamp_millis();
    TripListItem {
        id: trip.id.to_string(),
        title: trip.title.clone(),
        location: trip.location.clone(),
        dates: trip.date_range_label(),
        budget: trip.budget,
        currency: trip.currency.clone(),
        flights: trip.flights.len(),
        itinerary_items: trip.itinerary_item_count(),
        updated_at: trip.updated_at,
        relative_time: format_relative_time(trip.updated_at, now_ms),
    }
}

pub fn format_trip_lines(dataset: &Dataset) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    dataset
        .trips
        .values()
        .map(|trip| {
            let title = truncate(&trip.title, 28);
            let dates = trip.date_range_label();
            let relative_time = format_relative_time(trip.updated_at, now_ms);
            format!(
                "{:<13}  {title:<28}  {dates:<25}  {relative_time}",
                short_id(trip.id.as_str())
            )
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[ConflictItem]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{:<13}  {:<20}  {:<10}  local={}  remote={}",
                short_id(conflict.trip_id.as_str()),
                truncate(&conflict.trip_title, 20),
                conflict.field.label(),
                conflict.local_value,
                conflict.remote_value
            )
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct VersionListItem {
    pub id: String,
    pub trip_id: String,
    pub trip_title: String,
    pub note: String,
    pub timestamp: i64,
    pub saved_at: String,
}

pub fn version_to_list_item(version: &TripVersion) -> VersionListItem {
    VersionListItem {
        id: version.id.to_string(),
        trip_id: version.trip_id.to_string(),
        trip_title: version.trip_title().to_string(),
        note: version.note.clone(),
        timestamp: version.timestamp,
        saved_at: format_sync_timestamp(version.timestamp),
    }
}

pub fn format_version_lines(versions: &[TripVersion]) -> Vec<String> {
    versions
        .iter()
        .map(|version| {
            format!(
                "{:<13}  {}  {:<20}  {}",
                short_id(&version.id.to_string()),
                format_sync_timestamp(version.timestamp),
                truncate(version.trip_title(), 20),
                version.note
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
