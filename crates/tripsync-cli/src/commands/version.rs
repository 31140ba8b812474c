use std::io::{self, IsTerminal, Write};

use tripsync_core::{restore, Dataset, RemoteStore, RestoredTrip, TripVersion, VersionHistory};

use crate::cli::VersionCommands;
use crate::commands::common::{
    format_version_lines, normalize_search_query, resolve_trip, short_id, version_to_list_item,
    Session, VersionListItem,
};
use crate::error::CliError;

pub async fn run_version(session: &Session, command: VersionCommands) -> Result<(), CliError> {
    let history = VersionHistory::new(session.open_store()?);
    let result = match command {
        VersionCommands::Save { trip, note } => {
            run_version_save(session, &history, &trip, &note.join(" ")).await
        }
        VersionCommands::List { trip, json } => {
            run_version_list(session, &history, &trip, json).await
        }
        VersionCommands::Search { query, json } => run_version_search(&history, &query, json).await,
        VersionCommands::Restore { version, into, yes } => {
            run_version_restore(session, &history, &version, into.as_deref(), yes).await
        }
    };
    session.log_usage();
    result
}

async fn run_version_save<S: RemoteStore>(
    session: &Session,
    history: &VersionHistory<S>,
    trip_reference: &str,
    note: &str,
) -> Result<(), CliError> {
    let dataset = session.load_dataset()?;
    let trip = resolve_trip(&dataset, trip_reference)?;
    let version = history.save_version(trip, note).await?;
    println!(
        "Saved version {} of '{}': {}",
        short_id(&version.id.to_string()),
        trip.title,
        version.note
    );
    Ok(())
}

async fn run_version_list<S: RemoteStore>(
    session: &Session,
    history: &VersionHistory<S>,
    trip_reference: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let dataset = session.load_dataset()?;
    let trip = resolve_trip(&dataset, trip_reference)?;
    let versions = history.list_versions(&trip.id).await?;

    if as_json {
        let json_items = versions
            .iter()
            .map(version_to_list_item)
            .collect::<Vec<VersionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if versions.is_empty() {
        println!("No versions saved for '{}'.", trip.title);
    } else {
        for line in format_version_lines(&versions) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_version_search<S: RemoteStore>(
    history: &VersionHistory<S>,
    query: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let query = normalize_search_query(query)?;
    let versions = history.find_versions(&query).await?;

    if as_json {
        let json_items = versions
            .iter()
            .map(version_to_list_item)
            .collect::<Vec<VersionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if versions.is_empty() {
        println!("No versions match '{query}'.");
    } else {
        for line in format_version_lines(&versions) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_version_restore<S: RemoteStore>(
    session: &Session,
    history: &VersionHistory<S>,
    version_reference: &str,
    into: Option<&str>,
    assume_yes: bool,
) -> Result<(), CliError> {
    let mut dataset = session.load_dataset()?;
    let version = history.find_version(version_reference).await?;
    let restored = restore_version(
        &mut dataset,
        &version,
        into,
        assume_yes,
        confirm_cross_trip,
    )?;
    session.save_dataset(&dataset)?;

    println!(
        "Restored '{}' from version {} ({})",
        restored.trip.title,
        short_id(&version.id.to_string()),
        version.note
    );
    Ok(())
}

/// Put `version` into the local dataset.
///
/// The target is `into` when given, otherwise the trip the version was saved
/// from, which need not exist locally any more. Overwriting a different trip
/// needs `assume_yes` or a `true` answer from `confirm`.
pub fn restore_version<F>(
    dataset: &mut Dataset,
    version: &TripVersion,
    into: Option<&str>,
    assume_yes: bool,
    confirm: F,
) -> Result<RestoredTrip, CliError>
where
    F: FnOnce(&RestoredTrip) -> Result<bool, CliError>,
{
    let target_id = match into {
        Some(reference) => resolve_trip(dataset, reference)?.id.clone(),
        None => version.trip_id.clone(),
    };
    let restored = restore(version, &target_id)?;

    if restored.cross_trip && !assume_yes && !confirm(&restored)? {
        return Err(CliError::RestoreNotConfirmed(target_id.to_string()));
    }

    dataset.upsert_trip(restored.trip.clone());
    Ok(restored)
}

fn confirm_cross_trip(restored: &RestoredTrip) -> Result<bool, CliError> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    println!(
        "Version {} was saved from trip {}. Restoring it replaces everything in trip {}.",
        short_id(&restored.version_id.to_string()),
        restored.source_trip_id,
        restored.trip.id
    );
    print!("Continue? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
