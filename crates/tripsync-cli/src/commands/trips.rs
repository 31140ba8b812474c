use std::path::Path;

use tripsync_core::Dataset;

use crate::cli::TripCommands;
use crate::commands::common::{
    format_trip_lines, load_local_dataset, trip_to_list_item, Session, TripListItem,
};
use crate::error::CliError;

pub fn run_trips(
    session: &Session,
    command: Option<TripCommands>,
    as_json: bool,
) -> Result<(), CliError> {
    match command {
        None => run_trip_list(session, as_json),
        Some(TripCommands::Import { path }) => run_trip_import(session, &path),
    }
}

fn run_trip_list(session: &Session, as_json: bool) -> Result<(), CliError> {
    let dataset = session.load_dataset()?;

    if as_json {
        let json_items = dataset
            .trips
            .values()
            .map(trip_to_list_item)
            .collect::<Vec<TripListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if dataset.is_empty() {
        println!("No trips yet. Import some with `tripsync trips import <FILE>`.");
    } else {
        for line in format_trip_lines(&dataset) {
            println!("{line}");
        }
    }

    Ok(())
}

fn run_trip_import(session: &Session, source: &Path) -> Result<(), CliError> {
    let mut dataset = session.load_dataset()?;
    let imported = load_local_dataset(source)?;
    let (added, replaced) = import_trips(&mut dataset, imported);
    session.save_dataset(&dataset)?;

    println!(
        "Imported {} trips ({added} new, {replaced} replaced) into {}",
        added + replaced,
        session.data_path.display()
    );
    Ok(())
}

/// Copy every trip of `imported` into `dataset`. Returns (added, replaced).
pub fn import_trips(dataset: &mut Dataset, imported: Dataset) -> (usize, usize) {
    let mut added = 0;
    let mut replaced = 0;
    for trip in imported.trips.into_values() {
        if dataset.upsert_trip(trip).is_some() {
            replaced += 1;
        } else {
            added += 1;
        }
    }
    (added, replaced)
}
