use std::io::{self, IsTerminal, Write};

use serde::Serialize;
use tripsync_core::{
    ConflictItem, Dataset, PendingResolution, RemoteStore, ResolutionMap, Side, SyncEngine,
    SyncOutcome, TripId,
};

use crate::commands::common::{
    format_conflict_lines, format_sync_timestamp, resolve_trip, truncate, Session,
};
use crate::error::CliError;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub resolve: bool,
    pub use_remote: Vec<String>,
    pub as_json: bool,
}

impl SyncOptions {
    fn resolves_conflicts(&self) -> bool {
        self.resolve || !self.use_remote.is_empty()
    }
}

/// How a sync command ended
#[derive(Debug)]
pub enum SyncReport {
    Merged {
        dataset: Dataset,
        conflicts: Vec<ConflictItem>,
        resolutions: ResolutionMap,
    },
    Unresolved {
        conflicts: Vec<ConflictItem>,
    },
}

#[derive(Debug, Serialize)]
struct SyncSummaryItem<'a> {
    sync_id: String,
    status: &'static str,
    trips: usize,
    conflicts: &'a [ConflictItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    resolutions: Option<&'a ResolutionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    synced_at: Option<String>,
}

pub async fn run_sync(session: &Session, options: &SyncOptions) -> Result<(), CliError> {
    let sync_id = session.require_sync_id()?;
    let engine = SyncEngine::new(session.open_store()?, sync_id);
    let local = session.load_dataset()?;
    let interactive = !options.as_json && io::stdin().is_terminal();

    let report = sync_with_engine(&engine, &local, options, |pending, trip_id| {
        if interactive {
            prompt_side(pending, trip_id)
        } else {
            Ok(Side::Local)
        }
    })
    .await?;
    session.log_usage();

    match report {
        SyncReport::Merged {
            dataset,
            conflicts,
            resolutions,
        } => {
            session.save_dataset(&dataset)?;
            if options.as_json {
                let summary = SyncSummaryItem {
                    sync_id: engine.sync_id().to_string(),
                    status: "merged",
                    trips: dataset.trips.len(),
                    conflicts: &conflicts,
                    resolutions: Some(&resolutions),
                    synced_at: dataset.synced_at.map(format_sync_timestamp),
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let took_remote = resolutions
                    .iter()
                    .filter(|(_, side)| *side == Side::Remote)
                    .count();
                println!(
                    "Sync completed: {} trips, {} conflicting trips ({} took remote)",
                    dataset.trips.len(),
                    resolutions.len(),
                    took_remote
                );
            }
            Ok(())
        }
        SyncReport::Unresolved { conflicts } => {
            let trip_count = conflicts
                .iter()
                .map(|conflict| &conflict.trip_id)
                .collect::<std::collections::BTreeSet<_>>()
                .len();
            if options.as_json {
                let summary = SyncSummaryItem {
                    sync_id: engine.sync_id().to_string(),
                    status: "conflicts",
                    trips: local.trips.len(),
                    conflicts: &conflicts,
                    resolutions: None,
                    synced_at: None,
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for line in format_conflict_lines(&conflicts) {
                    println!("{line}");
                }
            }
            Err(CliError::ConflictsPending(trip_count))
        }
    }
}

/// Run one sync session, asking `choose` for every conflicting trip that
/// `--use-remote` did not already decide.
///
/// Without `--resolve` or `--use-remote` the session is cancelled after the
/// conflicts are collected, so nothing is written.
pub async fn sync_with_engine<S, F>(
    engine: &SyncEngine<S>,
    local: &Dataset,
    options: &SyncOptions,
    mut choose: F,
) -> Result<SyncReport, CliError>
where
    S: RemoteStore,
    F: FnMut(&PendingResolution, &TripId) -> Result<Side, CliError>,
{
    let mut pending = match engine.request_sync(local).await? {
        SyncOutcome::NoConflicts(dataset) => {
            return Ok(SyncReport::Merged {
                dataset,
                conflicts: Vec::new(),
                resolutions: ResolutionMap::new(),
            });
        }
        SyncOutcome::ConflictsFound(pending) => pending,
    };
    let conflicts = pending.conflicts().to_vec();

    if !options.resolves_conflicts() {
        pending.cancel();
        return Ok(SyncReport::Unresolved { conflicts });
    }

    let mut preset = Vec::with_capacity(options.use_remote.len());
    for reference in &options.use_remote {
        let trip_id = resolve_trip(local, reference)?.id.clone();
        pending.choose(&trip_id, Side::Remote)?;
        preset.push(trip_id);
    }

    for trip_id in pending.conflicting_trip_ids() {
        if preset.contains(&trip_id) {
            continue;
        }
        let side = choose(&pending, &trip_id)?;
        pending.choose(&trip_id, side)?;
    }

    let resolutions = pending.resolutions().clone();
    let dataset = engine.confirm(pending).await?;
    Ok(SyncReport::Merged {
        dataset,
        conflicts,
        resolutions,
    })
}

fn prompt_side(pending: &PendingResolution, trip_id: &TripId) -> Result<Side, CliError> {
    let grouped = pending.conflicts_by_trip();
    let conflicts = grouped.get(trip_id).map(Vec::as_slice).unwrap_or_default();
    let title = conflicts
        .first()
        .map_or_else(|| trip_id.to_string(), |conflict| conflict.trip_title.clone());

    println!();
    println!("{} ({trip_id})", truncate(&title, 40));
    for conflict in conflicts {
        println!(
            "  {:<10} local: {}  |  remote: {}",
            conflict.field.label(),
            conflict.local_value,
            conflict.remote_value
        );
    }

    let stdin = io::stdin();
    loop {
        print!("Keep [l]ocal or use [r]emote? [l] ");
        io::stdout().flush()?;
        let mut answer = String::new();
        if stdin.read_line(&mut answer)? == 0 {
            return Ok(Side::Local);
        }
        match parse_side_answer(&answer) {
            Some(side) => return Ok(side),
            None => println!("Please answer 'l' or 'r'."),
        }
    }
}

/// Empty input keeps the local copy
pub fn parse_side_answer(answer: &str) -> Option<Side> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "l" | "local" => Some(Side::Local),
        "r" | "remote" => Some(Side::Remote),
        _ => None,
    }
}
