use tripsync_core::{RemoteStore, SyncEngine, SyncId};

use crate::cli::IdCommands;
use crate::commands::common::Session;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_id(session: &Session, command: IdCommands) -> Result<(), CliError> {
    match command {
        IdCommands::Show => {
            let sync_id = session.require_sync_id()?;
            println!("{sync_id}");
            Ok(())
        }
        IdCommands::Set { id } => run_id_set(session, &id).await,
        IdCommands::Generate => {
            let sync_id = SyncId::generate();
            save_sync_id(session, &sync_id)?;
            println!("{sync_id}");
            println!("Use `tripsync id set {sync_id}` on your other devices.");
            Ok(())
        }
    }
}

async fn run_id_set(session: &Session, raw: &str) -> Result<(), CliError> {
    let target = SyncId::parse(raw)?;
    let current = session
        .profile
        .sync_id()
        .map_err(CliError::Config)?
        .unwrap_or(target);
    let mut engine = SyncEngine::new(session.open_store()?, current);

    let sync_id = switch_identifier(&mut engine, raw).await?;
    save_sync_id(session, &sync_id)?;
    println!("Sync identifier set to {sync_id}");
    Ok(())
}

/// Point `engine` at `raw`, warning when that identifier already holds data.
pub async fn switch_identifier<S: RemoteStore>(
    engine: &mut SyncEngine<S>,
    raw: &str,
) -> Result<SyncId, CliError> {
    let check = engine.inspect_identifier(raw).await?;
    if check.has_remote_data {
        println!(
            "Warning: {} already holds {} trips. They will be merged with your local trips on the next sync.",
            check.sync_id, check.remote_trip_count
        );
    }
    engine.set_identifier(check.sync_id.clone());
    Ok(check.sync_id)
}

fn save_sync_id(session: &Session, sync_id: &SyncId) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    config.profile_mut_or_default(&session.profile_name).sync_id = Some(sync_id.to_string());
    let path = config.save().map_err(CliError::Config)?;
    tracing::debug!("Saved sync identifier to {}", path.display());
    Ok(())
}
