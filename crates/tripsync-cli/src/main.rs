//! Tripsync CLI - keep travel plans in step across devices
//!
//! Syncs a local trips file with a shared backup store and manages named
//! trip versions from the terminal.

mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::Session;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::id::run_id;
use crate::commands::sync::{run_sync, SyncOptions};
use crate::commands::trips::run_trips;
use crate::commands::version::run_version;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tripsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Sync {
            resolve,
            use_remote,
            json,
        } => {
            let session = Session::load(profile, cli.data_path)?;
            let options = SyncOptions {
                resolve,
                use_remote,
                as_json: json,
            };
            run_sync(&session, &options).await?;
        }
        Commands::Trips { command, json } => {
            let session = Session::load(profile, cli.data_path)?;
            run_trips(&session, command, json)?;
        }
        Commands::Id { command } => {
            let session = Session::load(profile, cli.data_path)?;
            run_id(&session, command).await?;
        }
        Commands::Version { command } => {
            let session = Session::load(profile, cli.data_path)?;
            run_version(&session, command).await?;
        }
        Commands::Config { command } => run_config(command, profile, cli.data_path)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
