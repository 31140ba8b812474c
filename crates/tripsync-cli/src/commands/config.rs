use std::env;
use std::path::PathBuf;

use serde::Serialize;
use tripsync_core::util::normalize_text_option;
use tripsync_core::{StoreConfig, SyncId};

use crate::cli::{ConfigCommands, StoreBackend};
use crate::commands::common::Session;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Store flags given to `config init`
#[derive(Debug, Clone, Default)]
pub struct StoreArgs {
    pub backend: Option<StoreBackend>,
    pub store_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

pub fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    cli_data_path: Option<PathBuf>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            sync_id,
            backend,
            store_path,
            base_url,
            api_key,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            sync_id,
            StoreArgs {
                backend,
                store_path,
                base_url,
                api_key,
            },
            cli_data_path,
            no_activate,
        ),
        ConfigCommands::Show { json } => {
            let session = Session::load(global_profile, cli_data_path)?;
            run_config_show(&session, json)
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
pub fn run_config_init(
    profile_name: Option<&str>,
    sync_id: Option<String>,
    store_args: StoreArgs,
    data_path: Option<PathBuf>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_sync_id = normalize_text_option(sync_id)
        .or_else(|| normalize_text_option(env::var("TRIPSYNC_SYNC_ID").ok()))
        .map(|raw| SyncId::parse(&raw))
        .transpose()?;
    let merged_store = resolve_store_config(store_args, existing_profile.store.clone())?;

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(value) = merged_sync_id {
        profile.sync_id = Some(value.to_string());
    }
    if let Some(value) = merged_store {
        profile.store = Some(value);
    }
    if let Some(value) = data_path {
        profile.data_path = Some(value);
    }

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let mut missing_fields = Vec::new();
    if profile.sync_id.is_none() {
        missing_fields.push("sync_id");
    }
    if profile.store.is_none() {
        missing_fields.push("store");
    }
    if missing_fields.is_empty() {
        println!("Profile '{profile_name}' is ready. Run `tripsync sync`.");
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Build the store configuration from flags, environment and the stored profile.
///
/// Returns `None` when nothing was given and nothing was stored.
pub fn resolve_store_config(
    args: StoreArgs,
    existing: Option<StoreConfig>,
) -> Result<Option<StoreConfig>, CliError> {
    let store_path = args
        .store_path
        .or_else(|| env::var_os("TRIPSYNC_STORE_PATH").map(PathBuf::from));
    let base_url = normalize_text_option(args.base_url)
        .or_else(|| normalize_text_option(env::var("TRIPSYNC_STORE_URL").ok()));
    let api_key = normalize_text_option(args.api_key)
        .or_else(|| normalize_text_option(env::var("TRIPSYNC_API_KEY").ok()));

    let backend = args.backend.or_else(|| {
        if base_url.is_some() {
            Some(StoreBackend::Http)
        } else if store_path.is_some() {
            Some(StoreBackend::Sqlite)
        } else {
            None
        }
    });

    let config = match backend {
        None => return Ok(existing),
        Some(StoreBackend::Memory) => StoreConfig::Memory,
        Some(StoreBackend::Sqlite) => {
            let path = store_path
                .or_else(|| match existing {
                    Some(StoreConfig::Sqlite { path }) => Some(path),
                    _ => None,
                })
                .ok_or_else(|| {
                    CliError::Config("--store-path is required for the sqlite backend".to_string())
                })?;
            StoreConfig::Sqlite { path }
        }
        Some(StoreBackend::Http) => {
            let (existing_url, existing_key) = match existing {
                Some(StoreConfig::Http { base_url, api_key }) => (Some(base_url), api_key),
                _ => (None, None),
            };
            let base_url = base_url.or(existing_url).ok_or_else(|| {
                CliError::Config("--base-url is required for the http backend".to_string())
            })?;
            StoreConfig::Http {
                base_url,
                api_key: api_key.or(existing_key),
            }
        }
    };

    Ok(Some(config.validate()?))
}

#[derive(Debug, Serialize)]
struct ProfileSummary {
    profile: String,
    sync_id: Option<String>,
    store: String,
    data_path: String,
}

pub fn run_config_show(session: &Session, as_json: bool) -> Result<(), CliError> {
    let summary = ProfileSummary {
        profile: session.profile_name.clone(),
        sync_id: session.profile.sync_id.clone(),
        store: session.profile.store_config().describe(),
        data_path: session.data_path.display().to_string(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("profile    {}", summary.profile);
        println!(
            "sync id    {}",
            summary.sync_id.as_deref().unwrap_or("(not set)")
        );
        println!("store      {}", summary.store);
        println!("data path  {}", summary.data_path);
    }
    Ok(())
}
