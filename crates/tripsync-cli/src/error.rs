use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tripsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Trip reference cannot be empty")]
    EmptyTripReference,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Trip not found for id/prefix/title: {0}")]
    TripNotFound(String),
    #[error("{0}")]
    AmbiguousTripReference(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `tripsync config init --sync-id <ID>` or `tripsync id generate`."
    )]
    SyncNotConfigured,
    #[error(
        "{0} trips have conflicting changes; nothing was written. Run `tripsync sync --resolve` to choose."
    )]
    ConflictsPending(usize),
    #[error(
        "Restoring onto trip {0} would overwrite its content; nothing was written. Confirm at the prompt or pass --yes."
    )]
    RestoreNotConfirmed(String),
}
