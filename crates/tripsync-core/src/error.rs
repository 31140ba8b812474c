//! Error types for tripsync-core

use thiserror::Error;

/// Result type alias using tripsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tripsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote backup store could not be reached or failed the request
    #[error("Remote backup store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Store rejected a write made against a stale copy
    #[error("Remote backup store rejected a stale write: {0}")]
    WriteConflict(String),

    /// Sync identifier failed validation
    #[error("Invalid sync identifier: {0}")]
    IdentifierInvalid(String),

    /// A sync against the same identifier is still in flight
    #[error("A sync for {0} is already in progress")]
    SyncInProgress(String),

    /// Trip version missing or malformed
    #[error("Trip version not found: {0}")]
    VersionNotFound(String),

    /// Dataset blob could not be understood
    #[error("Unsupported dataset schema: {0}")]
    Schema(String),

    /// Local database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Collapse store-level failures into the single retryable sync failure.
    ///
    /// A stale write is retried by re-running the whole sync from the fetch,
    /// so callers only ever see `RemoteUnavailable` for it. Undecodable or
    /// too-new remote blobs keep their `Serialization`/`Schema` error.
    #[must_use]
    pub fn into_remote_failure(self) -> Self {
        match self {
            Self::WriteConflict(message) => Self::RemoteUnavailable(format!(
                "write rejected as stale ({message}); run the sync again"
            )),
            Self::Database(error) => Self::RemoteUnavailable(error.to_string()),
            Self::Io(error) => Self::RemoteUnavailable(error.to_string()),
            other => other,
        }
    }

    /// Whether re-invoking the failed operation can succeed without other changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::WriteConflict(_) | Self::SyncInProgress(_)
        )
    }
}
