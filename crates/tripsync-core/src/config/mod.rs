//! Backup store configuration shared by every client.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Which backup store a client talks to.
///
/// Serialized with a `backend` tag, e.g.
/// `{"backend":"http","base_url":"https://backup.example.com"}`.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; nothing survives exit
    #[default]
    Memory,
    /// `SQLite` file, possibly on a shared or synced drive
    Sqlite { path: PathBuf },
    /// Hosted JSON backup service
    Http {
        base_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => formatter.write_str("Memory"),
            Self::Sqlite { path } => formatter.debug_struct("Sqlite").field("path", path).finish(),
            Self::Http { base_url, api_key } => formatter
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "[REDACTED]"))
                .finish(),
        }
    }
}

impl StoreConfig {
    /// Normalize and check the configuration before any store is opened.
    pub fn validate(self) -> Result<Self> {
        match self {
            Self::Memory => Ok(Self::Memory),
            Self::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(Error::InvalidInput(
                        "sqlite store path must not be empty".to_string(),
                    ));
                }
                Ok(Self::Sqlite { path })
            }
            Self::Http { base_url, api_key } => Ok(Self::Http {
                base_url: normalize_required_http_url(base_url, "base_url")?,
                api_key: normalize_text_option(api_key),
            }),
        }
    }

    /// Short human-readable description without secrets.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Memory => "memory (not persisted)".to_string(),
            Self::Sqlite { path } => format!("sqlite at {}", path.display()),
            Self::Http { base_url, .. } => format!("http at {base_url}"),
        }
    }
}

fn normalize_required_http_url(raw: String, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput(format!("store field '{field}' is required")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(format!(
            "store field '{field}' must include http:// or https://"
        )))
    }
}
