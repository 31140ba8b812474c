//! Sync identifier: the only shared credential between devices

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Shortest identifier accepted
pub const MIN_SYNC_ID_LEN: usize = 4;
/// Longest identifier accepted
pub const MAX_SYNC_ID_LEN: usize = 64;

const GENERATED_PREFIX: &str = "TRIP";

/// Validated sync identifier: uppercase ASCII letters, digits and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SyncId(String);

impl SyncId {
    /// Validate user input. Surrounding whitespace is trimmed and letters are
    /// upper-cased before the checks run.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let candidate = raw.trim().to_ascii_uppercase();
        let length = candidate.chars().count();

        if length < MIN_SYNC_ID_LEN {
            return Err(Error::IdentifierInvalid(format!(
                "'{candidate}' is shorter than {MIN_SYNC_ID_LEN} characters"
            )));
        }
        if length > MAX_SYNC_ID_LEN {
            return Err(Error::IdentifierInvalid(format!(
                "identifier is longer than {MAX_SYNC_ID_LEN} characters"
            )));
        }

        let re = Regex::new(r"^[A-Z0-9]+(?:-[A-Z0-9]+)*$")
            .map_err(|error| Error::IdentifierInvalid(error.to_string()))?;
        if !re.is_match(&candidate) {
            return Err(Error::IdentifierInvalid(format!(
                "'{candidate}' may only contain A-Z, 0-9 and single hyphens between them"
            )));
        }

        Ok(Self(candidate))
    }

    /// Fresh random identifier, e.g. `TRIP-3F9A-C01B`
    #[must_use]
    pub fn generate() -> Self {
        // The tail of a v7 UUID is random; the head is a timestamp.
        let simple = Uuid::now_v7().simple().to_string().to_ascii_uppercase();
        let tail = &simple[simple.len() - 8..];
        Self(format!("{GENERATED_PREFIX}-{}-{}", &tail[..4], &tail[4..]))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SyncId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SyncId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SyncId> for String {
    fn from(value: SyncId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_identifier_rejected() {
        let error = SyncId::parse("AB").unwrap_err();
        assert!(matches!(error, Error::IdentifierInvalid(_)));
    }

    #[test]
    fn test_identifier_is_normalized() {
        let id = SyncId::parse("  family-trips-2025 ").unwrap();
        assert_eq!(id.as_str(), "FAMILY-TRIPS-2025");
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert!(SyncId::parse("TRIP_2025").is_err());
        assert!(SyncId::parse("TRIP--2025").is_err());
        assert!(SyncId::parse("-TRIP").is_err());
        assert!(SyncId::parse("TRIP 2025").is_err());
    }

    #[test]
    fn test_too_long_identifier_rejected() {
        assert!(SyncId::parse(&"A".repeat(MAX_SYNC_ID_LEN + 1)).is_err());
        assert!(SyncId::parse(&"A".repeat(MAX_SYNC_ID_LEN)).is_ok());
    }

    #[test]
    fn test_generated_identifier_is_valid() {
        let generated = SyncId::generate();
        assert!(generated.as_str().starts_with("TRIP-"));
        assert_eq!(SyncId::parse(generated.as_str()).unwrap(), generated);
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<SyncId>(r#""AB""#).is_err());
        let id: SyncId = serde_json::from_str(r#""abcd-1""#).unwrap();
        assert_eq!(id.as_str(), "ABCD-1");
    }
}
