//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tripsync_core::util::normalize_text_option;
use tripsync_core::{StoreConfig, SyncId};

const CONFIG_FILE_NAME: &str = "cli-config.json";
const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub sync_id: Option<String>,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub data_path: Option<PathBuf>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("tripsync").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

fn profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(str::to_string))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    /// Write the normalized config via a sibling temp file and rename.
    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        let describe = |action: &str, error: std::io::Error| {
            format!("Failed to {action} config at {}: {error}", path.display())
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| describe("create directory for", error))?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, serialized).map_err(|error| describe("write", error))?;
        std::fs::rename(&temp_path, path).map_err(|error| describe("replace", error))
    }

    /// Explicit flag, then `TRIPSYNC_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        profile_name(explicit)
            .or_else(|| profile_name(std::env::var("TRIPSYNC_PROFILE").ok().as_deref()))
            .or_else(|| profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Parsed sync identifier, if one is configured.
    pub fn sync_id(&self) -> Result<Option<SyncId>, String> {
        normalize_text_option(self.sync_id.clone())
            .map(|raw| SyncId::parse(&raw).map_err(|error| error.to_string()))
            .transpose()
    }

    pub fn store_config(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    fn normalize(&mut self) {
        self.sync_id = normalize_text_option(self.sync_id.clone())
            .map(|raw| SyncId::parse(&raw).map_or(raw, |sync_id| sync_id.to_string()));
        self.data_path = self
            .data_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_profile_names_are_ignored() {
        assert_eq!(profile_name(None), None);
        assert_eq!(profile_name(Some(" ")), None);
        assert_eq!(profile_name(Some(" laptop ")), Some("laptop".to_string()));
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                sync_id: Some(" family-2025 ".to_string()),
                store: Some(StoreConfig::Sqlite {
                    path: PathBuf::from("/mnt/shared/tripsync.db"),
                }),
                data_path: Some(PathBuf::new()),
            },
        );

        config.save_to_path(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));

        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.sync_id.as_deref(), Some("FAMILY-2025"));
        assert_eq!(
            profile.sync_id().unwrap(),
            Some(SyncId::parse("FAMILY-2025").unwrap())
        );
        assert_eq!(
            profile.store_config(),
            StoreConfig::Sqlite {
                path: PathBuf::from("/mnt/shared/tripsync.db")
            }
        );
        assert_eq!(profile.data_path, None);
    }

    #[test]
    fn invalid_stored_sync_id_is_reported() {
        let profile = CliProfile {
            sync_id: Some("no".to_string()),
            ..CliProfile::default()
        };
        assert!(profile.sync_id().is_err());
    }

    #[test]
    fn missing_file_loads_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
        assert_eq!(CliProfile::default().store_config(), StoreConfig::Memory);
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name(Some("laptop")), "laptop");
        if std::env::var_os("TRIPSYNC_PROFILE").is_none() {
            assert_eq!(config.resolve_profile_name(None), "work");
        }
    }
}
