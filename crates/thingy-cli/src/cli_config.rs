//! Persistent CLI configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thingy_core::util::normalize_text_option;
use thingy_core::SyncSettings;

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("thingy").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

impl CliConfig {
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

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Sync settings from this file, with `env_api_base_url` taking precedence.
    pub fn sync_settings(&self, env_api_base_url: Option<String>) -> Result<SyncSettings, String> {
        let mut settings = SyncSettings::default();
        if let Some(url) = normalize_text_option(env_api_base_url).or_else(|| self.api_base_url.clone())
        {
            settings = settings
                .with_api_base_url(url)
                .map_err(|error| error.to_string())?;
        }
        if let Some(seconds) = self.sync_interval_secs {
            settings = settings.with_sync_interval(Duration::from_secs(seconds));
        }
        if let Some(seconds) = self.request_timeout_secs.filter(|seconds| *seconds > 0) {
            settings = settings.with_request_timeout(Duration::from_secs(seconds));
        }
        Ok(settings)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip_normalizes_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = CliConfig {
            version: 1,
            api_base_url: Some(" https://gists.example.com/api/ ".to_string()),
            sync_interval_secs: Some(30),
            request_timeout_secs: Some(15),
        };
        config.save_to_path(&path).unwrap();

        let loaded = CliConfig::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.api_base_url.as_deref(),
            Some("https://gists.example.com/api")
        );
        assert_eq!(loaded.sync_interval_secs, Some(30));
        assert_eq!(
            loaded.sync_settings(None).unwrap().request_timeout,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliConfig::load_from_path(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(loaded, CliConfig::default());
    }

    #[test]
    fn environment_url_overrides_file() {
        let config = CliConfig {
            version: 1,
            api_base_url: Some("https://from-file.example.com".to_string()),
            sync_interval_secs: Some(0),
            request_timeout_secs: None,
        };

        let settings = config
            .sync_settings(Some("http://localhost:9000/".to_string()))
            .unwrap();
        assert_eq!(settings.collection_url(), "http://localhost:9000/gists");
        assert_eq!(settings.sync_interval, Duration::from_secs(1));

        let settings = config.sync_settings(None).unwrap();
        assert_eq!(
            settings.collection_url(),
            "https://from-file.example.com/gists"
        );
    }

    #[test]
    fn invalid_url_is_reported() {
        let config = CliConfig {
            api_base_url: Some("gists.example.com".to_string()),
            ..CliConfig::default()
        };
        assert!(config.sync_settings(None).is_err());
    }
}
