//! TOML-based application configuration.
//!
//! Holds the default owner used by the CLI and the cadence defaults applied
//! to owners who have not saved their own settings.
//!
//! Stored at `~/.config/pomotrack/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::cadence::CadenceConfig;
use crate::error::{ConfigError, Result};

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pomotrack/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Owner used when a request does not name one.
    #[serde(default = "default_owner")]
    pub default_owner: String,
    /// Cadence defaults for owners without saved settings.
    #[serde(default)]
    pub cadence: CadenceConfig,
}

fn default_owner() -> String {
    "local".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_owner: default_owner(),
            cadence: CadenceConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the config file, falling back to defaults if it doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.cadence.validate()?;
        Ok(config)
    }

    /// Save the config file. Rejects cadence values out of bounds.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        self.cadence.validate()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.default_owner, "local");
        assert!(config.cadence.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str("[cadence]\nwork_minutes = 50\n").unwrap();
        assert_eq!(config.cadence.work_minutes, 50);
        assert_eq!(config.cadence.short_break_minutes, 5);
        assert_eq!(config.default_owner, "local");
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = Config::default();
        config.default_owner = "mina".to_string();
        config.cadence.pomodoros_until_long_break = 3;
        let raw = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&raw).unwrap();
        assert_eq!(back.default_owner, "mina");
        assert_eq!(back.cadence.pomodoros_until_long_break, 3);
    }

    #[test]
    fn saves_and_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.default_owner = "sol".to_string();
        config.cadence.work_minutes = 50;
        config.save_to(&path).unwrap();

        let back = Config::load_from(&path).unwrap();
        assert_eq!(back.default_owner, "sol");
        assert_eq!(back.cadence.work_minutes, 50);
    }

    #[test]
    fn save_rejects_out_of_bounds_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.cadence.work_minutes = 0;
        assert!(config.save_to(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.default_owner, "local");
        assert_eq!(config.cadence.work_minutes, 25);
    }
}
