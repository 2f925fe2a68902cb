//! Configuration management for airdesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "airdesk";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AIRDESK_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/airdesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Where the three tables live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the table files.
    /// Defaults to `~/.local/share/airdesk`
    pub data_dir: Option<PathBuf>,
    /// File name of the users table.
    pub users_file: String,
    /// File name of the flights table.
    pub flights_file: String,
    /// File name of the reservations table.
    pub reservations_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            users_file: "users.csv".to_string(),
            flights_file: "flights.csv".to_string(),
            reservations_file: "reservations.csv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing config file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("AIRDESK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a table file name is empty, contains a path
    /// separator, or is shared by two tables.
    pub fn validate(&self) -> Result<()> {
        let files = [
            ("users_file", &self.storage.users_file),
            ("flights_file", &self.storage.flights_file),
            ("reservations_file", &self.storage.reservations_file),
        ];

        for (key, name) in files {
            if name.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{key} must not be empty"),
                });
            }
            if name.contains('/') || name.contains('\\') || matches!(name.trim(), "." | "..") {
                return Err(Error::ConfigValidation {
                    message: format!("{key} must be a file name, not a path: {name}"),
                });
            }
        }

        for (i, (key, name)) in files.iter().enumerate() {
            if let Some((other, _)) = files[i + 1..].iter().find(|(_, n)| n == name) {
                return Err(Error::ConfigValidation {
                    message: format!("{key} and {other} both use {name}"),
                });
            }
        }

        Ok(())
    }

    /// Get the data directory, resolving the default if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Path of the users table.
    #[must_use]
    pub fn users_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.users_file)
    }

    /// Path of the flights table.
    #[must_use]
    pub fn flights_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.flights_file)
    }

    /// Path of the reservations table.
    #[must_use]
    pub fn reservations_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.reservations_file)
    }
}
