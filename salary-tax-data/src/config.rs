use std::fs;
use std::path::{Path, PathBuf};

use salary_tax_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "SALARY_TAX_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Application settings.
///
/// ```toml
/// log_level = "debug"
///
/// [database]
/// backend = "sqlite"
/// connection_string = "sqlite:salary_tax.db?mode=rwc"
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DbConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse settings from TOML text.
    pub fn from_toml(
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from `path`, falling back to the file named by
    /// [`CONFIG_ENV_VAR`], then to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        };

        match path {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Apply command-line overrides on top of the loaded settings.
    pub fn with_overrides(
        mut self,
        backend: Option<String>,
        db: Option<String>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        if let Some(db) = db {
            self.database.connection_string = db;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }
}
