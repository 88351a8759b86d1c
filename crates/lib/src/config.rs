//! Store configuration.
//!
//! [`StoreOptions`] is an explicit value handed to every constructor that needs
//! it. It can be built in code or read from a section of a JSON settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Result, constants};

/// Errors produced while loading or validating [`StoreOptions`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the settings file failed.
    #[error("Failed to access settings file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file or section is not valid JSON for the options.
    #[error("Failed to parse settings file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The settings file is JSON but not an object.
    #[error("Settings file '{path}' must contain a JSON object")]
    NotAnObject { path: PathBuf },

    /// An option has an unusable value.
    #[error("Invalid option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },
}

impl ConfigError {
    /// Check if this error is a validation failure rather than an I/O or parse failure.
    pub fn is_invalid_option(&self) -> bool {
        matches!(self, ConfigError::InvalidOption { .. })
    }
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// Options shared by the store façades and the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Logical database every session opens.
    pub database_name: String,
    /// Upper bound on create-then-reload cycles in ensure-or-create.
    pub max_ensure_attempts: usize,
    /// JSON snapshot for the in-memory store.
    pub data_file: Option<PathBuf>,
    /// Rewrite `data_file` after every commit.
    pub persist_on_commit: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            database_name: constants::DEFAULT_DATABASE_NAME.to_string(),
            max_ensure_attempts: constants::DEFAULT_MAX_ENSURE_ATTEMPTS,
            data_file: None,
            persist_on_commit: true,
        }
    }
}

impl StoreOptions {
    /// Options for `database_name` with every other field at its default.
    pub fn for_database(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            ..Self::default()
        }
    }

    /// Sets the ensure-or-create attempt bound.
    pub fn with_max_ensure_attempts(mut self, attempts: usize) -> Self {
        self.max_ensure_attempts = attempts;
        self
    }

    /// Sets the snapshot file for the in-memory store.
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    /// Rejects options no store can run with.
    pub fn validate(&self) -> Result<()> {
        if self.database_name.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "database_name".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.max_ensure_attempts == 0 {
            return Err(ConfigError::InvalidOption {
                option: "max_ensure_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Reads the options stored under `section` of a JSON settings file.
    ///
    /// Returns `Ok(None)` if the file or the section does not exist.
    pub fn from_json_file(path: impl AsRef<Path>, section: &str) -> Result<Option<Self>> {
        let path = path.as_ref();
        let Some(settings) = read_settings(path)? else {
            return Ok(None);
        };
        let Some(value) = settings.get(section) else {
            return Ok(None);
        };
        let options: StoreOptions =
            serde_json::from_value(value.clone()).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        options.validate()?;
        Ok(Some(options))
    }

    /// Reads `section` from a JSON settings file, writing defaults when it is missing.
    ///
    /// A missing file is created containing only the new section. Other
    /// sections of an existing file are preserved.
    pub fn ensure_in_json_file(path: impl AsRef<Path>, section: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(options) = Self::from_json_file(path, section)? {
            return Ok(options);
        }

        let options = Self::default();
        let mut settings = read_settings(path)?.unwrap_or_default();
        let value = serde_json::to_value(&options).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.insert(section.to_string(), value);
        let json = serde_json::to_string_pretty(&Value::Object(settings)).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), section, "Wrote default store options");
        Ok(options)
    }
}

fn read_settings(path: &Path) -> Result<Option<Map<String, Value>>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
            .into());
        }
    };
    match serde_json::from_str(&contents) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        }
        .into()),
        Err(source) => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}
