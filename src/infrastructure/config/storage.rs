//! Locating, creating and loading `config.toml`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::AppConfig;

const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_CONFIG_HEADER: &str = "\
# mapcache configuration.
# Command-line flags and MAPCACHE_* environment variables override these
# values; RUST_LOG overrides log_level.

";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Finds the configuration file and turns it into a validated [`AppConfig`].
#[derive(Debug)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Uses the platform configuration directory for mapcache.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigDirNotFound` if no home directory is known.
    pub fn new() -> Result<Self, ConfigError> {
        AppConfig::project_dirs()
            .map(|dirs| Self::with_dir(dirs.config_dir().to_path_buf()))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Uses `dir` as the configuration directory.
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the file `load` reads: the override if given, else
    /// `config.toml` in the configuration directory.
    #[must_use]
    pub fn config_path(&self, path_override: Option<&Path>) -> PathBuf {
        path_override.map_or_else(|| self.dir.join(CONFIG_FILE_NAME), Path::to_path_buf)
    }

    /// Loads and validates the configuration.
    ///
    /// A missing file is created with defaults. A file that does not parse is
    /// left untouched and defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or created, or if a
    /// parsed value is out of range.
    pub fn load(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = self.config_path(path_override);

        let mut config = if path.is_file() {
            let content = fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&content).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Config file does not parse, using defaults"
                );
                AppConfig::default()
            })
        } else {
            info!(path = %path.display(), "Config file not found, writing defaults");
            let config = AppConfig::default();
            write_default(&path, &config)?;
            config
        };

        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        config.config = Some(path);
        Ok(config)
    }
}

fn write_default(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let body = toml::to_string_pretty(config)?;
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(DEFAULT_CONFIG_HEADER.as_bytes())?;
    temp_file.write_all(body.as_bytes())?;
    temp_file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
