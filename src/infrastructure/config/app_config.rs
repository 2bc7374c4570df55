//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::args::CliArgs;
use super::storage::ConfigError;
use crate::infrastructure::catalog::DEFAULT_CATALOG_URL;
use crate::infrastructure::image::ImageCacheConfig;

const APP_NAME: &str = "mapcache";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache root. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Upstream catalog endpoint.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// HTTP client configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Image cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Image cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Background download workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Prewarm queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Seconds a prewarm waits for its downloads.
    #[serde(default = "default_prewarm_timeout_secs")]
    pub prewarm_timeout_secs: u64,

    /// Prewarm the cache when the process starts.
    #[serde(default = "default_true")]
    pub prewarm_on_startup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            prewarm_timeout_secs: default_prewarm_timeout_secs(),
            prewarm_on_startup: true,
        }
    }
}

impl CacheConfig {
    /// Converts to the cache's runtime configuration.
    #[must_use]
    pub const fn to_image_cache_config(&self) -> ImageCacheConfig {
        ImageCacheConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            prewarm_timeout: Duration::from_secs(self.prewarm_timeout_secs),
        }
    }
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

fn default_workers() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    10
}

fn default_prewarm_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(catalog_url) = &args.catalog_url {
            self.catalog_url.clone_from(catalog_url);
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.http.timeout_secs = timeout_secs;
        }
        if let Some(workers) = args.workers {
            self.cache.workers = workers;
        }
        if let Some(prewarm_timeout_secs) = args.prewarm_timeout_secs {
            self.cache.prewarm_timeout_secs = prewarm_timeout_secs;
        }
        if args.no_prewarm {
            self.cache.prewarm_on_startup = false;
        }
    }

    pub(crate) fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
    }

    /// Checks values that would leave the cache unable to work.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.workers == 0 {
            return Err(ConfigError::invalid("cache.workers", "must be at least 1"));
        }
        if self.cache.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "cache.queue_capacity",
                "must be at least 1",
            ));
        }
        if self.cache.prewarm_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "cache.prewarm_timeout_secs",
                "must be at least 1",
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::invalid("http.timeout_secs", "must be at least 1"));
        }
        if let Err(e) = reqwest::Url::parse(&self.catalog_url) {
            return Err(ConfigError::invalid("catalog_url", e.to_string()));
        }
        Ok(())
    }

    /// Returns default cache directory, falling back to the temp dir.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        Self::project_dirs().map_or_else(
            || std::env::temp_dir().join(APP_NAME).join("images"),
            |dirs| dirs.cache_dir().join("images"),
        )
    }

    /// Returns effective cache directory.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(Self::default_cache_dir)
    }

    /// Returns the HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            cache_dir: None,
            catalog_url: default_catalog_url(),
            http: HttpConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}
