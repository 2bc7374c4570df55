use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "mapcache",
    version,
    about = "Map catalog proxy with a local cache of catalog images",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", env = "MAPCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", env = "MAPCACHE_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, env = "MAPCACHE_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Cache root directory.
    #[arg(long, value_name = "DIR", env = "MAPCACHE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Upstream catalog endpoint.
    #[arg(long, value_name = "URL", env = "MAPCACHE_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Number of background download workers.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seconds a prewarm waits for its downloads.
    #[arg(long, value_name = "SECS")]
    pub prewarm_timeout_secs: Option<u64>,

    /// Skip the startup prewarm.
    #[arg(long)]
    pub no_prewarm: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch the catalog and cache every image it references (default).
    Prewarm,
    /// Fetch the catalog, cache its images and print it with local references.
    Rewrite,
    /// Cache a single asset and print its stored path.
    Fetch {
        /// Remote asset URL.
        url: String,
        /// Cache key to store it under.
        key: String,
    },
}
