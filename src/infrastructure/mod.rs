//! Infrastructure layer with external service adapters.

/// Upstream map catalog client.
pub mod catalog;
/// Application configuration.
pub mod config;
/// Image caching (memory index, disk store, download workers).
pub mod image;

pub use catalog::{CatalogClient, CatalogEnvelope, DEFAULT_CATALOG_URL};
pub use config::{AppConfig, CliArgs, Command, ConfigStore, LogLevel};
pub use image::{
    AssetStore, CacheStats, HttpAssetFetcher, ImageCache, ImageCacheConfig, PrewarmReport,
    http_client,
};
