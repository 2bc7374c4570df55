//! Image cache infrastructure.
//!
//! This module provides:
//! - Filesystem asset storage under a single root
//! - An in-memory key index in front of the filesystem
//! - HTTP fetching with extension resolution
//! - A bounded download worker pool for bulk prewarming
//! - The `ImageCache` orchestrator tying them together

pub mod asset_store;
pub mod downloader;
pub mod extension;
pub mod http_fetcher;
pub mod image_cache;
pub mod memory_index;
pub mod worker_pool;

pub use asset_store::AssetStore;
pub use downloader::Downloader;
pub use http_fetcher::{HttpAssetFetcher, http_client};
pub use image_cache::{CacheStats, ImageCache, ImageCacheConfig, PrewarmReport};
pub use memory_index::MemoryIndex;
pub use worker_pool::{
    Batch, DownloadHandler, DownloadTask, Submitter, WorkerPool, WorkerPoolConfig,
};
