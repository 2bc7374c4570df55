//! A resolved cache entry.

use std::path::{Path, PathBuf};

use super::CacheKey;

/// Where a cache lookup was satisfied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Found in the in-memory index.
    Memory,
    /// Found on disk under the cache root.
    Disk,
    /// Downloaded during this call.
    Network,
}

/// A cached asset stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    /// Key the asset is stored under.
    pub key: CacheKey,
    /// Absolute path of the stored file.
    pub path: PathBuf,
    /// Source that satisfied the lookup.
    pub origin: AssetOrigin,
}

impl CachedAsset {
    /// Creates a new cached asset record.
    #[must_use]
    pub const fn new(key: CacheKey, path: PathBuf, origin: AssetOrigin) -> Self {
        Self { key, path, origin }
    }

    /// Returns the stored file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name of the stored asset, e.g. `map_x_splash.png`.
    #[must_use]
    pub fn basename(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Returns true if the lookup required a network fetch.
    #[must_use]
    pub const fn was_downloaded(&self) -> bool {
        matches!(self.origin, AssetOrigin::Network)
    }
}
