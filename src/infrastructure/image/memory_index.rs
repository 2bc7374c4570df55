//! In-memory fast path in front of the asset store.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::trace;

use crate::domain::entities::CacheKey;

/// Concurrent map from cache key to stored file path.
///
/// Populated lazily: a missing entry says nothing about the disk. Entries are
/// never removed since the cache does not evict.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<CacheKey, PathBuf>>,
}

impl MemoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored path for `key`.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.entries.read().get(key).cloned();
        trace!(key = %key, hit = path.is_some(), "Memory index lookup");
        path
    }

    /// Records the stored path for `key`.
    pub fn insert(&self, key: CacheKey, path: PathBuf) {
        self.entries.write().insert(key, path);
    }

    /// Number of indexed assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
