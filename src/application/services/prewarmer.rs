//! Startup cache bootstrap from the full catalog.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::entities::{CacheKey, MapEntry};
use crate::domain::errors::CacheResult;
use crate::domain::ports::CatalogPort;
use crate::infrastructure::image::{ImageCache, PrewarmReport};

/// Fetches the catalog and prewarms every image it references.
#[derive(Clone)]
pub struct Prewarmer {
    catalog: Arc<dyn CatalogPort>,
    cache: Arc<ImageCache>,
}

impl Prewarmer {
    /// Creates a prewarmer over the given catalog and cache.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogPort>, cache: Arc<ImageCache>) -> Self {
        Self { catalog, cache }
    }

    /// Runs one prewarm pass.
    ///
    /// # Errors
    /// Returns the catalog error if the catalog cannot be fetched, or the
    /// prewarm error (including `Timeout`) from the cache.
    #[instrument(name = "prewarm", skip(self))]
    pub async fn run(&self) -> CacheResult<PrewarmReport> {
        let maps = self.catalog.fetch_maps().await.map_err(|e| {
            warn!(error = %e, "Failed to fetch catalog for prewarm");
            e
        })?;

        let urls = collect_image_urls(&maps);
        info!(maps = maps.len(), images = urls.len(), "Prewarming map images");

        let report = self.cache.prewarm(urls).await?;
        debug!(stats = %self.cache.stats(), "Cache state after prewarm");
        Ok(report)
    }
}

/// Builds the `key -> url` map for every non-empty image field.
#[must_use]
pub fn collect_image_urls(maps: &[MapEntry]) -> HashMap<CacheKey, String> {
    maps.iter().flat_map(MapEntry::image_keys).collect()
}
