//! Fetch-and-store of a single remote asset.

use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::{AssetOrigin, CacheKey, CachedAsset};
use crate::domain::errors::CacheResult;
use crate::domain::ports::AssetFetcher;

use super::asset_store::AssetStore;
use super::extension;

/// Downloads one asset and writes it to the store under `<key><ext>`.
///
/// No retries: a failed fetch is terminal for the call.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn AssetFetcher>,
    store: Arc<AssetStore>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader writing into `store`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn AssetFetcher>, store: Arc<AssetStore>) -> Self {
        Self { fetcher, store }
    }

    /// Fetches `url` and stores it under `key`.
    ///
    /// # Errors
    /// Returns `RequestFailed`/`BadStatus` from the fetch, or `Io` if the
    /// bytes cannot be written.
    pub async fn download(&self, url: &str, key: &CacheKey) -> CacheResult<CachedAsset> {
        let asset = self.fetcher.fetch(url).await?;
        let ext = extension::resolve(url, asset.content_type.as_deref());

        let path = self.store.write(key, &ext, &asset.bytes).await?;

        debug!(
            key = %key,
            content_type = asset.content_type.as_deref().unwrap_or("-"),
            extension = %ext,
            "Downloaded asset"
        );

        Ok(CachedAsset::new(key.clone(), path, AssetOrigin::Network))
    }
}
