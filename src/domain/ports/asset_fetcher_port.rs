//! Port definition for fetching remote assets.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Body and declared content type of a fetched asset.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    /// Raw response body.
    pub bytes: Bytes,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
}

impl FetchedAsset {
    /// Creates a fetched asset.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }
}

/// Port for single-shot remote fetches.
///
/// Implementations perform exactly one attempt per call.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches the asset at `url`.
    async fn fetch(&self, url: &str) -> CacheResult<FetchedAsset>;
}
