//! Port definition for the remote map catalog.

use async_trait::async_trait;

use crate::domain::entities::MapEntry;
use crate::domain::errors::CacheResult;

/// Port for reading the full map catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Fetches every map entry.
    ///
    /// Non-200 responses and transport failures are terminal for the call.
    async fn fetch_maps(&self) -> CacheResult<Vec<MapEntry>>;
}
