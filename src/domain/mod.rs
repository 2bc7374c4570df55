//! Domain layer with core business entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, CachedAsset, ImageRole, MapEntry};
pub use errors::{CacheError, CacheResult};
pub use ports::{AssetFetcher, CatalogPort, FetchedAsset};
