//! Domain entity definitions.

mod cache_key;
mod cached_asset;
mod map_entry;

pub use cache_key::{CacheKey, ImageRole};
pub use cached_asset::{AssetOrigin, CachedAsset};
pub use map_entry::{LOCAL_REFERENCE_PREFIX, MapEntry, local_reference};
