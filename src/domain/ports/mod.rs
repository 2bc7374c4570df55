mod asset_fetcher_port;
mod catalog_port;

pub use asset_fetcher_port::{AssetFetcher, FetchedAsset};
pub use catalog_port::CatalogPort;
#[cfg(test)]
pub use catalog_port::MockCatalogPort;
