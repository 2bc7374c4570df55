//! Application layer with the services that drive the cache.

/// Application services.
pub mod services;

pub use services::{Prewarmer, collect_image_urls};
