//! Remote map catalog access.

pub mod client;
pub mod dto;

pub use client::{CatalogClient, DEFAULT_CATALOG_URL};
pub use dto::CatalogEnvelope;
