//! Mapcache - a map catalog proxy with a local image cache.
//!
//! This crate fetches the upstream map catalog, downloads every image it
//! references into a two-tier (memory and disk) cache through a bounded
//! background worker pool, and rewrites catalog entries to point at the
//! cached copies.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the prewarm service.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "mapcache";
