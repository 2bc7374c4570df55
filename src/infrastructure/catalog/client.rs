//! Map catalog HTTP client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::dto::CatalogEnvelope;
use crate::domain::entities::MapEntry;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::CatalogPort;
use crate::infrastructure::image::http_fetcher::describe_transport_error;

/// Public maps endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://valorant-api.com/v1/maps";

/// Reads the full map catalog from the upstream API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    url: String,
}

impl CatalogClient {
    /// Creates a client reading `url` with an existing HTTP client.
    #[must_use]
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetches and decodes the whole envelope.
    ///
    /// # Errors
    /// Returns `RequestFailed` on transport errors, `BadStatus` on any
    /// non-200 response and `Decode` if the body is not a catalog envelope.
    pub async fn fetch_envelope(&self) -> CacheResult<CatalogEnvelope> {
        debug!(url = %self.url, "Fetching map catalog");

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "Catalog request failed");
            CacheError::request_failed(&self.url, describe_transport_error(&e))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CacheError::bad_status(&self.url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::request_failed(&self.url, format!("Failed to read body: {e}")))?;

        let envelope: CatalogEnvelope = serde_json::from_slice(&body).map_err(|e| {
            warn!(url = %self.url, error = %e, "Failed to parse catalog");
            CacheError::decode(e.to_string())
        })?;

        debug!(entries = envelope.data.len(), "Catalog fetched");
        Ok(envelope)
    }
}

#[async_trait]
impl CatalogPort for CatalogClient {
    async fn fetch_maps(&self) -> CacheResult<Vec<MapEntry>> {
        self.fetch_envelope().await.map(|envelope| envelope.data)
    }
}
