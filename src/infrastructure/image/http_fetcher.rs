//! reqwest-backed asset fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{AssetFetcher, FetchedAsset};

/// Builds the HTTP client shared by catalog and asset fetches.
///
/// # Errors
/// Returns `CacheError::Io` if the client cannot be created.
pub fn http_client(timeout: Duration, user_agent: &str) -> CacheResult<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| CacheError::io(format!("Failed to create HTTP client: {e}")))
}

/// Fetches assets over HTTP with a single GET per call.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    /// Wraps an existing client. The client's timeout applies to every fetch.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<FetchedAsset> {
        debug!(url = %url, "Fetching asset");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Asset request failed");
            CacheError::request_failed(url, describe_transport_error(&e))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CacheError::bad_status(url, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::request_failed(url, format!("Failed to read body: {e}")))?;

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}

/// Condenses a reqwest error into a short transport diagnostic.
pub(crate) fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("failed to connect: {e}")
    } else {
        e.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::stub_server::{StubResponse, spawn};
    use super::*;

    fn fetcher() -> HttpAssetFetcher {
        HttpAssetFetcher::new(http_client(Duration::from_secs(5), "mapcache-test").unwrap())
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_content_type() {
        let base = spawn(StubResponse::ok(Some("image/png"), b"\x89PNG".to_vec())).await;

        let asset = fetcher().fetch(&format!("{base}/splash")).await.unwrap();

        assert_eq!(&asset.bytes[..], b"\x89PNG");
        assert_eq!(asset.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_non_200_is_bad_status() {
        let base = spawn(StubResponse::status(404)).await;

        let err = fetcher().fetch(&format!("{base}/gone.png")).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_other_success_codes_are_rejected() {
        let base = spawn(StubResponse::status(204)).await;

        let err = fetcher().fetch(&format!("{base}/empty.png")).await.unwrap_err();

        assert!(matches!(err, CacheError::BadStatus { status: 204, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_failed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher()
            .fetch(&format!("http://{addr}/a.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::RequestFailed { .. }));
    }
}
