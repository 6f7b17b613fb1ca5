//! HTTP manifest client
//!
//! Performs a single GET against the URL published by Rancher and returns the
//! body as text. No retries happen here; a failed download surfaces as an
//! error and the controller requeues.

use crate::error::FetchError;
use crate::fetcher_trait::ManifestFetcher;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Options fixed when the client is built.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Skip TLS certificate verification. Only meant for test or isolated
    /// environments where Rancher serves a self-signed certificate.
    pub insecure_skip_verify: bool,

    /// Whole-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

/// Manifest download client
#[derive(Debug, Clone)]
pub struct ManifestClient {
    client: Client,
}

impl ManifestClient {
    /// Create a new manifest client
    pub fn new(options: ClientOptions) -> Result<Self, FetchError> {
        if options.insecure_skip_verify {
            warn!("TLS certificate verification is disabled for manifest downloads");
        }

        let mut builder = Client::builder()
            .no_proxy()
            .danger_accept_invalid_certs(options.insecure_skip_verify);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Download the manifest at `url`
    ///
    /// # Returns
    /// * `Ok(String)` - The full response body
    /// * `Err(FetchError::Download)` - The request failed in transport
    /// * `Err(FetchError::Status)` - The server answered with a non-2xx status
    /// * `Err(FetchError::Read)` - The body could not be drained
    pub async fn download(&self, url: &str) -> Result<String, FetchError> {
        debug!("Downloading import manifest from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Download)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(FetchError::Read)?;
        debug!("Downloaded import manifest ({} bytes)", body.len());
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ManifestFetcher for ManifestClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.download(url).await
    }
}
