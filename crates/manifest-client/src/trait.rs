//! ManifestFetcher trait for mocking
//!
//! The reconciler only depends on this trait, so unit tests can swap in
//! `MockManifestFetcher` instead of serving HTTP.

use crate::error::FetchError;

/// Retrieves a registration manifest by URL.
#[async_trait::async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetch the manifest at `url` and return the full body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
