//! Manifest client errors

use thiserror::Error;

/// Errors that can occur while downloading a manifest
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be built
    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or no response arrived
    #[error("downloading manifest: {0}")]
    Download(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("downloading manifest from {url}: unexpected status {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body could not be read to the end
    #[error("reading manifest: {0}")]
    Read(#[source] reqwest::Error),
}
