//! Rancher import manifest client
//!
//! Downloads the agent registration manifest that Rancher publishes in a
//! `ClusterRegistrationToken` status.
//!
//! # Example
//!
//! ```no_run
//! use manifest_client::{ClientOptions, ManifestClient, ManifestFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ManifestClient::new(ClientOptions {
//!     insecure_skip_verify: false,
//!     timeout: None,
//! })?;
//!
//! let manifest = client
//!     .fetch("https://rancher.example.com/v3/import/token_c-m-abc123.yaml")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod fetcher_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{ClientOptions, ManifestClient};
pub use error::FetchError;
pub use fetcher_trait::ManifestFetcher;
#[cfg(feature = "test-util")]
pub use mock::MockManifestFetcher;
