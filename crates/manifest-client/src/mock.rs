//! Mock ManifestFetcher for unit testing
//!
//! Serves canned manifests from memory and records every requested URL.

use crate::error::FetchError;
use crate::fetcher_trait::ManifestFetcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock ManifestFetcher for testing
///
/// URLs without a registered manifest answer as a 404.
#[derive(Debug, Clone, Default)]
pub struct MockManifestFetcher {
    manifests: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockManifestFetcher {
    /// Create a new mock fetcher with no manifests
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the manifest served at `url` (for test setup)
    pub fn add_manifest(&self, url: impl Into<String>, manifest: impl Into<String>) {
        self.manifests
            .lock()
            .unwrap()
            .insert(url.into(), manifest.into());
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ManifestFetcher for MockManifestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.manifests
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
