//! Controller-specific error types.
//!
//! Upstream errors (kube, manifest download) are wrapped as-is; the rest are
//! failures of the import flow itself.

use kube::Error as KubeError;
use manifest_client::FetchError;
use thiserror::Error;

/// Errors that can occur in the import controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Import manifest download failed
    #[error("Manifest download failed: {0}")]
    Fetch(#[from] FetchError),

    /// Import manifest could not be parsed
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Creating an object on the workload cluster failed
    #[error("Failed to create {kind} {name} on workload cluster: {source}")]
    RemoteCreate {
        kind: String,
        name: String,
        #[source]
        source: KubeError,
    },

    /// Building a client for the workload cluster failed
    #[error("Workload cluster kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Serializing the patch for a CAPI cluster failed
    #[error("Failed to compute patch: {0}")]
    Patch(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object is missing fields the import flow relies on
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Metrics registry could not be built
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe server failed
    #[error("Probe server error: {0}")]
    Server(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Several errors from one reconcile (transition and patch)
    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<ControllerError>),
}

impl ControllerError {
    /// Combines errors into one. A single error is returned unwrapped.
    pub fn aggregate(mut errors: Vec<ControllerError>) -> Option<ControllerError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ControllerError::Aggregate(errors)),
        }
    }
}

fn format_aggregate(errors: &[ControllerError]) -> String {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("[{}]", messages.join(", "))
}

/// Errors raised while reading an import manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Document separator followed by unexpected content
    #[error("invalid document separator at line {line}: {content:?}")]
    Syntax { line: usize, content: String },

    /// Document is not valid YAML
    #[error("failed to parse manifest document {document}: {source}")]
    Parse {
        document: usize,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document parsed but does not describe a Kubernetes object
    #[error("invalid object in manifest document {document}: {reason}")]
    InvalidObject { document: usize, reason: String },

    /// Reading the manifest stream failed
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}
