//! Error types for the autoscaler provider and tester

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Error variants are named with the `Error` suffix where they wrap another
/// library's error (e.g., `KubeError`, `SerializationError`).
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// A control-plane call failed; `action` names the object and operation
    #[error("{action}: {source}")]
    Api {
        action: String,
        #[source]
        source: kube::Error,
    },

    #[error("API group {0:?} is not served by the control plane")]
    GroupNotFound(String),

    #[error("API group {0:?} does not declare any served version")]
    NoServedVersion(String),

    #[error("Timed out after {timeout:?} waiting for deployment {namespace}/{name} to complete")]
    ReadinessTimeout {
        namespace: String,
        name: String,
        timeout: Duration,
    },

    #[error("Kubeconfig error: {0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider not initialized: {0} called before before_each")]
    NotInitialized(&'static str),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Test binary {binary} exited with {status}")]
    TestFailed { binary: String, status: ExitStatus },
}

impl Error {
    /// Wrap a control-plane error with the object and operation that failed
    pub fn api(action: impl Into<String>, source: kube::Error) -> Self {
        Error::Api {
            action: action.into(),
            source,
        }
    }

    /// Check whether the underlying API call returned 404
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::KubeError(e) | Error::Api { source: e, .. } => is_kube_not_found(e),
            _ => false,
        }
    }

    /// Discovery failures abort a run before anything is provisioned
    pub fn is_discovery_error(&self) -> bool {
        matches!(self, Error::GroupNotFound(_) | Error::NoServedVersion(_))
    }

    /// The deployment was created but never became healthy
    pub fn is_readiness_timeout(&self) -> bool {
        matches!(self, Error::ReadinessTimeout { .. })
    }
}

/// Check if a kube error is an API 404
pub fn is_kube_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
