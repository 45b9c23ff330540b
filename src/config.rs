//! Provider configuration
//!
//! Everything the provider needs is gathered once at startup into a
//! [`ProviderConfig`] and handed to the provider's constructor.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::discovery::capi_group;
use crate::error::{Error, Result};

/// Namespace searched for scalable resources when none is given
pub const DEFAULT_MANAGEMENT_NAMESPACE: &str = "default";

/// Upper bound for the autoscaler deployment to become available
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(300);

/// Interval between deployment readiness checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Command-line flags consumed by the provider
#[derive(Args, Clone, Debug)]
pub struct ProviderArgs {
    /// Path to kubeconfig containing embedded authinfo for the CAPI management cluster
    #[arg(long = "capi-management-kubeconfig")]
    pub management_kubeconfig: Option<PathBuf>,

    /// Namespace in which the scalable resources are located
    #[arg(long = "capi-management-namespace", default_value = DEFAULT_MANAGEMENT_NAMESPACE)]
    pub management_namespace: String,

    /// Image to be used for the cluster autoscaler
    #[arg(long = "cluster-autoscaler-image")]
    pub autoscaler_image: String,

    /// Seconds to wait for the autoscaler deployment to become available
    #[arg(long = "autoscaler-ready-timeout", default_value_t = DEFAULT_READINESS_TIMEOUT.as_secs())]
    pub readiness_timeout_secs: u64,
}

impl ProviderArgs {
    /// Build the provider configuration, resolving the API group from the environment
    pub fn into_config(self) -> Result<ProviderConfig> {
        let config = ProviderConfig {
            management_kubeconfig: self.management_kubeconfig,
            management_namespace: self.management_namespace,
            autoscaler_image: self.autoscaler_image,
            capi_group: capi_group(),
            readiness_timeout: Duration::from_secs(self.readiness_timeout_secs),
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolved provider settings, fixed for the lifetime of a run
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Explicit management cluster kubeconfig; `None` means the cluster under test manages itself
    pub management_kubeconfig: Option<PathBuf>,
    /// Namespace holding the MachineDeployments
    pub management_namespace: String,
    /// Image reference for the autoscaler under test
    pub autoscaler_image: String,
    /// API group serving the scalable resources
    pub capi_group: String,
    /// How long to wait for the autoscaler deployment to complete
    pub readiness_timeout: Duration,
    /// How often to check the deployment while waiting
    pub poll_interval: Duration,
}

impl ProviderConfig {
    /// Configuration for a self-managed cluster with default timeouts
    pub fn new(autoscaler_image: impl Into<String>, capi_group: impl Into<String>) -> Self {
        Self {
            management_kubeconfig: None,
            management_namespace: DEFAULT_MANAGEMENT_NAMESPACE.to_string(),
            autoscaler_image: autoscaler_image.into(),
            capi_group: capi_group.into(),
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_management_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.management_kubeconfig = Some(path.into());
        self
    }

    pub fn with_management_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.management_namespace = namespace.into();
        self
    }

    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reject settings the provider cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.autoscaler_image.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "cluster autoscaler image must not be empty".to_string(),
            ));
        }
        if self.management_namespace.is_empty() {
            return Err(Error::InvalidConfig(
                "management namespace must not be empty".to_string(),
            ));
        }
        if self.capi_group.is_empty() {
            return Err(Error::InvalidConfig("API group must not be empty".to_string()));
        }
        if self.readiness_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "readiness timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() || self.poll_interval > self.readiness_timeout {
            return Err(Error::InvalidConfig(format!(
                "poll interval {:?} must be non-zero and within the readiness timeout {:?}",
                self.poll_interval, self.readiness_timeout
            )));
        }
        Ok(())
    }
}
