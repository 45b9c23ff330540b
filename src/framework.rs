//! Handle to the workload cluster under test
//!
//! The provider needs two things from it: a client for the cluster (used
//! as the management connection when the cluster manages itself) and the
//! raw kubeconfig that is handed to the autoscaler.

use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use crate::error::Result;

/// Workload cluster connection shared with the provider's hooks
#[derive(Clone)]
pub struct Framework {
    /// Client for the workload cluster
    pub client: Client,
    /// Kubeconfig the client was built from, passed on to the autoscaler
    pub kubeconfig: Kubeconfig,
}

impl Framework {
    /// Pair an existing client with the kubeconfig describing the same cluster
    pub fn new(client: Client, kubeconfig: Kubeconfig) -> Self {
        Self { client, kubeconfig }
    }

    /// Load the workload kubeconfig from `path`, or from `KUBECONFIG` /
    /// `~/.kube/config` when no path is given
    pub async fn from_kubeconfig(path: Option<&Path>) -> Result<Self> {
        let kubeconfig = match path {
            Some(path) => Kubeconfig::read_from(path)?,
            None => Kubeconfig::read()?,
        };
        let client = client_from_kubeconfig(kubeconfig.clone()).await?;

        info!(
            context = kubeconfig.current_context.as_deref().unwrap_or("<none>"),
            "Loaded workload cluster kubeconfig"
        );
        Ok(Self { client, kubeconfig })
    }
}

/// Build a client from an in-memory kubeconfig using its current context
pub async fn client_from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(Client::try_from(config)?)
}

/// Build a client from a kubeconfig file
pub async fn client_from_path(path: &Path) -> Result<Client> {
    let kubeconfig = Kubeconfig::read_from(path)?;
    client_from_kubeconfig(kubeconfig).await
}
