//! Cluster-scoped permission grant held by the autoscaler
//!
//! The ClusterRole and ClusterRoleBinding live outside the test namespace,
//! so namespace deletion does not remove them. Their names are assigned by
//! the server, and each is recorded only once its creation succeeded.

use std::fmt;

use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::api::{Api, DeleteParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Error, Result, is_kube_not_found};

/// Kind of a cluster-scoped object held by the grant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantObject {
    ClusterRoleBinding,
    ClusterRole,
}

impl fmt::Display for GrantObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantObject::ClusterRoleBinding => write!(f, "clusterrolebinding"),
            GrantObject::ClusterRole => write!(f, "clusterrole"),
        }
    }
}

/// Handles to the cluster-scoped objects created for the autoscaler
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterGrant {
    role: Option<String>,
    binding: Option<String>,
}

impl ClusterGrant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_role(&mut self, name: impl Into<String>) {
        self.role = Some(name.into());
    }

    pub fn record_binding(&mut self, name: impl Into<String>) {
        self.binding = Some(name.into());
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.binding.is_none()
    }

    /// Recorded objects in deletion order: the binding before the role it references
    pub fn pending(&self) -> Vec<(GrantObject, &str)> {
        [
            (GrantObject::ClusterRoleBinding, self.binding.as_deref()),
            (GrantObject::ClusterRole, self.role.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, name)| name.map(|n| (kind, n)))
        .collect()
    }

    fn forget(&mut self, kind: GrantObject) {
        match kind {
            GrantObject::ClusterRoleBinding => self.binding = None,
            GrantObject::ClusterRole => self.role = None,
        }
    }

    /// Delete every recorded object
    ///
    /// Each deletion is attempted even if an earlier one failed. Deleted (or
    /// already missing) objects are forgotten, so a second call only retries
    /// what is left. Returns the first failure.
    pub async fn release(&mut self, client: &Client) -> Result<()> {
        if self.is_empty() {
            debug!("No cluster-scoped grant recorded, nothing to release");
            return Ok(());
        }

        let pending: Vec<(GrantObject, String)> = self
            .pending()
            .into_iter()
            .map(|(kind, name)| (kind, name.to_string()))
            .collect();

        let mut first_error = None;
        for (kind, name) in pending {
            let outcome = match kind {
                GrantObject::ClusterRoleBinding => {
                    delete_cluster_scoped::<ClusterRoleBinding>(client, &name).await
                }
                GrantObject::ClusterRole => {
                    delete_cluster_scoped::<ClusterRole>(client, &name).await
                }
            };

            match outcome {
                Ok(()) => {
                    info!(kind = %kind, name = %name, "Released cluster-scoped grant object");
                    self.forget(kind);
                }
                Err(e) => {
                    first_error.get_or_insert(Error::api(format!("delete {} {}", kind, name), e));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Delete a cluster-scoped object, treating 404 as already deleted
async fn delete_cluster_scoped<K>(client: &Client, name: &str) -> Result<(), kube::Error>
where
    K: Resource<Scope = k8s_openapi::ClusterResourceScope> + Clone + DeserializeOwned + fmt::Debug,
    <K as Resource>::DynamicType: Default,
{
    let api: Api<K> = Api::all(client.clone());
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(e) if is_kube_not_found(&e) => {
            debug!(name = %name, "Object already deleted");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
