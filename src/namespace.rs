//! Ephemeral namespace holding everything the harness provisions

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DeleteParams, PostParams, PropagationPolicy};
use kube::core::ObjectMeta;
use kube::{Api, Client, ResourceExt};

use crate::error::{Error, Result, is_kube_not_found};

/// Label marking namespaces created by this harness
pub const NAMESPACE_LABEL: &str = "capi-autoscaler-tester/ephemeral";

/// A namespace created for one test and deleted afterwards
///
/// Deleting it cascades to every namespaced object created inside, so
/// those objects are never deleted individually.
#[derive(Clone)]
pub struct EphemeralNamespace {
    /// Server-assigned name of the namespace
    pub name: String,
    /// Kubernetes client
    client: Client,
}

impl EphemeralNamespace {
    /// Create a namespace named `{prefix}-{random}`, the suffix chosen by the server
    pub async fn create(client: Client, prefix: &str) -> Result<Self> {
        let ns = namespace_template(prefix);

        let namespaces: Api<Namespace> = Api::all(client.clone());
        let created = namespaces
            .create(&PostParams::default(), &ns)
            .await
            .map_err(|e| Error::api(format!("create namespace {}*", generate_name(prefix)), e))?;

        let name = created.name_any();
        tracing::info!("Created test namespace: {}", name);

        Ok(Self { name, client })
    }

    /// Get the namespace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initiate deletion of the namespace and everything within it
    ///
    /// Uses background propagation and does not wait for completion. A
    /// namespace that is already gone counts as deleted.
    pub async fn cleanup(&self) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());

        tracing::debug!("Initiating deletion of namespace: {}", self.name);

        let dp = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };

        match namespaces.delete(&self.name, &dp).await {
            Ok(_) => {}
            Err(e) if is_kube_not_found(&e) => {
                tracing::debug!("Namespace {} already deleted", self.name);
                return Ok(());
            }
            Err(e) => return Err(Error::api(format!("delete namespace {}", self.name), e)),
        }

        tracing::info!("Namespace {} deletion initiated", self.name);
        Ok(())
    }
}

fn generate_name(prefix: &str) -> String {
    format!("{}-", prefix)
}

/// Namespace manifest relying on server-side name generation
pub fn namespace_template(prefix: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            generate_name: Some(generate_name(prefix)),
            labels: Some(BTreeMap::from([
                (NAMESPACE_LABEL.to_string(), "true".to_string()),
                ("test-prefix".to_string(), prefix.to_string()),
            ])),
            ..Default::default()
        },
        ..Default::default()
    }
}
