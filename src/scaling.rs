//! Replica access for Cluster API scalable resources
//!
//! The scalable group is addressed only by its group/version/resource
//! coordinates. Callers see [`ScalableGroupRef`] and the two-operation
//! [`ScalableResourceClient`]; the untyped object access stays in here.

use async_trait::async_trait;
use k8s_openapi::api::autoscaling::v1::{Scale, ScaleSpec};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ObjectMeta, PostParams};
use kube::{Client, ResourceExt};
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};

/// Plural resource name of Cluster API MachineDeployments
pub const MACHINE_DEPLOYMENT_RESOURCE: &str = "machinedeployments";

/// Kind of Cluster API MachineDeployments
pub const MACHINE_DEPLOYMENT_KIND: &str = "MachineDeployment";

/// Coordinates of a namespaced collection of scalable resources
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalableGroupRef {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
    pub namespace: String,
}

impl ScalableGroupRef {
    /// MachineDeployments served at `group/version` in `namespace`
    pub fn machine_deployments(
        group: impl Into<String>,
        version: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: MACHINE_DEPLOYMENT_RESOURCE.to_string(),
            kind: MACHINE_DEPLOYMENT_KIND.to_string(),
            namespace: namespace.into(),
        }
    }

    /// `group/version` string as used in `apiVersion`
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// `resource.group` form used in messages and RBAC
    pub fn group_resource(&self) -> String {
        if self.group.is_empty() {
            self.resource.clone()
        } else {
            format!("{}.{}", self.resource, self.group)
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.resource)
    }
}

/// Read and set the replica count of a named scalable resource
///
/// Both operations go to the control plane every time; the replica count is
/// shared with the autoscaler under test and may change between calls.
#[async_trait]
pub trait ScalableResourceClient: Send + Sync {
    /// Current `spec.replicas` as reported by the scale subresource
    async fn replica_count(&self, name: &str) -> Result<i32>;

    /// Set an absolute replica count; the last write wins
    async fn set_replica_count(&self, name: &str, replicas: i32) -> Result<()>;
}

/// [`ScalableResourceClient`] backed by the generic `scale` subresource
#[derive(Clone)]
pub struct DynamicScaleClient {
    client: Client,
    target: ScalableGroupRef,
    api_resource: ApiResource,
}

impl DynamicScaleClient {
    pub fn new(client: Client, target: ScalableGroupRef) -> Self {
        let api_resource = target.api_resource();
        Self {
            client,
            target,
            api_resource,
        }
    }

    pub fn target(&self) -> &ScalableGroupRef {
        &self.target
    }

    /// Fetch the parent object, returning the namespace and name its scale
    /// subresource lives under
    async fn locate(&self, name: &str) -> Result<(String, String)> {
        let api: Api<DynamicObject> = Api::namespaced_with(
            self.client.clone(),
            &self.target.namespace,
            &self.api_resource,
        );
        let obj = api.get(name).await.map_err(|e| {
            Error::api(
                format!(
                    "get {} {}/{}",
                    self.target.group_resource(),
                    self.target.namespace,
                    name
                ),
                e,
            )
        })?;

        let namespace = obj
            .namespace()
            .unwrap_or_else(|| self.target.namespace.clone());
        Ok((namespace, obj.name_any()))
    }

    fn scale_api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.api_resource)
    }
}

#[async_trait]
impl ScalableResourceClient for DynamicScaleClient {
    #[instrument(skip(self), fields(resource = %self.target.group_resource()))]
    async fn replica_count(&self, name: &str) -> Result<i32> {
        let (namespace, name) = self.locate(name).await?;

        let scale = self.scale_api(&namespace).get_scale(&name).await.map_err(|e| {
            Error::api(
                format!(
                    "get scale of {} {}/{}",
                    self.target.group_resource(),
                    namespace,
                    name
                ),
                e,
            )
        })?;

        let replicas = scale_replicas(&scale);
        debug!(namespace = %namespace, name = %name, replicas, "Read scalable group size");
        Ok(replicas)
    }

    #[instrument(skip(self), fields(resource = %self.target.group_resource()))]
    async fn set_replica_count(&self, name: &str, replicas: i32) -> Result<()> {
        let (namespace, name) = self.locate(name).await?;

        let body = serde_json::to_vec(&scale_request(&namespace, &name, replicas))?;
        self.scale_api(&namespace)
            .replace_scale(&name, &PostParams::default(), body)
            .await
            .map_err(|e| {
                Error::api(
                    format!(
                        "update scale of {} {}/{} to {}",
                        self.target.group_resource(),
                        namespace,
                        name,
                        replicas
                    ),
                    e,
                )
            })?;

        info!(namespace = %namespace, name = %name, replicas, "Resized scalable group");
        Ok(())
    }
}

/// Replica count from a Scale; an unset count reads as zero
pub fn scale_replicas(scale: &Scale) -> i32 {
    scale
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0)
}

/// Scale update body with an absolute target and no resourceVersion
pub fn scale_request(namespace: &str, name: &str, replicas: i32) -> Scale {
    Scale {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ScaleSpec {
            replicas: Some(replicas),
        }),
        status: None,
    }
}
