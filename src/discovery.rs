//! API group version discovery
//!
//! Cluster API resources are served under different versions depending on
//! the installed release, so the version is looked up from the server's
//! group catalog instead of being hard-coded.

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroupList;
use kube::Client;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// API group used when `CAPI_GROUP` is not set
pub const DEFAULT_CAPI_GROUP: &str = "cluster.x-k8s.io";

/// Environment variable overriding the Cluster API group
pub const CAPI_GROUP_ENV_VAR: &str = "CAPI_GROUP";

/// Source of the server's API group catalog
#[async_trait]
pub trait GroupCatalog: Send + Sync {
    /// List every API group the server serves (`GET /apis`)
    async fn server_groups(&self) -> Result<APIGroupList>;
}

#[async_trait]
impl GroupCatalog for Client {
    async fn server_groups(&self) -> Result<APIGroupList> {
        self.list_api_groups()
            .await
            .map_err(|e| Error::api("list server API groups", e))
    }
}

#[async_trait]
impl GroupCatalog for APIGroupList {
    async fn server_groups(&self) -> Result<APIGroupList> {
        Ok(self.clone())
    }
}

/// Return the Cluster API group, from `CAPI_GROUP` or the default
pub fn capi_group() -> String {
    let group = group_or_default(std::env::var(CAPI_GROUP_ENV_VAR).ok());
    info!(group = %group, "Using API group");
    group
}

fn group_or_default(value: Option<String>) -> String {
    value
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| DEFAULT_CAPI_GROUP.to_string())
}

/// Find the preferred version of `group` in a catalog
///
/// Falls back to the first listed version when the server does not mark one
/// as preferred.
pub fn preferred_version(groups: &APIGroupList, group: &str) -> Result<String> {
    let entry = groups
        .groups
        .iter()
        .find(|g| g.name == group)
        .ok_or_else(|| Error::GroupNotFound(group.to_string()))?;

    entry
        .preferred_version
        .as_ref()
        .filter(|v| !v.version.is_empty())
        .or_else(|| entry.versions.first())
        .map(|v| v.version.clone())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::NoServedVersion(group.to_string()))
}

/// Query the server and return the preferred version of `group`
pub async fn resolve_preferred_version<C>(catalog: &C, group: &str) -> Result<String>
where
    C: GroupCatalog + ?Sized,
{
    let groups = catalog.server_groups().await?;
    debug!(count = groups.groups.len(), "Fetched server API groups");

    let version = preferred_version(&groups, group)?;
    info!(group = %group, version = %version, "Resolved preferred API version");
    Ok(version)
}
