//! Cluster API provider for the cluster-autoscaler conformance suite
//!
//! The provider resolves which version of the Cluster API group the
//! management cluster serves, reads and sets MachineDeployment sizes through
//! the `scale` subresource, and deploys the autoscaler under test with its
//! own identity and permissions in an ephemeral namespace.

pub mod config;
pub mod discovery;
pub mod error;
pub mod framework;
pub mod grant;
pub mod namespace;
pub mod provider;
pub mod resources;
pub mod scaling;
pub mod tester;
pub mod wait;

pub use config::{ProviderArgs, ProviderConfig};
pub use discovery::{
    CAPI_GROUP_ENV_VAR, DEFAULT_CAPI_GROUP, GroupCatalog, capi_group, resolve_preferred_version,
};
pub use error::{Error, Result};
pub use framework::Framework;
pub use grant::{ClusterGrant, GrantObject};
pub use namespace::EphemeralNamespace;
pub use provider::{AutoscalingProvider, CapiProvider};
pub use scaling::{DynamicScaleClient, ScalableGroupRef, ScalableResourceClient};
pub use tester::{Cli, Tester};
