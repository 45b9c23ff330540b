//! Cluster API backed provider
//!
//! Node groups are MachineDeployments on a Cluster API management cluster,
//! which may be the workload cluster itself. The autoscaler under test runs
//! on the management cluster in an ephemeral namespace and reaches the
//! workload cluster through a mounted kubeconfig.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::api::{Api, PostParams};
use kube::config::Kubeconfig;
use kube::{Client, ResourceExt};
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::discovery::resolve_preferred_version;
use crate::error::{Error, Result};
use crate::framework::{Framework, client_from_path};
use crate::grant::ClusterGrant;
use crate::namespace::EphemeralNamespace;
use crate::provider::AutoscalingProvider;
use crate::resources::common::AUTOSCALER_NAME;
use crate::resources::{autoscaler, rbac, secret};
use crate::scaling::{DynamicScaleClient, ScalableGroupRef, ScalableResourceClient};
use crate::wait::wait_for_deployment_complete;

/// Prefix of the per-test namespace the autoscaler runs in
pub const AUTOSCALER_NAMESPACE_PREFIX: &str = AUTOSCALER_NAME;

/// State created by `before_each` and valid until `after_each`
struct Session {
    target: ScalableGroupRef,
    scaler: Box<dyn ScalableResourceClient>,
    namespace: EphemeralNamespace,
    workload_kubeconfig: Kubeconfig,
}

/// Provider for node groups backed by Cluster API MachineDeployments
pub struct CapiProvider {
    config: ProviderConfig,
    /// Connection to the management cluster, kept after `after_each` so a
    /// grant that failed to release can still be released later
    management: Option<Client>,
    session: Option<Session>,
    grant: ClusterGrant,
}

impl CapiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            management: None,
            session: None,
            grant: ClusterGrant::new(),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Name of the current test namespace, once `before_each` has run
    pub fn namespace(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.namespace.name())
    }

    /// Resolved MachineDeployment coordinates, once `before_each` has run
    pub fn target(&self) -> Option<&ScalableGroupRef> {
        self.session.as_ref().map(|s| &s.target)
    }

    /// Cluster-scoped objects currently awaiting teardown
    pub fn grant(&self) -> &ClusterGrant {
        &self.grant
    }

    fn session(&self, operation: &'static str) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or(Error::NotInitialized(operation))
    }

    fn management(&self, operation: &'static str) -> Result<Client> {
        self.management
            .clone()
            .ok_or(Error::NotInitialized(operation))
    }

    async fn management_client(&self, framework: &Framework) -> Result<Client> {
        match &self.config.management_kubeconfig {
            Some(path) => {
                info!(path = %path.display(), "Using management cluster kubeconfig");
                client_from_path(path).await
            }
            None => {
                info!("No management kubeconfig provided, assuming a self-managed cluster");
                Ok(framework.client.clone())
            }
        }
    }

    /// Create the credential secret, identity and grant the autoscaler runs with
    async fn provision_identity(&mut self, namespace: &str) -> Result<()> {
        let session = self.session("enable_autoscaler")?;
        let client = self.management("enable_autoscaler")?;

        let secret = secret::generate_kubeconfig_secret(namespace, &session.workload_kubeconfig)?;
        let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
        secrets
            .create(&PostParams::default(), &secret)
            .await
            .map_err(|e| {
                Error::api(format!("create secret {}/{}", namespace, AUTOSCALER_NAME), e)
            })?;
        debug!("Created kubeconfig secret {}/{}", namespace, AUTOSCALER_NAME);

        let service_accounts: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
        service_accounts
            .create(
                &PostParams::default(),
                &rbac::generate_service_account(namespace),
            )
            .await
            .map_err(|e| {
                Error::api(
                    format!("create serviceaccount {}/{}", namespace, AUTOSCALER_NAME),
                    e,
                )
            })?;
        debug!("Created service account {}/{}", namespace, AUTOSCALER_NAME);

        let cluster_roles: Api<ClusterRole> = Api::all(client.clone());
        let role = cluster_roles
            .create(&PostParams::default(), &rbac::generate_cluster_role())
            .await
            .map_err(|e| Error::api("create clusterrole", e))?;
        let role_name = role.name_any();
        self.grant.record_role(role_name.clone());
        info!(name = %role_name, "Created cluster role");

        let bindings: Api<ClusterRoleBinding> = Api::all(client);
        let binding = bindings
            .create(
                &PostParams::default(),
                &rbac::generate_cluster_role_binding(&role_name, namespace),
            )
            .await
            .map_err(|e| Error::api(format!("create clusterrolebinding for {}", role_name), e))?;
        let binding_name = binding.name_any();
        self.grant.record_binding(binding_name.clone());
        info!(name = %binding_name, role = %role_name, "Created cluster role binding");

        Ok(())
    }
}

impl CapiProvider {
    /// Release any leftover grant, then delete the session's namespace
    async fn end_session(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            debug!("No test session to tear down");
            return Ok(());
        };

        let mut first_error = None;
        if !self.grant.is_empty() {
            warn!("Cluster-scoped grant still present at teardown, releasing it");
            let management = self.management("after_each")?;
            if let Err(e) = self.grant.release(&management).await {
                first_error = Some(e);
            }
        }

        info!("Deleting namespace {}", session.namespace.name());
        if let Err(e) = session.namespace.cleanup().await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Reject node group bounds the autoscaler could never satisfy
pub fn validate_bounds(min_size: i32, max_size: i32) -> Result<()> {
    if min_size < 0 {
        return Err(Error::InvalidConfig(format!(
            "minimum node group size {} is negative",
            min_size
        )));
    }
    if max_size < min_size {
        return Err(Error::InvalidConfig(format!(
            "maximum node group size {} is below minimum {}",
            max_size, min_size
        )));
    }
    Ok(())
}

#[async_trait]
impl AutoscalingProvider for CapiProvider {
    #[instrument(skip(self, framework), fields(group = %self.config.capi_group))]
    async fn before_each(&mut self, framework: &Framework) -> Result<()> {
        if self.session.is_some() {
            warn!("Previous test session was not torn down, tearing it down now");
            self.end_session().await?;
        }

        let management = self.management_client(framework).await?;

        let version = resolve_preferred_version(&management, &self.config.capi_group).await?;
        info!(
            "Using version {:?} for API group {:?}",
            version, self.config.capi_group
        );

        let target = ScalableGroupRef::machine_deployments(
            &self.config.capi_group,
            version,
            &self.config.management_namespace,
        );
        let scaler = DynamicScaleClient::new(management.clone(), target.clone());

        let namespace =
            EphemeralNamespace::create(management.clone(), AUTOSCALER_NAMESPACE_PREFIX).await?;

        self.management = Some(management);
        self.session = Some(Session {
            target,
            scaler: Box::new(scaler),
            namespace,
            workload_kubeconfig: framework.kubeconfig.clone(),
        });
        Ok(())
    }

    #[instrument(skip(self, _framework))]
    async fn after_each(&mut self, _framework: &Framework) -> Result<()> {
        self.end_session().await
    }

    async fn resize_group(&self, group: &str, size: i32) -> Result<()> {
        self.session("resize_group")?
            .scaler
            .set_replica_count(group, size)
            .await
    }

    async fn group_size(&self, group: &str) -> Result<i32> {
        self.session("group_size")?.scaler.replica_count(group).await
    }

    #[instrument(skip(self))]
    async fn enable_autoscaler(
        &mut self,
        group: &str,
        min_size: i32,
        max_size: i32,
    ) -> Result<()> {
        validate_bounds(min_size, max_size)?;
        info!(
            min_size,
            max_size,
            "Node group bounds are not passed to the autoscaler; \
             they must be configured on the MachineDeployment"
        );

        let namespace = self
            .session("enable_autoscaler")?
            .namespace
            .name()
            .to_string();
        let management = self.management("enable_autoscaler")?;

        self.provision_identity(&namespace).await?;

        let deployment =
            autoscaler::generate_autoscaler_deployment(&namespace, &self.config.autoscaler_image);
        let deployments: Api<Deployment> = Api::namespaced(management, &namespace);
        deployments
            .create(&PostParams::default(), &deployment)
            .await
            .map_err(|e| {
                Error::api(
                    format!("create deployment {}/{}", namespace, AUTOSCALER_NAME),
                    e,
                )
            })?;
        info!(
            image = %self.config.autoscaler_image,
            "Created autoscaler deployment {}/{}", namespace, AUTOSCALER_NAME
        );

        wait_for_deployment_complete(
            &deployments,
            &namespace,
            AUTOSCALER_NAME,
            self.config.readiness_timeout,
            self.config.poll_interval,
        )
        .await?;
        info!("Autoscaler deployment {}/{} is available", namespace, AUTOSCALER_NAME);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn disable_autoscaler(&mut self, group: &str) -> Result<()> {
        if self.grant.is_empty() {
            debug!("Autoscaler grant was never created, nothing to disable");
            return Ok(());
        }
        let management = self.management("disable_autoscaler")?;
        self.grant.release(&management).await
    }
}
