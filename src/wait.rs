//! Readiness waiting for the autoscaler deployment

use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube::runtime::wait::Condition;
use tracing::debug;

use crate::error::{Error, Result};

/// Condition that holds once a Deployment has fully rolled out
///
/// The controller must have observed the current generation, and the
/// updated, total and available replica counts must all equal the desired
/// count.
pub fn deployment_complete() -> impl Condition<Deployment> {
    |obj: Option<&Deployment>| obj.map(is_deployment_complete).unwrap_or(false)
}

pub fn is_deployment_complete(deployment: &Deployment) -> bool {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);

    let Some(status) = deployment.status.as_ref() else {
        return false;
    };

    let generation_observed = match (deployment.metadata.generation, status.observed_generation) {
        (Some(generation), Some(observed)) => observed >= generation,
        (None, _) => true,
        (Some(_), None) => false,
    };

    generation_observed
        && status.updated_replicas.unwrap_or(0) == desired
        && status.replicas.unwrap_or(0) == desired
        && status.available_replicas.unwrap_or(0) == desired
}

/// Poll a Deployment until it is complete or `timeout` elapses
///
/// The deadline covers the API calls as well as the sleeps between them. A
/// missing deployment keeps the poll going; any other API error ends it.
pub async fn wait_for_deployment_complete(
    api: &Api<Deployment>,
    namespace: &str,
    name: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Deployment> {
    let condition = deployment_complete();

    let poll = async {
        loop {
            match api.get_opt(name).await {
                Ok(Some(deployment)) if condition.matches_object(Some(&deployment)) => {
                    return Ok(deployment);
                }
                Ok(_) => {
                    debug!(namespace = %namespace, name = %name, "Deployment not complete yet");
                }
                Err(e) => {
                    return Err(Error::api(
                        format!("get deployment {}/{}", namespace, name),
                        e,
                    ));
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(Error::ReadinessTimeout {
            namespace: namespace.to_string(),
            name: name.to_string(),
            timeout,
        }),
    }
}
