//! Cluster autoscaler deployment
//!
//! Runs the autoscaler image under test against the workload cluster, using
//! the kubeconfig mounted from the credential secret. The launch arguments
//! are fixed and must stay in sync with the conformance suite.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, PodSpec, PodTemplateSpec, SecretVolumeSource, Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::ObjectMeta;

use crate::resources::common::{
    AUTOSCALER_NAME, KUBECONFIG_MOUNT_PATH, KUBECONFIG_VOLUME, autoscaler_labels, kubeconfig_path,
};

/// Entrypoint of the cluster-autoscaler image
const AUTOSCALER_COMMAND: &str = "/cluster-autoscaler";

/// Taints carried by control-plane nodes, old and current spelling
pub const CONTROL_PLANE_TAINTS: [&str; 2] = [
    "node-role.kubernetes.io/master",
    "node-role.kubernetes.io/control-plane",
];

/// Command-line arguments passed to the autoscaler
pub fn autoscaler_args() -> Vec<String> {
    vec![
        "--cloud-provider=clusterapi".to_string(),
        format!("--kubeconfig={}", kubeconfig_path()),
        "--clusterapi-cloud-config-authoritative".to_string(),
        "--scale-down-delay-after-add=30s".to_string(),
        "--scale-down-delay-after-failure=30s".to_string(),
        "--scale-down-unneeded-time=1m".to_string(),
        "--scale-down-unready-time=30s".to_string(),
        "--scan-interval=1s".to_string(),
    ]
}

fn control_plane_tolerations() -> Vec<Toleration> {
    CONTROL_PLANE_TAINTS
        .iter()
        .map(|key| Toleration {
            key: Some(key.to_string()),
            effect: Some("NoSchedule".to_string()),
            ..Default::default()
        })
        .collect()
}

/// Generate the single-replica autoscaler Deployment
pub fn generate_autoscaler_deployment(namespace: &str, image: &str) -> Deployment {
    let labels = autoscaler_labels();

    let container = Container {
        name: AUTOSCALER_NAME.to_string(),
        image: Some(image.to_string()),
        command: Some(vec![AUTOSCALER_COMMAND.to_string()]),
        args: Some(autoscaler_args()),
        volume_mounts: Some(vec![VolumeMount {
            name: KUBECONFIG_VOLUME.to_string(),
            mount_path: KUBECONFIG_MOUNT_PATH.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(AUTOSCALER_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    tolerations: Some(control_plane_tolerations()),
                    service_account_name: Some(AUTOSCALER_NAME.to_string()),
                    volumes: Some(vec![Volume {
                        name: KUBECONFIG_VOLUME.to_string(),
                        secret: Some(SecretVolumeSource {
                            secret_name: Some(AUTOSCALER_NAME.to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
