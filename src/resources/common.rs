//! Common names and labels shared by the autoscaler resources

use std::collections::BTreeMap;

/// Name of the autoscaler deployment, its service account and secret
pub const AUTOSCALER_NAME: &str = "cluster-autoscaler";

/// Key inside the credential secret holding the workload kubeconfig
pub const KUBECONFIG_KEY: &str = "kubeconfig.yml";

/// Directory the credential secret is mounted at
pub const KUBECONFIG_MOUNT_PATH: &str = "/home/workload";

/// Volume carrying the credential secret
pub const KUBECONFIG_VOLUME: &str = "workload-kubeconfig";

/// Prefix for server-generated names of cluster-scoped objects
pub fn generate_name_prefix() -> String {
    format!("{}-", AUTOSCALER_NAME)
}

/// Full path of the mounted kubeconfig inside the autoscaler container
pub fn kubeconfig_path() -> String {
    format!("{}/{}", KUBECONFIG_MOUNT_PATH, KUBECONFIG_KEY)
}

/// Labels and selector shared by the autoscaler deployment and its pods
pub fn autoscaler_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), AUTOSCALER_NAME.to_string())])
}
