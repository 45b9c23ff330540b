pub mod autoscaler;
pub mod common;
pub mod rbac;
pub mod secret;

pub use common::{AUTOSCALER_NAME, KUBECONFIG_KEY, autoscaler_labels, kubeconfig_path};
