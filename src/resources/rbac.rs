//! Identity and permissions for the autoscaler
//!
//! The autoscaler gets a ServiceAccount in the test namespace and an
//! unrestricted ClusterRole bound to it. Cluster-scoped names are generated
//! by the server so concurrent runs never collide.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use kube::core::ObjectMeta;

use crate::resources::common::{AUTOSCALER_NAME, generate_name_prefix};

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Matches every API group, resource or verb in a PolicyRule
const ALL: &str = "*";

/// Generate the autoscaler's ServiceAccount
pub fn generate_service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(AUTOSCALER_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Generate a ClusterRole allowing every verb on every resource
pub fn generate_cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            generate_name: Some(generate_name_prefix()),
            ..Default::default()
        },
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec![ALL.to_string()]),
            resources: Some(vec![ALL.to_string()]),
            verbs: vec![ALL.to_string()],
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// Bind `cluster_role` to the autoscaler's ServiceAccount in `namespace`
pub fn generate_cluster_role_binding(cluster_role: &str, namespace: &str) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            generate_name: Some(generate_name_prefix()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: cluster_role.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: AUTOSCALER_NAME.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}
