// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for discovery, grant bookkeeping and resource generation
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. Version discovery picks the preferred version whenever one is declared
//! 2. Grant release order always puts the binding before the role
//! 3. The autoscaler deployment never depends on the namespace or image beyond naming them
//! 4. Bounds validation accepts exactly the satisfiable ranges

use proptest::prelude::*;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    APIGroup, APIGroupList, GroupVersionForDiscovery,
};

use capi_autoscaler_tester::discovery::preferred_version;
use capi_autoscaler_tester::provider::capi::validate_bounds;
use capi_autoscaler_tester::resources::autoscaler::{
    autoscaler_args, generate_autoscaler_deployment,
};
use capi_autoscaler_tester::scaling::{scale_replicas, scale_request};
use capi_autoscaler_tester::{ClusterGrant, Error, GrantObject};

fn version_strategy() -> impl Strategy<Value = String> {
    "v[1-3](alpha[1-4]|beta[1-3])?"
}

fn group_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,8}(\\.[a-z]{2,6}){1,2}"
}

fn discovery_entry(group: &str, versions: &[String], preferred: Option<usize>) -> APIGroup {
    let gv = |v: &String| GroupVersionForDiscovery {
        group_version: format!("{}/{}", group, v),
        version: v.clone(),
    };
    APIGroup {
        name: group.to_string(),
        versions: versions.iter().map(gv).collect(),
        preferred_version: preferred.and_then(|i| versions.get(i)).map(gv),
        ..Default::default()
    }
}

proptest! {
    /// A declared preferred version is always the one chosen
    #[test]
    fn prop_preferred_version_wins(
        group in group_strategy(),
        versions in prop::collection::vec(version_strategy(), 1..5),
        preferred in any::<prop::sample::Index>(),
        others in prop::collection::vec(group_strategy(), 0..4),
    ) {
        let index = preferred.index(versions.len());
        let mut groups: Vec<APIGroup> = others
            .iter()
            .filter(|g| **g != group)
            .map(|g| discovery_entry(g, &["v9".to_string()], Some(0)))
            .collect();
        groups.push(discovery_entry(&group, &versions, Some(index)));

        let catalog = APIGroupList { groups };
        prop_assert_eq!(preferred_version(&catalog, &group).unwrap(), versions[index].clone());
    }

    /// Without a preferred version the first listed version is used
    #[test]
    fn prop_first_version_is_fallback(
        group in group_strategy(),
        versions in prop::collection::vec(version_strategy(), 1..5),
    ) {
        let catalog = APIGroupList {
            groups: vec![discovery_entry(&group, &versions, None)],
        };
        prop_assert_eq!(preferred_version(&catalog, &group).unwrap(), versions[0].clone());
    }

    /// A group absent from the catalog is reported as not found, never guessed
    #[test]
    fn prop_absent_group_not_found(
        group in group_strategy(),
        others in prop::collection::vec(group_strategy(), 0..5),
    ) {
        let catalog = APIGroupList {
            groups: others
                .iter()
                .filter(|g| **g != group)
                .map(|g| discovery_entry(g, &["v1".to_string()], Some(0)))
                .collect(),
        };
        let result = preferred_version(&catalog, &group);
        prop_assert!(matches!(result, Err(Error::GroupNotFound(_))));
    }

    /// Whatever subset of the grant exists, the binding is released first
    #[test]
    fn prop_grant_pending_order(
        role in prop::option::of("cluster-autoscaler-[a-z0-9]{5}"),
        binding in prop::option::of("cluster-autoscaler-[a-z0-9]{5}"),
    ) {
        let mut grant = ClusterGrant::new();
        if let Some(r) = &role {
            grant.record_role(r.clone());
        }
        if let Some(b) = &binding {
            grant.record_binding(b.clone());
        }

        let pending = grant.pending();
        prop_assert_eq!(pending.len(), role.iter().count() + binding.iter().count());
        prop_assert_eq!(grant.is_empty(), pending.is_empty());
        if pending.len() == 2 {
            prop_assert_eq!(pending[0].0, GrantObject::ClusterRoleBinding);
            prop_assert_eq!(pending[1].0, GrantObject::ClusterRole);
        }
    }

    /// The deployment shape is independent of namespace and image
    #[test]
    fn prop_deployment_shape_is_fixed(
        namespace in "cluster-autoscaler-[a-z0-9]{5}",
        image in "[a-z]{1,10}(\\.[a-z]{2,5})?/[a-z-]{1,20}:v[0-9]\\.[0-9]{1,2}\\.[0-9]",
    ) {
        let deployment = generate_autoscaler_deployment(&namespace, &image);
        prop_assert_eq!(deployment.metadata.namespace.as_deref(), Some(namespace.as_str()));

        let spec = deployment.spec.unwrap();
        prop_assert_eq!(spec.replicas, Some(1));

        let pod = spec.template.spec.unwrap();
        prop_assert_eq!(pod.containers.len(), 1);
        prop_assert_eq!(pod.containers[0].image.as_deref(), Some(image.as_str()));
        prop_assert_eq!(pod.containers[0].args.clone(), Some(autoscaler_args()));
    }

    /// Bounds are valid exactly when 0 <= min <= max
    #[test]
    fn prop_bounds_validation(min in -5i32..20, max in -5i32..20) {
        prop_assert_eq!(validate_bounds(min, max).is_ok(), 0 <= min && min <= max);
    }

    /// Scale updates carry the absolute target and no resourceVersion
    #[test]
    fn prop_scale_request_is_absolute(replicas in 0i32..1000, name in "[a-z][a-z0-9-]{0,20}") {
        let scale = scale_request("default", &name, replicas);
        prop_assert_eq!(scale_replicas(&scale), replicas);
        prop_assert!(scale.metadata.resource_version.is_none());
    }
}
