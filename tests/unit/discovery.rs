//! Unit tests for API group version discovery

use http::Method;

use capi_autoscaler_tester::discovery::preferred_version;
use capi_autoscaler_tester::{Error, resolve_preferred_version};

use crate::common::*;

#[tokio::test]
async fn test_resolves_preferred_version_from_server() {
    let (client, server) = FakeApiServer::start(ApiState::capi("v1beta1"));

    let version = resolve_preferred_version(&client, TEST_CAPI_GROUP)
        .await
        .unwrap();

    assert_eq!(version, "v1beta1");
    assert_eq!(server.count(Method::GET, "/apis"), 1);
}

#[tokio::test]
async fn test_older_release_resolves_its_own_version() {
    let (client, _server) = FakeApiServer::start(ApiState::capi("v1alpha4"));

    let version = resolve_preferred_version(&client, TEST_CAPI_GROUP)
        .await
        .unwrap();

    assert_eq!(version, "v1alpha4");
}

#[tokio::test]
async fn test_missing_group_is_a_discovery_error() {
    let (client, _server) =
        FakeApiServer::start(ApiState::capi("v1beta1").with_groups(plain_catalog()));

    let err = resolve_preferred_version(&client, TEST_CAPI_GROUP)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::GroupNotFound(ref g) if g == TEST_CAPI_GROUP));
    assert!(err.is_discovery_error());
}

#[tokio::test]
async fn test_catalog_request_failure_is_an_api_error() {
    let (client, _server) =
        FakeApiServer::start(ApiState::capi("v1beta1").failing(Method::GET, "/apis", 500));

    let err = resolve_preferred_version(&client, TEST_CAPI_GROUP)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { .. }));
    assert!(!err.is_discovery_error());
}

#[test]
fn test_custom_group_from_catalog() {
    let mut catalog = plain_catalog();
    catalog
        .groups
        .push(api_group("cluster.example.com", &["v2", "v1"], None));

    assert_eq!(
        preferred_version(&catalog, "cluster.example.com").unwrap(),
        "v2"
    );
}
