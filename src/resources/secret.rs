use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::config::Kubeconfig;
use kube::core::ObjectMeta;

use crate::error::Result;
use crate::resources::common::{AUTOSCALER_NAME, KUBECONFIG_KEY};

/// Serialize a kubeconfig the way kubectl writes it
pub fn serialize_kubeconfig(kubeconfig: &Kubeconfig) -> Result<Vec<u8>> {
    Ok(serde_yaml::to_string(kubeconfig)?.into_bytes())
}

/// Generate the Secret carrying the workload cluster's kubeconfig
pub fn generate_kubeconfig_secret(namespace: &str, kubeconfig: &Kubeconfig) -> Result<Secret> {
    let data = BTreeMap::from([(
        KUBECONFIG_KEY.to_string(),
        ByteString(serialize_kubeconfig(kubeconfig)?),
    )]);

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(AUTOSCALER_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    })
}
