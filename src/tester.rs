//! Tester that prepares the workload cluster and runs the conformance binary
//!
//! Control-plane nodes are cordoned first so the autoscaler only ever has
//! worker node groups to consider, then the pre-built test binary runs with
//! the remaining arguments.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Role labels that mark control-plane nodes, old and current spelling
pub const CONTROL_PLANE_ROLE_LABELS: [&str; 2] = [
    "node-role.kubernetes.io/master",
    "node-role.kubernetes.io/control-plane",
];

/// Field manager recorded on the cordon patch
const FIELD_MANAGER: &str = "capi-autoscaler-tester";

/// Command-line interface of the tester
#[derive(Parser, Clone, Debug)]
#[command(
    name = "capi-autoscaler-tester",
    about = "Run the cluster-autoscaler conformance suite against a Cluster API cluster",
    override_usage = concat!(
        "capi-autoscaler-tester [OPTIONS] --autoscaler-test-path <PATH> ",
        "-- [TEST_ARGS]..."
    )
)]
pub struct Cli {
    /// Path to the autoscaler test binary
    #[arg(long = "autoscaler-test-path", env = "AUTOSCALER_TEST_PATH")]
    pub autoscaler_test_path: PathBuf,

    /// Arguments passed through to the test binary
    #[arg(last = true)]
    pub test_args: Vec<String>,
}

/// Runs the external conformance binary against the workload cluster
#[derive(Clone, Debug)]
pub struct Tester {
    test_binary: PathBuf,
    test_args: Vec<String>,
    kubeconfig: Option<String>,
}

impl Tester {
    pub fn new(test_binary: impl Into<PathBuf>, test_args: Vec<String>) -> Self {
        Self {
            test_binary: test_binary.into(),
            test_args,
            kubeconfig: None,
        }
    }

    /// Build a tester from parsed flags, forwarding `KUBECONFIG` when set
    pub fn from_cli(cli: Cli) -> Self {
        Self::new(cli.autoscaler_test_path, cli.test_args)
            .with_kubeconfig(std::env::var("KUBECONFIG").ok())
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<String>) -> Self {
        self.kubeconfig = kubeconfig.filter(|k| !k.is_empty());
        self
    }

    /// Arguments the test binary is invoked with
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.test_args.clone();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.clone());
        }
        args
    }

    /// Cordon the control plane, then run the test binary
    pub async fn execute(&self, client: Client) -> Result<()> {
        let cordoned = cordon_control_plane(client).await?;
        info!(count = cordoned.len(), "Cordoned control plane nodes");
        self.test().await
    }

    /// Run the test binary with inherited stdio
    pub async fn test(&self) -> Result<()> {
        let args = self.command_args();
        info!(
            binary = %self.test_binary.display(),
            args = ?args,
            "Running autoscaler test binary"
        );

        let status = Command::new(&self.test_binary)
            .args(&args)
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            info!("Autoscaler test binary succeeded");
            Ok(())
        } else {
            Err(Error::TestFailed {
                binary: self.test_binary.display().to_string(),
                status,
            })
        }
    }
}

/// Patch body marking a node unschedulable
pub fn cordon_patch() -> serde_json::Value {
    serde_json::json!({ "spec": { "unschedulable": true } })
}

/// Mark every node carrying a control-plane role label unschedulable
///
/// Returns the names of the cordoned nodes.
pub async fn cordon_control_plane(client: Client) -> Result<Vec<String>> {
    let nodes: Api<Node> = Api::all(client);

    let mut names = BTreeSet::new();
    for label in CONTROL_PLANE_ROLE_LABELS {
        let list = nodes
            .list(&ListParams::default().labels(label))
            .await
            .map_err(|e| Error::api(format!("list nodes labelled {}", label), e))?;
        names.extend(list.items.iter().map(|n| n.name_any()));
    }

    let patch = cordon_patch();
    for name in &names {
        nodes
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::api(format!("cordon node {}", name), e))?;
        debug!(node = %name, "Cordoned node");
    }

    Ok(names.into_iter().collect())
}
