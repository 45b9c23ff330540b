use clap::Parser;
use kube::Client;
use tracing::{error, info};

use capi_autoscaler_tester::{Cli, Tester};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err(
            "Failed to install rustls crypto provider and no provider is available".into(),
        );
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("capi_autoscaler_tester=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    info!(
        test_binary = %cli.autoscaler_test_path.display(),
        "Starting capi autoscaler suite"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let tester = Tester::from_cli(cli);
    if let Err(e) = tester.execute(client).await {
        error!("Failed to run capi autoscaler suite: {}", e);
        return Err(e.into());
    }

    Ok(())
}
