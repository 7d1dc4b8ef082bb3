//! lbc operator - reconciles Services when their Endpoints membership changes

use clap::Parser;
use tokio_util::sync::CancellationToken;

use lbc_common::kube_utils::create_client;
use lbc_common::telemetry::{init_telemetry, TelemetryConfig};
use lbc_operator::controller_runner::build_controllers;
use lbc_operator::signals::cancel_on_signal;
use lbc_operator::OperatorConfig;

/// lbc - Endpoints-driven Service reconciliation
#[derive(Parser, Debug)]
#[command(name = "lbc-operator", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: OperatorConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    cli.config.validate()?;

    let telemetry = init_telemetry(TelemetryConfig {
        service_name: "lbc-operator".to_string(),
        log_format: cli.config.log_format,
        log_filter: cli.config.log_filter.clone(),
        ..Default::default()
    })?;

    let client = create_client(cli.config.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!("Starting lbc controllers");
    let controllers = build_controllers(client, &cli.config, shutdown);
    futures::future::join_all(controllers).await;

    tracing::info!("lbc operator shutting down");
    telemetry.shutdown();
    Ok(())
}
