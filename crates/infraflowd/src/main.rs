use anyhow::{Context, Result};
use clap::Parser;
use infraflow_cloud::{PollConfig, Provisioner, RetryConfig};
use infraflow_cloud_azure::{AzureConfig, AzureControlPlane};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "infraflowd")]
#[command(about = "Provisions resource groups, virtual networks and virtual machines on Azure")]
#[command(version)]
struct Cli {
    /// Address to serve the HTTP API on
    #[arg(long, env = "INFRAFLOW_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Administrator account created on every virtual machine
    #[arg(long, env = "INFRAFLOW_ADMIN_USERNAME", default_value = "azureuser")]
    admin_username: String,

    /// OpenSSH public key authorized for the administrator account
    #[arg(long, env = "INFRAFLOW_ADMIN_SSH_KEY_FILE")]
    admin_ssh_key_file: PathBuf,

    /// Seconds between long-running operation status checks
    #[arg(long, env = "INFRAFLOW_POLL_INTERVAL_SECS", default_value_t = 5)]
    poll_interval_secs: u64,

    /// Give up waiting on a long-running operation after this many seconds
    #[arg(long, env = "INFRAFLOW_OPERATION_TIMEOUT_SECS", default_value_t = 1800)]
    operation_timeout_secs: u64,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let admin = infraflowd::admin_access(&cli.admin_username, &cli.admin_ssh_key_file)?;

    let config = AzureConfig::from_env().context("failed to load Azure credentials")?;
    let poll = PollConfig {
        interval: Duration::from_secs(cli.poll_interval_secs),
        timeout: Duration::from_secs(cli.operation_timeout_secs),
    };
    let azure = AzureControlPlane::new(&config, RetryConfig::default(), poll);

    tracing::info!(
        listen = %cli.listen,
        subscription = %azure.subscription_id(),
        admin = %admin.username,
        "configuration loaded",
    );

    let provisioner = Provisioner::new(Arc::new(azure), admin);
    let shutdown = CancellationToken::new();
    let app = infraflowd::router(provisioner, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    tracing::info!("infraflowd ready on http://{}", cli.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("HTTP server error")?;

    tracing::info!("infraflowd shut down");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM, then cancel in-flight workflows
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("received shutdown signal");
    shutdown.cancel();
}
