use anyhow::Context;
use deployment::Deployment;
use server::{DeploymentImpl, app};
use services::services::config::Config;
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    let address = config.bind_address();

    let deployment = DeploymentImpl::new(config)
        .await
        .context("failed to initialise deployment")?;

    match deployment.database_validator().check().await {
        Ok(report) if report.is_healthy() => info!(summary = %report.summary(), "Database ready"),
        Ok(report) => tracing::warn!(summary = %report.summary(), "Database schema incomplete"),
        Err(e) => tracing::warn!(error = %e, "Database validation failed"),
    }

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(address = %address, "Server listening");

    axum::serve(listener, app(deployment))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
