use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use brent_api::api::{create_router, AppState};
use brent_api::config::{AppConfig, Cli};
use brent_api::data::Dataset;
use brent_api::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let config = AppConfig::load(&cli).context("invalid configuration")?;

    telemetry::init_tracing(&config.log_filter);
    telemetry::init_metrics(config.metrics_addr)?;

    info!("Starting Brent oil price API");

    // Any load failure aborts startup; the service never runs on partial data.
    let sources = config.data_sources();
    let dataset = Dataset::load(&sources).context("failed to load data files")?;
    info!(
        prices = dataset.prices().len(),
        events = dataset.events().len(),
        "Data loaded"
    );

    let app = create_router(AppState::new(dataset));

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
