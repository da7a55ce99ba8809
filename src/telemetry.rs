//! Process-wide tracing and metrics setup, called once from `main`.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG`, when set, wins over the configured filter.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Prometheus exporter listening");
    metrics::gauge!("brent_api_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    tracing::debug!(%addr, "Metrics exporter disabled at build time");
    Ok(())
}
