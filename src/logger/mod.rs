//! Tracing subscriber and Prometheus exporter setup.
//!
//! `RUST_LOG`, when set, overrides the configured level filter.

mod config;

use std::net::SocketAddr;

pub(crate) use config::{LogFormat, LoggerConfig, TelemetryConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub(crate) fn initialize(logger_config: &LoggerConfig, telemetry_config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logger_config.level));

    tracing_subscriber::registry()
        .with(output_layer(&logger_config.format).with_filter(filter))
        .init();

    if telemetry_config.enabled {
        match install_metrics_exporter(&telemetry_config.bind_address) {
            Ok(address) => tracing::info!(%address, "Serving Prometheus metrics"),
            Err(reason) => tracing::warn!(
                bind_address = %telemetry_config.bind_address,
                %reason,
                "Metrics exporter not started"
            ),
        }
    }
}

fn output_layer(format: &LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
    }
}

fn install_metrics_exporter(bind_address: &str) -> Result<SocketAddr, String> {
    let address = parse_bind_address(bind_address)?;
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .map_err(|e| e.to_string())?;
    Ok(address)
}

fn parse_bind_address(bind_address: &str) -> Result<SocketAddr, String> {
    bind_address
        .trim()
        .parse()
        .map_err(|e| format!("invalid bind address: {e}"))
}
