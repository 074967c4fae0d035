// AirGuard Exporter - HTTP telemetry endpoint and Prometheus exporter
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AirGuard Exporter
//!
//! Serves `POST /telemetry` over the AirGuard gateway, plus health,
//! readiness, status and Prometheus endpoints.
//!
//! ## Usage
//!
//! ```bash
//! # Placeholder collectors on the default port
//! AIRGUARD_TOKEN=secret airguard-exporter
//!
//! # Live SNMP and an MQTT broker for MQTT/LoRaWAN
//! airguard-exporter --snmp-live --mqtt-host broker.local --port 9090
//! ```

mod auth;
mod metrics;
mod routes;

use airguard::{SnmpCollector, SnmpConfig};
use airguard_gateway::{GatewayConfig, TelemetryGateway};
use clap::Parser;
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// AirGuard telemetry exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "AIRGUARD_PORT")]
    port: u16,

    /// Bearer token required on /telemetry
    #[arg(long, default_value = "dev-token", env = "AIRGUARD_TOKEN", hide_env_values = true)]
    token: String,

    /// Upper bound on one collection, in milliseconds
    #[arg(long, default_value = "5000", env = "AIRGUARD_COLLECT_TIMEOUT_MS")]
    collect_timeout_ms: u64,

    /// Query devices over UDP instead of the placeholder SNMP agent
    #[arg(long)]
    snmp_live: bool,

    /// SNMP community string
    #[arg(long, default_value = "public", env = "AIRGUARD_SNMP_COMMUNITY")]
    snmp_community: String,

    /// MQTT broker host; enables live MQTT and LoRaWAN collection
    #[cfg(feature = "broker")]
    #[arg(long, env = "AIRGUARD_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// MQTT broker port
    #[cfg(feature = "broker")]
    #[arg(long, default_value = "1883", env = "AIRGUARD_MQTT_PORT")]
    mqtt_port: u16,

    /// LoRaWAN network server application id
    #[cfg(feature = "broker")]
    #[arg(long, default_value = "airguard", env = "AIRGUARD_LORAWAN_APPLICATION")]
    lorawan_application: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Fatal exporter errors
#[derive(Error, Debug)]
enum ExporterError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

fn build_gateway(args: &Args) -> TelemetryGateway {
    let mut builder = TelemetryGateway::builder()
        .config(GatewayConfig::with_collect_timeout_ms(args.collect_timeout_ms));

    if args.snmp_live {
        info!(community_len = args.snmp_community.len(), "SNMP: live UDP agent");
        builder = builder.collector(SnmpCollector::udp(SnmpConfig::with_community(
            args.snmp_community.clone(),
        )));
    }

    #[cfg(feature = "broker")]
    if let Some(host) = &args.mqtt_host {
        use airguard::{
            BrokerConfig, BrokerSource, LoRaWanCollector, MqttCollector, MqttNetworkServer,
        };

        info!("MQTT/LoRaWAN: broker at {}:{}", host, args.mqtt_port);
        let source = BrokerSource::new(BrokerConfig::new(host.clone(), args.mqtt_port));
        builder = builder
            .collector(MqttCollector::new(source.clone()))
            .collector(LoRaWanCollector::new(MqttNetworkServer::new(
                source,
                args.lorawan_application.clone(),
            )));
    }

    builder.build()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<(), ExporterError> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("AirGuard Exporter v{}", env!("CARGO_PKG_VERSION"));

    let gateway = build_gateway(&args);
    info!(
        "Collect timeout: {} ms",
        gateway.config().collect_timeout.as_millis()
    );

    let state = Arc::new(AppState::new(gateway, args.token.clone()));
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ExporterError::Bind { addr, source })?;
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["airguard-exporter"]).unwrap();
        assert_eq!(args.port, 8080);
        assert!(!args.snmp_live);
        assert_eq!(args.snmp_community, "public");
    }

    #[test]
    fn test_build_gateway_timeout() {
        let args =
            Args::try_parse_from(["airguard-exporter", "--collect-timeout-ms", "1500"]).unwrap();
        let gateway = build_gateway(&args);
        assert_eq!(gateway.config().collect_timeout.as_millis(), 1500);
    }
}
