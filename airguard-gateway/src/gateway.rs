// AirGuard Gateway - Protocol-dispatching telemetry gateway
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! High-level Gateway API
//!
//! The [`TelemetryGateway`] resolves a protocol name, hands the device to the
//! matching collector and returns its record unchanged.
//!
//! # Example
//!
//! ```rust
//! use airguard_gateway::TelemetryGateway;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = TelemetryGateway::new();
//!
//! let record = gateway.collect("sensor-7", "MQTT").await.unwrap();
//! assert_eq!(record.protocol.as_str(), "mqtt");
//! # }
//! ```

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use airguard::{
    Collector, CollectorError, LoRaWanCollector, MqttCollector, Protocol, SnmpCollector,
    TelemetryRecord,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Dispatches collection requests to per-protocol collectors
///
/// Holds no per-call state: `collect` takes `&self` and concurrent calls do
/// not coordinate.
#[derive(Clone)]
pub struct TelemetryGateway {
    lorawan: Arc<dyn Collector>,
    snmp: Arc<dyn Collector>,
    mqtt: Arc<dyn Collector>,
    config: GatewayConfig,
}

impl TelemetryGateway {
    /// Create a gateway with placeholder collectors and default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a gateway
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Collect telemetry for `device_id` over the protocol named `protocol`
    ///
    /// The protocol name is trimmed and lowercased before matching.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnsupportedProtocol`] if the name is not a supported
    ///   protocol; no collector is invoked
    /// - Any collector failure, with `device_id` and protocol attached
    pub async fn collect(&self, device_id: &str, protocol: &str) -> Result<TelemetryRecord> {
        let protocol: Protocol = protocol.parse().map_err(|e: airguard::UnsupportedProtocol| {
            warn!(device_id, protocol = e.name(), "rejected unsupported protocol");
            GatewayError::UnsupportedProtocol {
                device_id: device_id.to_string(),
                protocol: e.0,
            }
        })?;
        self.collect_protocol(device_id, protocol).await
    }

    /// Collect telemetry for `device_id` over an already-resolved protocol
    pub async fn collect_protocol(
        &self,
        device_id: &str,
        protocol: Protocol,
    ) -> Result<TelemetryRecord> {
        let collector = self.collector(protocol);
        let limit = self.config.collect_timeout;
        let start = Instant::now();

        let result = match tokio::time::timeout(limit, collector.collect(device_id)).await {
            Ok(result) => result,
            // One gateway-level attempt; collector retries inside it are not counted
            Err(_) => Err(CollectorError::Timeout {
                timeout_ms: limit.as_millis() as u64,
                attempts: 1,
            }),
        };

        match result {
            Ok(record) => {
                debug!(
                    device_id,
                    %protocol,
                    fields = record.fields.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "collected"
                );
                Ok(record)
            }
            Err(source) => {
                warn!(device_id, %protocol, error = %source, "collection failed");
                Err(GatewayError::from_collector(device_id, protocol, source))
            }
        }
    }

    /// Collector registered for `protocol`
    pub fn collector(&self, protocol: Protocol) -> &Arc<dyn Collector> {
        match protocol {
            Protocol::LoRaWan => &self.lorawan,
            Protocol::Snmp => &self.snmp,
            Protocol::Mqtt => &self.mqtt,
        }
    }

    /// Get a reference to the gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl Default for TelemetryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TelemetryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TelemetryGateway`]
///
/// Protocols without a registered collector get the placeholder collector.
pub struct GatewayBuilder {
    lorawan: Option<Arc<dyn Collector>>,
    snmp: Option<Arc<dyn Collector>>,
    mqtt: Option<Arc<dyn Collector>>,
    config: GatewayConfig,
}

impl GatewayBuilder {
    fn new() -> Self {
        Self {
            lorawan: None,
            snmp: None,
            mqtt: None,
            config: GatewayConfig::default(),
        }
    }

    /// Register a collector for the protocol it reports
    ///
    /// A later registration for the same protocol replaces the earlier one.
    pub fn collector(mut self, collector: impl Collector + 'static) -> Self {
        let collector: Arc<dyn Collector> = Arc::new(collector);
        match collector.protocol() {
            Protocol::LoRaWan => self.lorawan = Some(collector),
            Protocol::Snmp => self.snmp = Some(collector),
            Protocol::Mqtt => self.mqtt = Some(collector),
        }
        self
    }

    /// Use a custom configuration
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the gateway
    pub fn build(self) -> TelemetryGateway {
        TelemetryGateway {
            lorawan: self
                .lorawan
                .unwrap_or_else(|| Arc::new(LoRaWanCollector::placeholder())),
            snmp: self
                .snmp
                .unwrap_or_else(|| Arc::new(SnmpCollector::placeholder())),
            mqtt: self
                .mqtt
                .unwrap_or_else(|| Arc::new(MqttCollector::placeholder())),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airguard::FieldValue;

    #[tokio::test]
    async fn test_gateway_new() {
        let gateway = TelemetryGateway::new();
        for protocol in Protocol::ALL {
            assert_eq!(gateway.collector(protocol).protocol(), protocol);
        }
    }

    #[tokio::test]
    async fn test_gateway_with_config() {
        let gateway = TelemetryGateway::builder()
            .config(GatewayConfig::with_collect_timeout_ms(100))
            .build();
        assert_eq!(gateway.config().collect_timeout.as_millis(), 100);
    }

    #[tokio::test]
    async fn test_collect_protocol_typed() {
        let gateway = TelemetryGateway::new();
        let record = gateway
            .collect_protocol("host-42", Protocol::Snmp)
            .await
            .unwrap();
        assert_eq!(record.field("ifSpeed"), Some(&FieldValue::Integer(1_000_000)));
    }

    #[tokio::test]
    async fn test_builder_replaces_by_protocol() {
        use airguard::{StaticSource, MqttCollector};

        let gateway = TelemetryGateway::builder()
            .collector(MqttCollector::new(StaticSource::new("18.0")))
            .build();
        let record = gateway.collect("s", "mqtt").await.unwrap();
        assert_eq!(record.field("value"), Some(&FieldValue::Float(18.0)));

        // Other protocols keep their placeholders
        let record = gateway.collect("s", "lorawan").await.unwrap();
        assert_eq!(record.field("signal_strength"), Some(&FieldValue::Integer(-120)));
    }
}
