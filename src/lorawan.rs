// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! LoRaWAN collection
//!
//! LoRaWAN devices are never queried directly: the collector reads the latest
//! uplink the network server has for the device. The network server is
//! abstracted by [`NetworkServer`]; [`MqttNetworkServer`] reads uplink events
//! from the server's MQTT integration.

use crate::collector::Collector;
use crate::error::{CollectorError, Result};
use crate::mqtt::{check_topic_level, MessageSource};
use crate::protocol::Protocol;
use crate::record::{LoRaWanReading, TelemetryRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Latest uplink reported by the network server
#[derive(Debug, Clone, PartialEq)]
pub struct Uplink {
    /// Best RSSI across receiving gateways (dBm)
    pub rssi: i32,
    /// Application payload as reported by the server
    pub data: String,
}

impl Uplink {
    /// Create an uplink
    pub fn new(rssi: i32, data: impl Into<String>) -> Self {
        Self {
            rssi,
            data: data.into(),
        }
    }

    /// Decode an uplink event as published by the network server integration
    ///
    /// ```json
    /// {"deviceInfo": {"devEui": "..."}, "data": "AQID", "rxInfo": [{"rssi": -57}]}
    /// ```
    pub fn from_event_json(payload: &[u8]) -> Result<Self> {
        let event: UplinkEvent = serde_json::from_slice(payload)
            .map_err(|e| CollectorError::malformed(format!("uplink event: {}", e)))?;

        let rssi = event
            .rx_info
            .iter()
            .map(|rx| rx.rssi)
            .max()
            .ok_or_else(|| CollectorError::malformed("uplink event has no rxInfo"))?;

        Ok(Self {
            rssi,
            data: event.data.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UplinkEvent {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    rx_info: Vec<RxInfo>,
}

#[derive(Deserialize)]
struct RxInfo {
    rssi: i32,
}

/// Access to device sessions on a LoRaWAN network server
#[async_trait]
pub trait NetworkServer: Send + Sync {
    /// Latest uplink for the device
    ///
    /// Implementations may wait for the next uplink; callers bound the wait.
    async fn latest_uplink(&self, device_id: &str) -> Result<Uplink>;
}

/// Network server returning a fixed uplink
#[derive(Debug, Clone)]
pub struct StaticNetworkServer {
    uplink: Uplink,
    joined: Option<HashSet<String>>,
}

impl StaticNetworkServer {
    /// Every device is joined and reports `uplink`
    pub fn new(uplink: Uplink) -> Self {
        Self {
            uplink,
            joined: None,
        }
    }

    /// Only the listed devices are joined; others report [`CollectorError::NotJoined`]
    pub fn with_joined<I, T>(uplink: Uplink, devices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            uplink,
            joined: Some(devices.into_iter().map(Into::into).collect()),
        }
    }
}

impl Default for StaticNetworkServer {
    fn default() -> Self {
        Self::new(Uplink::new(-120, "example_payload"))
    }
}

#[async_trait]
impl NetworkServer for StaticNetworkServer {
    async fn latest_uplink(&self, device_id: &str) -> Result<Uplink> {
        match &self.joined {
            Some(joined) if !joined.contains(device_id) => Err(CollectorError::NotJoined),
            _ => Ok(self.uplink.clone()),
        }
    }
}

/// Network server reached through its MQTT event integration
///
/// Uplinks are read from `application/{application_id}/device/{device_id}/event/up`.
#[derive(Debug, Clone)]
pub struct MqttNetworkServer<S> {
    source: S,
    application_id: String,
}

impl<S: MessageSource> MqttNetworkServer<S> {
    /// Create a network server view for one application
    pub fn new(source: S, application_id: impl Into<String>) -> Self {
        Self {
            source,
            application_id: application_id.into(),
        }
    }

    /// Uplink topic for a device
    pub fn uplink_topic(&self, device_id: &str) -> String {
        format!(
            "application/{}/device/{}/event/up",
            self.application_id, device_id
        )
    }
}

#[async_trait]
impl<S: MessageSource> NetworkServer for MqttNetworkServer<S> {
    async fn latest_uplink(&self, device_id: &str) -> Result<Uplink> {
        check_topic_level(device_id)?;
        let payload = self.source.next_message(&self.uplink_topic(device_id)).await?;
        Uplink::from_event_json(&payload)
    }
}

/// Configuration for [`LoRaWanCollector`]
#[derive(Debug, Clone)]
pub struct LoRaWanConfig {
    /// How long to wait for an uplink
    pub uplink_timeout: Duration,
}

impl Default for LoRaWanConfig {
    fn default() -> Self {
        Self {
            uplink_timeout: Duration::from_secs(3),
        }
    }
}

impl LoRaWanConfig {
    /// Create a configuration with a custom uplink timeout
    pub fn with_uplink_timeout(uplink_timeout: Duration) -> Self {
        Self { uplink_timeout }
    }
}

/// Collects the latest uplink metrics of a LoRaWAN device
#[derive(Debug, Clone)]
pub struct LoRaWanCollector<N = StaticNetworkServer> {
    server: N,
    config: LoRaWanConfig,
}

impl LoRaWanCollector<StaticNetworkServer> {
    /// Collector backed by the placeholder network server
    pub fn placeholder() -> Self {
        Self::new(StaticNetworkServer::default())
    }
}

impl<N: NetworkServer> LoRaWanCollector<N> {
    /// Create a collector with default configuration
    pub fn new(server: N) -> Self {
        Self::with_config(server, LoRaWanConfig::default())
    }

    /// Create a collector with custom configuration
    pub fn with_config(server: N, config: LoRaWanConfig) -> Self {
        Self { server, config }
    }
}

#[async_trait]
impl<N: NetworkServer> Collector for LoRaWanCollector<N> {
    fn protocol(&self) -> Protocol {
        Protocol::LoRaWan
    }

    async fn collect(&self, device_id: &str) -> Result<TelemetryRecord> {
        let uplink = tokio::time::timeout(
            self.config.uplink_timeout,
            self.server.latest_uplink(device_id),
        )
        .await
        .map_err(|_| {
            CollectorError::no_data(format!(
                "no uplink within {}ms",
                self.config.uplink_timeout.as_millis()
            ))
        })??;

        #[cfg(feature = "logging")]
        log::debug!("lorawan: {} rssi={}", device_id, uplink.rssi);

        let reading = LoRaWanReading {
            signal_strength: uplink.rssi,
            payload: uplink.data,
        };
        Ok(TelemetryRecord::new(device_id, Protocol::LoRaWan, reading.into()))
    }
}
