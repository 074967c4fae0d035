// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! MQTT collection
//!
//! The collector subscribes to a per-device topic and waits for the latest
//! message. The wait is always bounded: a topic nobody publishes to is an
//! error, not a hang.

use crate::collector::Collector;
use crate::error::{CollectorError, Result};
use crate::protocol::Protocol;
use crate::record::{MqttReading, TelemetryRecord};
use async_trait::async_trait;
use std::time::Duration;

/// Placeholder substituted with the device identifier in topic templates
pub const DEVICE_PLACEHOLDER: &str = "{device_id}";

/// A publish/subscribe source of messages
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Subscribe to `topic` and return the payload of the next message
    ///
    /// Implementations may wait indefinitely; callers bound the wait.
    async fn next_message(&self, topic: &str) -> Result<Vec<u8>>;
}

/// Source that answers every subscription with the same payload
#[derive(Debug, Clone)]
pub struct StaticSource {
    payload: Vec<u8>,
}

impl StaticSource {
    /// Create a source returning `payload` for every topic
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new("22.5")
    }
}

#[async_trait]
impl MessageSource for StaticSource {
    async fn next_message(&self, _topic: &str) -> Result<Vec<u8>> {
        Ok(self.payload.clone())
    }
}

/// Configuration for [`MqttCollector`]
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Topic template; `{device_id}` is replaced with the device identifier
    pub topic_template: String,
    /// How long to wait for a message
    pub wait_timeout: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            topic_template: "sensors/{device_id}/temperature".to_string(),
            wait_timeout: Duration::from_secs(3),
        }
    }
}

impl MqttConfig {
    /// Create a configuration with a custom topic template
    pub fn with_topic_template(template: impl Into<String>) -> Self {
        Self {
            topic_template: template.into(),
            ..Default::default()
        }
    }

    /// Create a configuration with a custom wait timeout
    pub fn with_wait_timeout(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            ..Default::default()
        }
    }

    /// Topic for a given device
    pub fn topic_for(&self, device_id: &str) -> String {
        self.topic_template.replace(DEVICE_PLACEHOLDER, device_id)
    }
}

/// Check that a device id can stand as one literal topic level.
///
/// `+` and `#` would turn the subscription into a wildcard filter, and NUL
/// is not allowed anywhere in a topic.
pub fn check_topic_level(device_id: &str) -> Result<()> {
    match device_id.chars().find(|c| matches!(c, '+' | '#' | '\0')) {
        Some(c) => Err(CollectorError::malformed(format!(
            "device id {:?} contains {:?}, which is not allowed in an MQTT topic",
            device_id, c
        ))),
        None => Ok(()),
    }
}

/// Decode a numeric reading from an MQTT payload
///
/// Accepts plain numeric text (`22.5`) or a JSON object with a numeric
/// `value` member (`{"value": 22.5}`).
pub fn decode_value(payload: &[u8]) -> Result<f64> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| CollectorError::malformed("payload is not UTF-8"))?
        .trim();

    if let Ok(v) = text.parse::<f64>() {
        if v.is_finite() {
            return Ok(v);
        }
        return Err(CollectorError::malformed(format!("non-finite value: {}", text)));
    }

    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| CollectorError::malformed(format!("undecodable payload: {}", e)))?;
    json.get("value")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| CollectorError::malformed("payload has no numeric \"value\""))
}

/// Collects the latest value published on a device's topic
#[derive(Debug, Clone)]
pub struct MqttCollector<S = StaticSource> {
    source: S,
    config: MqttConfig,
}

impl MqttCollector<StaticSource> {
    /// Collector backed by the placeholder source
    pub fn placeholder() -> Self {
        Self::new(StaticSource::default())
    }
}

impl<S: MessageSource> MqttCollector<S> {
    /// Create a collector with default configuration
    pub fn new(source: S) -> Self {
        Self::with_config(source, MqttConfig::default())
    }

    /// Create a collector with custom configuration
    pub fn with_config(source: S, config: MqttConfig) -> Self {
        Self { source, config }
    }

    /// Collector configuration
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }
}

#[async_trait]
impl<S: MessageSource> Collector for MqttCollector<S> {
    fn protocol(&self) -> Protocol {
        Protocol::Mqtt
    }

    async fn collect(&self, device_id: &str) -> Result<TelemetryRecord> {
        check_topic_level(device_id)?;
        let topic = self.config.topic_for(device_id);

        let payload = tokio::time::timeout(self.config.wait_timeout, self.source.next_message(&topic))
            .await
            .map_err(|_| {
                CollectorError::no_data(format!(
                    "no message on {} within {}ms",
                    topic,
                    self.config.wait_timeout.as_millis()
                ))
            })??;

        let value = decode_value(&payload)?;

        #[cfg(feature = "logging")]
        log::debug!("mqtt: {} -> {}", topic, value);

        Ok(TelemetryRecord::new(
            device_id,
            Protocol::Mqtt,
            MqttReading { topic, value }.into(),
        ))
    }
}
