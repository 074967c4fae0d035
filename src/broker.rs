// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! MQTT broker transport (feature `broker`)
//!
//! [`BrokerSource`] opens a fresh connection per subscription and returns the
//! first message published on the topic, which is the retained message when
//! the publisher sets one. The connection lives inside the returned future:
//! completing or dropping the future closes it.

use crate::error::{CollectorError, Result};
use crate::mqtt::MessageSource;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, SubscribeReasonCode};
use std::time::Duration;
use uuid::Uuid;

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
    /// Optional username / password
    pub credentials: Option<(String, String)>,
    /// Prefix of the generated client identifiers
    pub client_prefix: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive: Duration::from_secs(30),
            credentials: None,
            client_prefix: "airguard".to_string(),
        }
    }
}

impl BrokerConfig {
    /// Create a configuration for a broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }
}

/// Message source backed by an MQTT broker
#[derive(Debug, Clone)]
pub struct BrokerSource {
    config: BrokerConfig,
}

impl BrokerSource {
    /// Create a source for a broker
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> MqttOptions {
        let client_id = format!("{}-{}", self.config.client_prefix, Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(self.config.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.config.credentials {
            options.set_credentials(username.clone(), password.clone());
        }
        options
    }

    fn broker_error(&self, err: impl std::fmt::Display) -> CollectorError {
        CollectorError::unreachable(format!(
            "broker {}:{}: {}",
            self.config.host, self.config.port, err
        ))
    }
}

#[async_trait]
impl MessageSource for BrokerSource {
    async fn next_message(&self, topic: &str) -> Result<Vec<u8>> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| self.broker_error(e))?;

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    let _ = client.try_disconnect();
                    return Ok(publish.payload.to_vec());
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        return Err(self.broker_error(format!("subscription to {} refused", topic)));
                    }
                }
                Ok(_) => {}
                Err(e) => return Err(self.broker_error(e)),
            }
        }
    }
}
