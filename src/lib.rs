// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AirGuard - Multi-protocol telemetry collection
//!
//! Collectors that fetch telemetry from network devices over LoRaWAN, SNMP
//! and MQTT, and normalize it into a single [`TelemetryRecord`] shape.
//!
//! ## Quick Start
//!
//! ```rust
//! use airguard::{Collector, FieldValue, SnmpCollector};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let collector = SnmpCollector::placeholder();
//! let record = collector.collect("core-switch").await.unwrap();
//!
//! assert_eq!(record.device_id, "core-switch");
//! assert_eq!(record.field("sysUpTime"), Some(&FieldValue::Integer(123456)));
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: The closed set of supported protocols
//! - [`record`]: Normalized record and per-protocol readings
//! - [`collector`]: The [`Collector`] capability
//! - [`lorawan`]: Uplinks from a LoRaWAN network server
//! - [`snmp`]: SNMPv2c GET with timeout retries
//! - [`mqtt`]: Latest message on a device topic
//! - [`recovery`]: Retry strategies
//! - `broker`: rumqttc-backed MQTT transport (feature `broker`)

pub mod collector;
pub mod error;
pub mod lorawan;
pub mod mqtt;
pub mod protocol;
pub mod record;
pub mod recovery;
pub mod snmp;

#[cfg(feature = "broker")]
pub mod broker;

// Re-exports for convenient access
pub use collector::Collector;
pub use error::{CollectorError, ErrorKind, Result};
pub use lorawan::{
    LoRaWanCollector, LoRaWanConfig, MqttNetworkServer, NetworkServer, StaticNetworkServer, Uplink,
};
pub use mqtt::{MessageSource, MqttCollector, MqttConfig, StaticSource};
pub use protocol::{Protocol, UnsupportedProtocol};
pub use record::{
    FieldValue, Fields, LoRaWanReading, MqttReading, SnmpReading, TelemetryRecord,
};
pub use recovery::{with_retry, RetryOutcome, RetryStrategy};
pub use snmp::{SnmpAgent, SnmpCollector, SnmpConfig, StaticAgent, UdpAgent};

#[cfg(feature = "broker")]
pub use broker::{BrokerConfig, BrokerSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_collectors_report_their_protocol() {
        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(LoRaWanCollector::placeholder()),
            Box::new(SnmpCollector::placeholder()),
            Box::new(MqttCollector::placeholder()),
        ];

        for (collector, expected) in collectors.iter().zip(Protocol::ALL) {
            assert_eq!(collector.protocol(), expected);
            let record = collector.collect("dev").await.unwrap();
            assert_eq!(record.protocol, expected);
        }
    }
}
