// AirGuard Gateway - Protocol-dispatching telemetry gateway
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AirGuard Gateway - Protocol-dispatching telemetry gateway
//!
//! A single entry point that takes a device identifier and a protocol name,
//! routes the request to the LoRaWAN, SNMP or MQTT collector, and returns a
//! normalized [`TelemetryRecord`].
//!
//! ## Quick Start
//!
//! ```rust
//! use airguard_gateway::{GatewayError, TelemetryGateway};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = TelemetryGateway::new();
//!
//! let record = gateway.collect("host-42", "SNMP").await.unwrap();
//! assert_eq!(record.device_id, "host-42");
//!
//! let err = gateway.collect("dev-1", "zigbee").await.unwrap_err();
//! assert!(matches!(err, GatewayError::UnsupportedProtocol { .. }));
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   collect(device_id, protocol)
//!              │
//!              ▼
//!      ┌───────────────┐   unknown name
//!      │   Protocol    │ ─────────────────▶ UnsupportedProtocol
//!      │   resolution  │
//!      └───────┬───────┘
//!              │
//!    ┌─────────┼─────────┐
//!    ▼         ▼         ▼
//! ┌───────┐ ┌──────┐ ┌──────┐
//! │LoRaWAN│ │ SNMP │ │ MQTT │   bounded by collect_timeout
//! └───┬───┘ └──┬───┘ └──┬───┘
//!     └────────┼────────┘
//!              ▼
//!       TelemetryRecord
//! ```

mod config;
mod error;
mod gateway;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::{GatewayBuilder, TelemetryGateway};

// Re-export core types callers need alongside the gateway
pub use airguard::{
    Collector, CollectorError, ErrorKind, FieldValue, Fields, Protocol, TelemetryRecord,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
