// AirGuard Gateway - Protocol-dispatching telemetry gateway
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for AirGuard Gateway

use airguard::{CollectorError, ErrorKind, Protocol};
use thiserror::Error;

/// Main error type for Gateway operations
///
/// Every variant carries the device and protocol that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Requested protocol is not one of the supported protocols
    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { device_id: String, protocol: String },

    /// Device could not be contacted in time
    #[error("Device {device_id} unreachable over {protocol}: {source}")]
    DeviceUnreachable {
        device_id: String,
        protocol: Protocol,
        #[source]
        source: CollectorError,
    },

    /// Device was contacted but produced no usable data
    #[error("No data from device {device_id} over {protocol}: {source}")]
    DeviceDataUnavailable {
        device_id: String,
        protocol: Protocol,
        #[source]
        source: CollectorError,
    },

    /// Device answered with something that could not be decoded
    #[error("Malformed response from device {device_id} over {protocol}: {source}")]
    MalformedResponse {
        device_id: String,
        protocol: Protocol,
        #[source]
        source: CollectorError,
    },
}

impl GatewayError {
    /// Attach device and protocol context to a collector error
    pub fn from_collector(device_id: &str, protocol: Protocol, source: CollectorError) -> Self {
        let device_id = device_id.to_string();
        match source.kind() {
            ErrorKind::DeviceUnreachable => Self::DeviceUnreachable {
                device_id,
                protocol,
                source,
            },
            ErrorKind::DeviceDataUnavailable => Self::DeviceDataUnavailable {
                device_id,
                protocol,
                source,
            },
            ErrorKind::MalformedResponse => Self::MalformedResponse {
                device_id,
                protocol,
                source,
            },
        }
    }

    /// Device the failed call was for
    pub fn device_id(&self) -> &str {
        match self {
            Self::UnsupportedProtocol { device_id, .. }
            | Self::DeviceUnreachable { device_id, .. }
            | Self::DeviceDataUnavailable { device_id, .. }
            | Self::MalformedResponse { device_id, .. } => device_id,
        }
    }

    /// Protocol name the failed call was for (normalized when unsupported)
    pub fn protocol(&self) -> &str {
        match self {
            Self::UnsupportedProtocol { protocol, .. } => protocol,
            Self::DeviceUnreachable { protocol, .. }
            | Self::DeviceDataUnavailable { protocol, .. }
            | Self::MalformedResponse { protocol, .. } => protocol.as_str(),
        }
    }

    /// Stable snake_case error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedProtocol { .. } => "unsupported_protocol",
            Self::DeviceUnreachable { .. } => ErrorKind::DeviceUnreachable.code(),
            Self::DeviceDataUnavailable { .. } => ErrorKind::DeviceDataUnavailable.code(),
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse.code(),
        }
    }

    /// Whether a caller may reasonably retry later (with backoff)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeviceUnreachable { .. })
    }
}

/// Result type alias for Gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_context_is_attached() {
        let err = GatewayError::from_collector("dev-9", Protocol::Mqtt, CollectorError::no_data("quiet"));

        assert!(matches!(err, GatewayError::DeviceDataUnavailable { .. }));
        assert_eq!(err.device_id(), "dev-9");
        assert_eq!(err.protocol(), "mqtt");
        assert_eq!(err.code(), "device_data_unavailable");
        assert!(!err.is_retryable());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unreachable_is_retryable() {
        let err = GatewayError::from_collector(
            "10.0.0.1",
            Protocol::Snmp,
            CollectorError::Timeout {
                timeout_ms: 1000,
                attempts: 3,
            },
        );
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.1"));
        assert!(msg.contains("snmp"));
    }

    #[test]
    fn test_unsupported_protocol() {
        let err = GatewayError::UnsupportedProtocol {
            device_id: "dev-1".into(),
            protocol: "zigbee".into(),
        };
        assert_eq!(err.to_string(), "Unsupported protocol: zigbee");
        assert_eq!(err.protocol(), "zigbee");
        assert!(!err.is_retryable());
    }
}
