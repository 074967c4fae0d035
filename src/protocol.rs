// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Supported collection protocols
//!
//! The set of protocols is closed: adding one means adding a variant here,
//! and every `match` over [`Protocol`] stops compiling until it is handled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Transport protocol used to collect telemetry from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// LoRaWAN, through a network server
    LoRaWan,
    /// SNMP request/response against a managed device
    Snmp,
    /// MQTT publish/subscribe through a broker
    Mqtt,
}

impl Protocol {
    /// All supported protocols
    pub const ALL: [Protocol; 3] = [Protocol::LoRaWan, Protocol::Snmp, Protocol::Mqtt];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::LoRaWan => "lorawan",
            Protocol::Snmp => "snmp",
            Protocol::Mqtt => "mqtt",
        }
    }

    /// Normalize a caller-supplied protocol name (trim, lowercase)
    pub fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol name that is not one of the supported protocols
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported protocol: {0}")]
pub struct UnsupportedProtocol(pub String);

impl UnsupportedProtocol {
    /// The rejected name, after normalization
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl FromStr for Protocol {
    type Err = UnsupportedProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = Protocol::normalize(s);
        match normalized.as_str() {
            "lorawan" => Ok(Protocol::LoRaWan),
            "snmp" => Ok(Protocol::Snmp),
            "mqtt" => Ok(Protocol::Mqtt),
            _ => Err(UnsupportedProtocol(normalized)),
        }
    }
}
