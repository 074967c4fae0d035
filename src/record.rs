// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Normalized telemetry record
//!
//! Collectors produce a typed reading per protocol ([`LoRaWanReading`],
//! [`SnmpReading`], [`MqttReading`]) and fold it into the protocol-agnostic
//! [`TelemetryRecord`] envelope. Field keys are not unified across protocols.

use crate::protocol::Protocol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer metric (counters, RSSI, ...)
    Integer(i64),
    /// Floating point metric
    Float(f64),
    /// Free text
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    /// Text view of the value, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Protocol-specific bag of metrics
pub type Fields = BTreeMap<String, FieldValue>;

/// Normalized result of a collection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Device identifier, exactly as supplied by the caller
    pub device_id: String,
    /// Protocol the record was collected over
    pub protocol: Protocol,
    /// Collected metrics (may be empty, never absent)
    #[serde(default)]
    pub fields: Fields,
    /// Collection time
    pub collected_at: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Create a record stamped with the current time
    pub fn new(device_id: impl Into<String>, protocol: Protocol, fields: Fields) -> Self {
        Self::with_timestamp(device_id, protocol, fields, Utc::now())
    }

    /// Create a record with an explicit collection time
    pub fn with_timestamp(
        device_id: impl Into<String>,
        protocol: Protocol,
        fields: Fields,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            protocol,
            fields,
            collected_at,
        }
    }

    /// Look up a field by key
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// Latest LoRaWAN uplink metrics
#[derive(Debug, Clone, PartialEq)]
pub struct LoRaWanReading {
    /// Best RSSI across receiving gateways (dBm)
    pub signal_strength: i32,
    /// Application payload as reported by the network server
    pub payload: String,
}

impl From<LoRaWanReading> for Fields {
    fn from(reading: LoRaWanReading) -> Self {
        let mut fields = Fields::new();
        fields.insert("signal_strength".into(), reading.signal_strength.into());
        fields.insert("payload".into(), reading.payload.into());
        fields
    }
}

/// SNMP system and interface metrics
#[derive(Debug, Clone, PartialEq)]
pub struct SnmpReading {
    /// sysUpTime in hundredths of a second
    pub sys_up_time: i64,
    /// ifSpeed in bits per second
    pub if_speed: i64,
}

impl From<SnmpReading> for Fields {
    fn from(reading: SnmpReading) -> Self {
        let mut fields = Fields::new();
        fields.insert("sysUpTime".into(), FieldValue::Integer(reading.sys_up_time));
        fields.insert("ifSpeed".into(), FieldValue::Integer(reading.if_speed));
        fields
    }
}

/// Latest message received on an MQTT topic
#[derive(Debug, Clone, PartialEq)]
pub struct MqttReading {
    /// Topic the value was read from
    pub topic: String,
    /// Decoded numeric value
    pub value: f64,
}

impl From<MqttReading> for Fields {
    fn from(reading: MqttReading) -> Self {
        let mut fields = Fields::new();
        fields.insert("topic".into(), reading.topic.into());
        fields.insert("value".into(), reading.value.into());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_keys() {
        let fields: Fields = SnmpReading {
            sys_up_time: 123456,
            if_speed: 1_000_000,
        }
        .into();
        assert_eq!(fields.get("sysUpTime"), Some(&FieldValue::Integer(123456)));
        assert_eq!(fields.get("ifSpeed"), Some(&FieldValue::Integer(1_000_000)));

        let fields: Fields = LoRaWanReading {
            signal_strength: -120,
            payload: "abc".into(),
        }
        .into();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["signal_strength"], FieldValue::Integer(-120));
    }

    #[test]
    fn test_record_serializes_plain_values() {
        let fields: Fields = MqttReading {
            topic: "sensors/x/temperature".into(),
            value: 22.5,
        }
        .into();
        let record = TelemetryRecord::new("x", Protocol::Mqtt, fields);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["device_id"], "x");
        assert_eq!(json["protocol"], "mqtt");
        assert_eq!(json["fields"]["value"], 22.5);
        assert_eq!(json["fields"]["topic"], "sensors/x/temperature");
        assert!(json["collected_at"].is_string());
    }

    #[test]
    fn test_empty_fields_still_present() {
        let record = TelemetryRecord::new("dev", Protocol::Snmp, Fields::new());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["fields"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_field_value_views() {
        assert_eq!(FieldValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::from("on").as_str(), Some("on"));
        assert_eq!(FieldValue::Float(1.5).as_str(), None);
        assert_eq!(FieldValue::from(-7i32).to_string(), "-7");
    }
}
