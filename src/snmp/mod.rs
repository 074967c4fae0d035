// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! SNMP collection
//!
//! The collector GETs `sysUpTime.0` and `ifSpeed.N` from the device. SNMP
//! runs over UDP, so each request is bounded by a timeout and timed-out
//! requests are retried according to [`SnmpConfig::retry`]. Only timeouts
//! are retried; a missing object or a bad response fails immediately.

pub mod ber;
mod udp;

pub use ber::{BerError, Message, Oid, Pdu, PduType, SnmpValue};
pub use udp::UdpAgent;

use crate::collector::Collector;
use crate::error::{CollectorError, Result};
use crate::protocol::Protocol;
use crate::record::{SnmpReading, TelemetryRecord};
use crate::recovery::{with_retry, RetryStrategy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Arcs of `sysUpTime.0`
const SYS_UP_TIME: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 3, 0];
/// Arcs of the `ifSpeed` column (append the interface index)
const IF_SPEED: [u32; 10] = [1, 3, 6, 1, 2, 1, 2, 2, 1, 5];

/// `sysUpTime.0`
pub fn sys_up_time_oid() -> Oid {
    Oid::known(&SYS_UP_TIME)
}

/// `ifSpeed.{if_index}`
pub fn if_speed_oid(if_index: u32) -> Oid {
    Oid::known(&IF_SPEED).child(if_index)
}

/// A managed-object agent answering GET requests
#[async_trait]
pub trait SnmpAgent: Send + Sync {
    /// GET `oids` from `target`, returning the response variable bindings
    ///
    /// Implementations may wait indefinitely; the collector bounds each call.
    async fn get(&self, target: &str, oids: &[Oid]) -> Result<Vec<(Oid, SnmpValue)>>;
}

/// Agent answering from a fixed object table
#[derive(Debug, Clone)]
pub struct StaticAgent {
    objects: HashMap<Oid, SnmpValue>,
}

impl StaticAgent {
    /// Agent exposing exactly `objects`
    pub fn new(objects: impl IntoIterator<Item = (Oid, SnmpValue)>) -> Self {
        Self {
            objects: objects.into_iter().collect(),
        }
    }
}

impl Default for StaticAgent {
    fn default() -> Self {
        Self::new([
            (sys_up_time_oid(), SnmpValue::TimeTicks(123456)),
            (if_speed_oid(1), SnmpValue::Gauge32(1_000_000)),
        ])
    }
}

#[async_trait]
impl SnmpAgent for StaticAgent {
    async fn get(&self, _target: &str, oids: &[Oid]) -> Result<Vec<(Oid, SnmpValue)>> {
        Ok(oids
            .iter()
            .map(|oid| {
                let value = self
                    .objects
                    .get(oid)
                    .cloned()
                    .unwrap_or(SnmpValue::NoSuchObject);
                (oid.clone(), value)
            })
            .collect())
    }
}

/// Configuration for [`SnmpCollector`] and [`UdpAgent`]
#[derive(Debug, Clone)]
pub struct SnmpConfig {
    /// Community string (v2c)
    pub community: String,
    /// Agent UDP port
    pub port: u16,
    /// Interface index used for `ifSpeed`
    pub if_index: u32,
    /// Deadline for a single request
    pub request_timeout: Duration,
    /// Retry policy for timed-out requests
    pub retry: RetryStrategy,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: "public".to_string(),
            port: 161,
            if_index: 1,
            request_timeout: Duration::from_secs(1),
            retry: RetryStrategy::fixed(2, Duration::from_millis(200)),
        }
    }
}

impl SnmpConfig {
    /// Create a configuration with a custom community string
    pub fn with_community(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
            ..Default::default()
        }
    }

    /// Create a configuration with custom timeout and retry policy
    pub fn with_retry(request_timeout: Duration, retry: RetryStrategy) -> Self {
        Self {
            request_timeout,
            retry,
            ..Default::default()
        }
    }
}

/// Collects system and interface metrics from an SNMP agent
#[derive(Debug, Clone)]
pub struct SnmpCollector<A = StaticAgent> {
    agent: A,
    config: SnmpConfig,
}

impl SnmpCollector<StaticAgent> {
    /// Collector backed by the placeholder agent
    pub fn placeholder() -> Self {
        Self::new(StaticAgent::default())
    }
}

impl SnmpCollector<UdpAgent> {
    /// Collector querying devices over UDP
    pub fn udp(config: SnmpConfig) -> Self {
        Self::with_config(UdpAgent::from_config(&config), config)
    }
}

impl<A: SnmpAgent> SnmpCollector<A> {
    /// Create a collector with default configuration
    pub fn new(agent: A) -> Self {
        Self::with_config(agent, SnmpConfig::default())
    }

    /// Create a collector with custom configuration
    pub fn with_config(agent: A, config: SnmpConfig) -> Self {
        Self { agent, config }
    }

    /// Collector configuration
    pub fn config(&self) -> &SnmpConfig {
        &self.config
    }

    async fn get_with_retry(&self, target: &str, oids: &[Oid]) -> Result<Vec<(Oid, SnmpValue)>> {
        let request_timeout = self.config.request_timeout;
        let timeout_ms = request_timeout.as_millis() as u64;

        let outcome = with_retry(&self.config.retry, CollectorError::is_timeout, |attempt| async move {
            match tokio::time::timeout(request_timeout, self.agent.get(target, oids)).await {
                Ok(result) => result,
                Err(_) => {
                    #[cfg(feature = "logging")]
                    log::warn!("snmp: {} timed out (attempt {})", target, attempt + 1);
                    Err(CollectorError::Timeout {
                        timeout_ms,
                        attempts: attempt + 1,
                    })
                }
            }
        })
        .await;

        match outcome.result {
            Err(CollectorError::Timeout { timeout_ms, .. }) => Err(CollectorError::Timeout {
                timeout_ms,
                attempts: outcome.attempts,
            }),
            other => other,
        }
    }
}

/// Numeric value bound to `oid` in a response, rejected if it overflows `i64`
fn numeric(varbinds: &[(Oid, SnmpValue)], oid: &Oid) -> Result<i64> {
    let (_, value) = varbinds
        .iter()
        .find(|(name, _)| name == oid)
        .ok_or_else(|| CollectorError::malformed(format!("response lacks {}", oid)))?;

    if value.is_exception() {
        return Err(CollectorError::UnsupportedOid {
            oid: oid.to_string(),
        });
    }
    let raw = value
        .as_u64()
        .ok_or_else(|| CollectorError::malformed(format!("non-numeric value for {}: {:?}", oid, value)))?;
    i64::try_from(raw)
        .map_err(|_| CollectorError::malformed(format!("value for {} out of range: {}", oid, raw)))
}

#[async_trait]
impl<A: SnmpAgent> Collector for SnmpCollector<A> {
    fn protocol(&self) -> Protocol {
        Protocol::Snmp
    }

    async fn collect(&self, device_id: &str) -> Result<TelemetryRecord> {
        let oids = [sys_up_time_oid(), if_speed_oid(self.config.if_index)];
        let varbinds = self.get_with_retry(device_id, &oids).await?;

        let reading = SnmpReading {
            sys_up_time: numeric(&varbinds, &oids[0])?,
            if_speed: numeric(&varbinds, &oids[1])?,
        };
        Ok(TelemetryRecord::new(device_id, Protocol::Snmp, reading.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::record::FieldValue;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Agent that times out a fixed number of times before answering
    struct FlakyAgent {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyAgent {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SnmpAgent for FlakyAgent {
        async fn get(&self, target: &str, oids: &[Oid]) -> Result<Vec<(Oid, SnmpValue)>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                std::future::pending::<()>().await;
            }
            StaticAgent::default().get(target, oids).await
        }
    }

    fn fast_retry(retries: u32) -> SnmpConfig {
        SnmpConfig::with_retry(
            Duration::from_millis(500),
            RetryStrategy::fixed(retries, Duration::from_millis(50)),
        )
    }

    #[test]
    fn test_well_known_oids() {
        assert_eq!(sys_up_time_oid().to_string(), "1.3.6.1.2.1.1.3.0");
        assert_eq!(if_speed_oid(3).to_string(), "1.3.6.1.2.1.2.2.1.5.3");
    }

    #[tokio::test]
    async fn test_placeholder_collect() {
        let record = SnmpCollector::placeholder().collect("host-42").await.unwrap();

        assert_eq!(record.protocol, Protocol::Snmp);
        assert_eq!(record.field("sysUpTime"), Some(&FieldValue::Integer(123456)));
        assert_eq!(record.field("ifSpeed"), Some(&FieldValue::Integer(1_000_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_timeouts() {
        let collector = SnmpCollector::with_config(FlakyAgent::new(2), fast_retry(2));
        let record = collector.collect("10.0.0.1").await.unwrap();

        assert_eq!(record.field("sysUpTime"), Some(&FieldValue::Integer(123456)));
        assert_eq!(collector.agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let collector = SnmpCollector::with_config(FlakyAgent::new(10), fast_retry(2));
        let err = collector.collect("10.0.0.1").await.unwrap_err();

        assert_eq!(
            err,
            CollectorError::Timeout {
                timeout_ms: 500,
                attempts: 3
            }
        );
        assert_eq!(err.kind(), ErrorKind::DeviceUnreachable);
        assert_eq!(collector.agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unsupported_oid() {
        let agent = StaticAgent::new([(sys_up_time_oid(), SnmpValue::TimeTicks(5))]);
        let err = SnmpCollector::new(agent).collect("host").await.unwrap_err();

        assert_eq!(
            err,
            CollectorError::UnsupportedOid {
                oid: "1.3.6.1.2.1.2.2.1.5.1".into()
            }
        );
        assert_eq!(err.kind(), ErrorKind::DeviceDataUnavailable);
    }

    #[tokio::test]
    async fn test_non_numeric_value() {
        let agent = StaticAgent::new([
            (sys_up_time_oid(), SnmpValue::OctetString(b"up".to_vec())),
            (if_speed_oid(1), SnmpValue::Gauge32(10)),
        ]);
        let err = SnmpCollector::new(agent).collect("host").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_counter64_beyond_i64() {
        let agent = StaticAgent::new([
            (sys_up_time_oid(), SnmpValue::TimeTicks(1)),
            (if_speed_oid(1), SnmpValue::Counter64(u64::MAX)),
        ]);
        let err = SnmpCollector::new(agent).collect("host").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(err.to_string().contains("1.3.6.1.2.1.2.2.1.5.1"));
    }

    #[tokio::test]
    async fn test_counter64_at_i64_max() {
        let agent = StaticAgent::new([
            (sys_up_time_oid(), SnmpValue::TimeTicks(1)),
            (if_speed_oid(1), SnmpValue::Counter64(i64::MAX as u64)),
        ]);
        let record = SnmpCollector::new(agent).collect("host").await.unwrap();
        assert_eq!(record.field("ifSpeed"), Some(&FieldValue::Integer(i64::MAX)));
    }
}
