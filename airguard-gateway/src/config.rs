// AirGuard Gateway - Protocol-dispatching telemetry gateway
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for AirGuard Gateway

use std::time::Duration;

/// Gateway-level configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Upper bound on a single collection call, whatever the protocol
    pub collect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            collect_timeout: Duration::from_secs(5),
        }
    }
}

impl GatewayConfig {
    /// Create a configuration with a custom collection timeout
    pub fn with_collect_timeout(collect_timeout: Duration) -> Self {
        Self { collect_timeout }
    }

    /// Create a configuration from a timeout in milliseconds
    pub fn with_collect_timeout_ms(ms: u64) -> Self {
        Self::with_collect_timeout(Duration::from_millis(ms))
    }
}
