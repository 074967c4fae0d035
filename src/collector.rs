// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The collector capability
//!
//! Every protocol collector implements [`Collector`]. Collectors are generic
//! over their transport, so moving from a placeholder transport to real I/O
//! does not change the type callers dispatch to.

use crate::error::Result;
use crate::protocol::Protocol;
use crate::record::TelemetryRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Fetches telemetry for one device over one protocol
#[async_trait]
pub trait Collector: Send + Sync {
    /// Protocol this collector speaks
    fn protocol(&self) -> Protocol;

    /// Collect a fresh record for `device_id`
    ///
    /// The returned record carries `device_id` verbatim and
    /// [`Collector::protocol`] as its protocol. Dropping the future cancels
    /// any in-flight transport operation.
    async fn collect(&self, device_id: &str) -> Result<TelemetryRecord>;
}

#[async_trait]
impl<C: Collector + ?Sized> Collector for Arc<C> {
    fn protocol(&self) -> Protocol {
        (**self).protocol()
    }

    async fn collect(&self, device_id: &str) -> Result<TelemetryRecord> {
        (**self).collect(device_id).await
    }
}
