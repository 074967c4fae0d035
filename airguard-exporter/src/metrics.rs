// AirGuard Exporter - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for AirGuard collection.
//!
//! Label values are bounded: `protocol` is one of the supported protocol
//! names or `unsupported`, `outcome` is `ok` or a gateway error code.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Duration;

/// Label used when the requested protocol is not supported.
pub const UNSUPPORTED_LABEL: &str = "unsupported";

/// Outcome label for a successful collection.
pub const OUTCOME_OK: &str = "ok";

lazy_static! {
    /// Collection requests by protocol and outcome.
    pub static ref COLLECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "airguard_collections_total",
        "Telemetry collection requests by protocol and outcome",
        &["protocol", "outcome"]
    ).unwrap();

    /// Time spent inside the gateway per collection.
    pub static ref COLLECTION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "airguard_collection_duration_seconds",
        "Telemetry collection latency in seconds",
        &["protocol"],
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    /// Rejected requests on authenticated routes.
    pub static ref AUTH_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "airguard_auth_failures_total",
        "Requests rejected by bearer authentication",
        &["reason"]
    ).unwrap();
}

/// Record one finished collection.
pub fn record_collection(protocol: &str, outcome: &str, elapsed: Duration) {
    COLLECTIONS_TOTAL
        .with_label_values(&[protocol, outcome])
        .inc();
    COLLECTION_DURATION_SECONDS
        .with_label_values(&[protocol])
        .observe(elapsed.as_secs_f64());
}

/// Record a rejected request.
pub fn record_auth_failure(reason: &str) {
    AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
