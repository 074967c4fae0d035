// AirGuard Exporter - HTTP routes
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Router and handlers.

use crate::auth::require_bearer;
use crate::metrics::{encode_metrics, record_collection, OUTCOME_OK, UNSUPPORTED_LABEL};
use airguard_gateway::{GatewayError, Protocol, TelemetryGateway, TelemetryRecord};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    pub gateway: TelemetryGateway,
    pub token: String,
    start_time: Instant,
    collections_ok: AtomicU64,
    collections_failed: AtomicU64,
}

impl AppState {
    pub fn new(gateway: TelemetryGateway, token: impl Into<String>) -> Self {
        Self {
            gateway,
            token: token.into(),
            start_time: Instant::now(),
            collections_ok: AtomicU64::new(0),
            collections_failed: AtomicU64::new(0),
        }
    }
}

/// Build the exporter router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/telemetry", post(telemetry_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .merge(protected)
        .with_state(state)
}

/// Body of `POST /telemetry`.
#[derive(Debug, Deserialize)]
pub struct TelemetryRequest {
    pub device_id: String,
    pub protocol: String,
}

/// Gateway failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            GatewayError::UnsupportedProtocol { .. } => StatusCode::BAD_REQUEST,
            GatewayError::DeviceUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::DeviceDataUnavailable { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
            "device_id": self.0.device_id(),
            "protocol": self.0.protocol(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Collect telemetry for one device.
async fn telemetry_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TelemetryRequest>,
) -> Result<Json<TelemetryRecord>, ApiError> {
    let start = Instant::now();
    let result = state.gateway.collect(&req.device_id, &req.protocol).await;
    let elapsed = start.elapsed();

    let label = req
        .protocol
        .parse::<Protocol>()
        .map(|p| p.as_str())
        .unwrap_or(UNSUPPORTED_LABEL);

    match result {
        Ok(record) => {
            record_collection(label, OUTCOME_OK, elapsed);
            state.collections_ok.fetch_add(1, Ordering::Relaxed);
            Ok(Json(record))
        }
        Err(e) => {
            record_collection(label, e.code(), elapsed);
            state.collections_failed.fetch_add(1, Ordering::Relaxed);
            info!(device_id = %req.device_id, code = e.code(), "collection request failed");
            Err(ApiError(e))
        }
    }
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>AirGuard Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>AirGuard Exporter</h1>
    <p>Telemetry collection over LoRaWAN, SNMP and MQTT.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div><code>POST /telemetry</code> - Collect from a device (bearer token required)</div>
        <div><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div><a href="/healthz">/healthz</a> - Health check</div>
        <div><a href="/ready">/ready</a> - Readiness check</div>
        <div><a href="/status">/status</a> - Status information (JSON)</div>
    </div>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> Response {
    match encode_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Health check handler.
async fn healthz_handler() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "airguard-exporter" }))
}

/// Readiness check handler.
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    gateway_version: &'static str,
    uptime_secs: u64,
    protocols: Vec<&'static str>,
    collect_timeout_ms: u64,
    collections_ok: u64,
    collections_failed: u64,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway_version: airguard_gateway::VERSION,
        uptime_secs: state.start_time.elapsed().as_secs(),
        protocols: Protocol::ALL.iter().map(Protocol::as_str).collect(),
        collect_timeout_ms: state.gateway.config().collect_timeout.as_millis() as u64,
        collections_ok: state.collections_ok.load(Ordering::Relaxed),
        collections_failed: state.collections_failed.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use airguard::snmp::{Oid, SnmpValue};
    use airguard::{
        LoRaWanCollector, MqttCollector, SnmpCollector, StaticAgent, StaticNetworkServer,
        StaticSource, Uplink,
    };
    use axum::body::Body;
    use axum::http::{self, Request};
    use tower::ServiceExt;

    const TOKEN: &str = "test-token";

    fn app_with(gateway: TelemetryGateway) -> Router {
        router(Arc::new(AppState::new(gateway, TOKEN)))
    }

    fn app() -> Router {
        app_with(TelemetryGateway::new())
    }

    fn telemetry_request(auth: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(http::Method::POST)
            .uri("/telemetry")
            .header("content-type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let resp = app()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let v = json_body(resp).await;
        assert_eq!(v["ok"], true);
        assert_eq!(v["service"], "airguard-exporter");
    }

    #[tokio::test]
    async fn test_ready() {
        let resp = app()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_telemetry_requires_auth() {
        let body = json!({ "device_id": "dev-1", "protocol": "lorawan" });

        let resp = app()
            .oneshot(telemetry_request(None, body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["error"], "Missing auth");

        let resp = app()
            .oneshot(telemetry_request(Some("Basic abc"), body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app()
            .oneshot(telemetry_request(Some("Bearer wrong"), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_auth_checked_before_body() {
        let req = Request::builder()
            .method(http::Method::POST)
            .uri("/telemetry")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_telemetry_snmp() {
        let auth = format!("Bearer {TOKEN}");
        let resp = app()
            .oneshot(telemetry_request(
                Some(&auth),
                json!({ "device_id": "host-42", "protocol": "SNMP" }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let v = json_body(resp).await;
        assert_eq!(v["device_id"], "host-42");
        assert_eq!(v["protocol"], "snmp");
        assert_eq!(v["fields"]["sysUpTime"], 123456);
        assert_eq!(v["fields"]["ifSpeed"], 1_000_000);
        assert!(v["collected_at"].is_string());
    }

    #[tokio::test]
    async fn test_telemetry_unsupported_protocol() {
        let auth = format!("Bearer {TOKEN}");
        let resp = app()
            .oneshot(telemetry_request(
                Some(&auth),
                json!({ "device_id": "dev-1", "protocol": "zigbee" }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = json_body(resp).await;
        assert_eq!(v["code"], "unsupported_protocol");
        assert_eq!(v["device_id"], "dev-1");
        assert_eq!(v["protocol"], "zigbee");
    }

    #[tokio::test]
    async fn test_telemetry_error_statuses() {
        let auth = format!("Bearer {TOKEN}");
        let empty_agent = StaticAgent::new(Vec::<(Oid, SnmpValue)>::new());
        let gateway = TelemetryGateway::builder()
            .collector(LoRaWanCollector::new(StaticNetworkServer::with_joined(
                Uplink::new(-90, "AA=="),
                ["other"],
            )))
            .collector(SnmpCollector::new(empty_agent))
            .collector(MqttCollector::new(StaticSource::new("warm")))
            .build();
        let app = app_with(gateway);

        let cases = [
            ("lorawan", StatusCode::SERVICE_UNAVAILABLE, "device_unreachable"),
            ("snmp", StatusCode::GATEWAY_TIMEOUT, "device_data_unavailable"),
            ("mqtt", StatusCode::BAD_GATEWAY, "malformed_response"),
        ];
        for (protocol, status, code) in cases {
            let resp = app
                .clone()
                .oneshot(telemetry_request(
                    Some(&auth),
                    json!({ "device_id": "dev-2", "protocol": protocol }),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), status, "{protocol}");
            let v = json_body(resp).await;
            assert_eq!(v["code"], code);
            assert_eq!(v["protocol"], protocol);
        }
    }

    #[tokio::test]
    async fn test_status_counts_collections() {
        let state = Arc::new(AppState::new(TelemetryGateway::new(), TOKEN));
        let app = router(state.clone());
        let auth = format!("Bearer {TOKEN}");

        app.clone()
            .oneshot(telemetry_request(
                Some(&auth),
                json!({ "device_id": "sensor-7", "protocol": "mqtt" }),
            ))
            .await
            .unwrap();

        let resp = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let v = json_body(resp).await;
        assert_eq!(v["collections_ok"], 1);
        assert_eq!(v["collections_failed"], 0);
        assert_eq!(v["collect_timeout_ms"], 5000);
        assert_eq!(v["protocols"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let auth = format!("Bearer {TOKEN}");
        let app = app();
        app.clone()
            .oneshot(telemetry_request(
                Some(&auth),
                json!({ "device_id": "dev-1", "protocol": "lorawan" }),
            ))
            .await
            .unwrap();

        let resp = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("airguard_collections_total"));
        assert!(text.contains(r#"protocol="lorawan""#));
    }
}
