// AirGuard Exporter - Bearer authentication
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Bearer-token check for the telemetry route.

use crate::metrics::record_auth_failure;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or not a bearer credential
    #[error("Missing auth")]
    Missing,

    /// Bearer token did not match
    #[error("Invalid token")]
    Invalid,
}

impl AuthError {
    /// HTTP status for this rejection
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Missing => StatusCode::UNAUTHORIZED,
            AuthError::Invalid => StatusCode::FORBIDDEN,
        }
    }

    /// Metric label for this rejection
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Invalid => "invalid",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string(), "code": self.reason() });
        (self.status(), Json(body)).into_response()
    }
}

/// Check the `Authorization` header against the expected token.
pub fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::Missing)?;

    if tokens_match(token.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::Invalid)
    }
}

// Comparison time depends only on the lengths.
fn tokens_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Middleware rejecting requests without the configured bearer token.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match check_bearer(request.headers(), &state.token) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(reason = e.reason(), uri = %request.uri(), "rejected request");
            record_auth_failure(e.reason());
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_token() {
        assert_eq!(check_bearer(&headers("Bearer dev-token"), "dev-token"), Ok(()));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            check_bearer(&HeaderMap::new(), "dev-token"),
            Err(AuthError::Missing)
        );
    }

    #[test]
    fn test_non_bearer_scheme() {
        assert_eq!(
            check_bearer(&headers("Basic ZGV2OnRva2Vu"), "dev-token"),
            Err(AuthError::Missing)
        );
        assert_eq!(
            check_bearer(&headers("bearer dev-token"), "dev-token"),
            Err(AuthError::Missing)
        );
    }

    #[test]
    fn test_wrong_token() {
        assert_eq!(
            check_bearer(&headers("Bearer dev-tokens"), "dev-token"),
            Err(AuthError::Invalid)
        );
        assert_eq!(check_bearer(&headers("Bearer "), "dev-token"), Err(AuthError::Invalid));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Invalid.status(), StatusCode::FORBIDDEN);
    }
}
