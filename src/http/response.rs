//! Response rendering.
//!
//! # Responsibilities
//! - Render `GatewayError` as a JSON error body with the right status
//! - Attach `Retry-After` to rate-limit denials
//! - Attach `X-RateLimit-*` headers to admitted responses

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::GatewayError;
use crate::security::rate_limit::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            GatewayError::RateLimited { retry_after } => {
                let body = json!({
                    "error": "Rate limit exceeded",
                    "message": self.to_string(),
                    "retry_after": retry_after,
                    "type": self.kind(),
                });
                (
                    status,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            GatewayError::Resolve(failure) => {
                let body = json!({
                    "error": self.to_string(),
                    "type": self.kind(),
                    "url": failure.url(),
                });
                (status, Json(body)).into_response()
            }
            _ => {
                if status.is_server_error() {
                    tracing::error!(error = %self, "Request failed");
                }
                let body = json!({
                    "error": self.to_string(),
                    "type": self.kind(),
                });
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Add the `X-RateLimit-*` headers for an admitted request.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(now + decision.window_secs));
}
