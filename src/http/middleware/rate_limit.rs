//! Admission middleware.
//!
//! Runs the rate limiter for every request before it reaches a handler and
//! records request metrics on the way out.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::{client_id, request_id};
use crate::http::response::apply_rate_limit_headers;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    // Unmatched paths share one limiter key and one metric series.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    if !state.rate_limit_enabled {
        let response = next.run(request).await;
        metrics::record_request(&route, response.status().as_u16(), start);
        return response;
    }

    let client = client_id(&request);
    let response = match state.pipeline.admit(&client, &route) {
        Ok(decision) => {
            tracing::trace!(
                request_id = %request_id(&request),
                client = %client,
                remaining = decision.remaining,
                "Request admitted"
            );
            let mut response = next.run(request).await;
            apply_rate_limit_headers(response.headers_mut(), &decision);
            response
        }
        Err(denied) => denied.into_response(),
    };

    metrics::record_request(&route, response.status().as_u16(), start);
    response
}
