//! Request inspection.
//!
//! # Responsibilities
//! - Identify the calling client for rate limiting
//! - Expose the request ID set by the request-id layer
//!
//! # Design Decisions
//! - Proxy headers win over the socket peer: the service normally runs
//!   behind a reverse proxy, so the peer is the proxy itself
//! - Only the first `X-Forwarded-For` hop is used

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderName, Request};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client identity from proxy headers, falling back to `peer`.
pub fn client_id_from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header_str(headers, &X_FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|hop| !hop.is_empty()) {
            return first.to_string();
        }
    }

    if let Some(real_ip) = header_str(headers, &X_REAL_IP) {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Client identity for `request`. The peer address is read from the
/// `ConnectInfo` extension when the server was started with it.
pub fn client_id<B>(request: &Request<B>) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_id_from_headers(request.headers(), peer)
}

pub fn request_id<B>(request: &Request<B>) -> &str {
    header_str(request.headers(), &X_REQUEST_ID).unwrap_or("unknown")
}
