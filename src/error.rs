//! Gateway-level error type.
//!
//! Every failure a request can end in maps onto one variant here. The HTTP
//! layer owns the conversion to a response; this module only fixes the
//! status code each variant carries.

use axum::http::StatusCode;
use thiserror::Error;

use crate::platform::UrlError;
use crate::resolver::ResolveFailure;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after: u64 },

    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error("{0}")]
    InvalidBatch(String),

    #[error(transparent)]
    Resolve(#[from] ResolveFailure),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidUrl(UrlError::UnsupportedDomain(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            GatewayError::InvalidUrl(_) | GatewayError::InvalidBatch(_) => StatusCode::BAD_REQUEST,
            GatewayError::Resolve(failure) => match failure {
                ResolveFailure::NoPlugin { .. } => StatusCode::BAD_REQUEST,
                ResolveFailure::NoStreams { .. } => StatusCode::NOT_FOUND,
                ResolveFailure::BrowserRequired { .. } | ResolveFailure::Plugin { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ResolveFailure::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable kind, echoed as `type` in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "rate_limit_error",
            GatewayError::InvalidUrl(UrlError::UnsupportedDomain(_)) => "unsupported_domain",
            GatewayError::InvalidUrl(_) => "invalid_url",
            GatewayError::InvalidBatch(_) => "invalid_batch",
            GatewayError::Resolve(failure) => failure.kind(),
        }
    }
}
