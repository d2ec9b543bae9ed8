//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http::middleware::rate_limit (client identity, route)
//!     → rate_limit.rs (sliding-window check per client and route)
//!     → admitted: handler runs, X-RateLimit-* headers added
//!     → denied: 429 with Retry-After
//! ```

pub mod rate_limit;

pub use rate_limit::{RateLimitDecision, RateLimiter, RouteLimit, RouteLimits};
