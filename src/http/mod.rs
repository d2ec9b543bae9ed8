//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout, CORS)
//!     → middleware/rate_limit.rs (admission, X-RateLimit-* headers)
//!     → handlers.rs (parse input, call the pipeline)
//!     → response.rs (GatewayError → status + JSON body)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{client_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
