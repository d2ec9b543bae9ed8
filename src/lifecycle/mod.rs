//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build pipeline → Start listener
//!
//! Background (maintenance.rs):
//!     every cache.sweep_interval_secs → purge expired cache entries
//!                                     → sweep idle rate-limit keys
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → broadcast → stop accepting → drain within grace → exit
//! ```
//!
//! # Design Decisions
//! - Every background task subscribes to the same broadcast channel
//! - Shutdown has a deadline: in-flight requests are abandoned after the grace period

pub mod maintenance;
pub mod shutdown;
pub mod signals;

pub use maintenance::Maintenance;
pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
