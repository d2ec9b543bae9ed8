//! Result caching subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline computes key (policy.rs: "resolve:<url>" / "status:<url>")
//!     → store.rs get() → hit: serve cached value
//!                      → miss/expired: resolve, then set() with policy TTL
//! maintenance task
//!     → store.rs purge_expired() (memory only, never needed for correctness)
//! ```
//!
//! # Design Decisions
//! - Lazy expiration: every read checks the entry's age
//! - Namespaced keys keep full resolutions and status checks apart
//! - Failure states get shorter TTLs than confirmed-good states

pub mod policy;
pub mod store;

pub use policy::{CacheKey, CachedOutcome, TtlPolicy};
pub use store::{CacheStats, ResultCache};
