//! Resolver session pooling.
//!
//! # Data Flow
//! ```text
//! pipeline needs a session
//!     → resource_pool.rs acquire()
//!         → stale generation? refresh once (drain idle + rebuild)
//!         → idle session available? hand it out
//!         → wait up to acquire_timeout for a release
//!         → timed out: build an overflow session
//!     → guard.rs PooledSession (exclusive use by one request)
//!     → guard dropped → release() → back to idle queue or discarded
//! ```
//!
//! # Design Decisions
//! - Exhaustion degrades to extra construction cost, never to an error
//! - Release is tied to guard drop so every exit path returns the session
//! - Only the drain-and-rebuild refresh is serialized; acquire/release are not

pub mod guard;
pub mod resource_pool;

pub use guard::PooledSession;
pub use resource_pool::{PoolStats, ResourcePool};
