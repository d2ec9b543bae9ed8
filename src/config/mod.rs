//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment
//!     → loader.rs (parse, deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared by value/Arc with all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → rate limit table swapped in place
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only route limits are hot-reloadable
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::{
    CacheConfig, GatewayConfig, LimitConfig, ListenerConfig, ObservabilityConfig, PoolConfig,
    RateLimitConfig, ResolverConfig, RouteLimitConfig, TimeoutConfig,
};
