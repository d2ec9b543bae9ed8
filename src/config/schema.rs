//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the stream gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, CORS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Result cache TTLs and maintenance.
    pub cache: CacheConfig,

    /// Resolver session pool.
    pub pool: PoolConfig,

    /// Resolver invocation settings.
    pub resolver: ResolverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Origins allowed by CORS. `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            shutdown_grace_secs: 10,
        }
    }
}

/// A `(max_requests, window_secs)` pair.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct LimitConfig {
    pub max_requests: u32,
    /// Negative values are clamped to zero.
    pub window_secs: i64,
}

/// A limit bound to a route (exact path or path prefix).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteLimitConfig {
    pub path: String,
    pub max_requests: u32,
    pub window_secs: i64,
}

impl RouteLimitConfig {
    fn new(path: &str, max_requests: u32, window_secs: i64) -> Self {
        Self {
            path: path.to_string(),
            max_requests,
            window_secs,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Limit for routes with no entry of their own.
    pub default: LimitConfig,

    /// Per-route limits.
    pub routes: Vec<RouteLimitConfig>,

    /// Minimum time between memory sweeps, in seconds.
    pub sweep_interval_secs: u64,

    /// Samples older than this are dropped by the sweep, in seconds.
    pub max_sample_age_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default: LimitConfig {
                max_requests: 100,
                window_secs: 60,
            },
            routes: vec![
                RouteLimitConfig::new("/resolve", 20, 60),
                RouteLimitConfig::new("/status-batch", 10, 60),
                RouteLimitConfig::new("/health", 200, 60),
                RouteLimitConfig::new("/cache/stats", 50, 60),
            ],
            sweep_interval_secs: 300,
            max_sample_age_secs: 3600,
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for successful full resolutions.
    pub resolve_ttl_secs: u64,

    /// TTL for successful status checks.
    pub status_ttl_secs: u64,

    /// TTL for offline / no-content results.
    pub offline_ttl_secs: u64,

    /// TTL for failed resolutions.
    pub error_ttl_secs: u64,

    /// Interval of the background purge of expired entries.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resolve_ttl_secs: 300,
            status_ttl_secs: 120,
            offline_ttl_secs: 60,
            error_ttl_secs: 30,
            sweep_interval_secs: 300,
        }
    }
}

/// Resolver session pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of pooled sessions.
    pub size: usize,

    /// How long to wait for an idle session before building an extra one.
    pub acquire_timeout_secs: u64,

    /// Age after which the whole idle generation is rebuilt.
    pub refresh_interval_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 3,
            acquire_timeout_secs: 5,
            refresh_interval_secs: 3600,
        }
    }
}

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Path or name of the `streamlink` executable.
    pub executable: String,

    /// User-Agent sent by every session.
    pub user_agent: String,

    /// Browser used by handlers that need one.
    pub webbrowser_executable: Option<String>,

    /// Per-request HTTP timeout passed to the resolver.
    pub http_timeout_secs: Option<u64>,

    /// OAuth token for Twitch (ad-free playback). Overridden by `TWITCH_OAUTH_TOKEN`.
    pub twitch_oauth_token: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            executable: "streamlink".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
            webbrowser_executable: None,
            http_timeout_secs: None,
            twitch_oauth_token: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
