//! Cache key namespacing and TTL selection.

use std::fmt;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cache key for a normalized URL, namespaced by operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full resolution including playback URLs.
    Resolve(String),
    /// Lightweight online/offline status.
    Status(String),
}

impl CacheKey {
    pub fn url(&self) -> &str {
        match self {
            CacheKey::Resolve(url) | CacheKey::Status(url) => url,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Resolve(url) => write!(f, "resolve:{}", url),
            CacheKey::Status(url) => write!(f, "status:{}", url),
        }
    }
}

/// Outcome class used to pick a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedOutcome {
    Online,
    Offline,
    Failed,
}

/// TTLs per operation and outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub resolve_online: Duration,
    pub status_online: Duration,
    pub offline: Duration,
    pub error: Duration,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            resolve_online: Duration::from_secs(config.resolve_ttl_secs),
            status_online: Duration::from_secs(config.status_ttl_secs),
            offline: Duration::from_secs(config.offline_ttl_secs),
            error: Duration::from_secs(config.error_ttl_secs),
        }
    }

    pub fn ttl_for(&self, key: &CacheKey, outcome: CachedOutcome) -> Duration {
        match (key, outcome) {
            (CacheKey::Resolve(_), CachedOutcome::Online) => self.resolve_online,
            (CacheKey::Status(_), CachedOutcome::Online) => self.status_online,
            (_, CachedOutcome::Offline) => self.offline,
            (_, CachedOutcome::Failed) => self.error,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
