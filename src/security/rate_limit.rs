//! Per-client, per-route sliding-window rate limiting.
//!
//! # Responsibilities
//! - Track request samples per `(client, route)` key
//! - Admit or deny a request against the route's limit
//! - Resolve the limit that applies to a route
//! - Bound memory with an amortized sweep of stale keys
//!
//! # Design Decisions
//! - Each key's window is mutated under its DashMap shard lock only, so checks
//!   on unrelated keys never serialize behind one global lock
//! - Samples are pruned on every check; the sweep only reclaims memory
//! - Route limits live behind `ArcSwap` so a config reload can replace them
//!   without touching the tracked windows

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Limit applied to one route: at most `max_requests` within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RouteLimit {
    /// Build a limit, clamping a negative window to zero.
    pub fn new(max_requests: u32, window_secs: i64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs.max(0) as u64),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// A limit that can never admit anything.
    fn is_degenerate(&self) -> bool {
        self.max_requests == 0 || self.window.is_zero()
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    /// Seconds until a retry can succeed. Zero when admitted.
    pub retry_after_secs: u64,
    pub limit: u32,
    /// Requests left in the current window after this check.
    pub remaining: u32,
    pub window_secs: u64,
}

/// Route limit table.
///
/// Resolution order: exact route match, longest matching prefix, default.
/// Prefixes of equal length are tie-broken lexically so the result never
/// depends on map iteration order.
#[derive(Debug, Clone)]
pub struct RouteLimits {
    routes: BTreeMap<String, RouteLimit>,
    default: RouteLimit,
}

impl RouteLimits {
    pub fn new(default: RouteLimit) -> Self {
        Self {
            routes: BTreeMap::new(),
            default,
        }
    }

    pub fn with_route(mut self, route: impl Into<String>, limit: RouteLimit) -> Self {
        self.routes.insert(route.into(), limit);
        self
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let default = RouteLimit::new(config.default.max_requests, config.default.window_secs);
        config.routes.iter().fold(Self::new(default), |limits, route| {
            limits.with_route(
                route.path.clone(),
                RouteLimit::new(route.max_requests, route.window_secs),
            )
        })
    }

    /// Find the limit for a route.
    pub fn resolve(&self, route: &str) -> RouteLimit {
        if let Some(limit) = self.routes.get(route) {
            return *limit;
        }

        self.routes
            .iter()
            .filter(|(prefix, _)| route.starts_with(prefix.as_str()))
            .min_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
            .map(|(_, limit)| *limit)
            .unwrap_or(self.default)
    }

    /// Longest window any route in the table uses.
    pub fn longest_window(&self) -> Duration {
        self.routes
            .values()
            .map(|limit| limit.window)
            .fold(self.default.window, Duration::max)
    }
}

type WindowKey = (String, String);

/// Ordered `(timestamp, count)` samples for one key.
#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<(Instant, u32)>,
}

impl Window {
    /// Drop samples that are no longer younger than `max_age`.
    fn prune(&mut self, now: Instant, max_age: Duration) {
        while let Some((ts, _)) = self.samples.front() {
            if now.saturating_duration_since(*ts) < max_age {
                break;
            }
            self.samples.pop_front();
        }
    }

    fn count(&self) -> u32 {
        self.samples.iter().map(|(_, count)| *count).sum()
    }
}

/// Sliding-window rate limiter shared by all request tasks.
pub struct RateLimiter {
    windows: DashMap<WindowKey, Window>,
    limits: ArcSwap<RouteLimits>,
    last_sweep: Mutex<Instant>,
    sweep_interval: Duration,
    max_sample_age: Duration,
}

impl RateLimiter {
    pub fn new(limits: RouteLimits, sweep_interval: Duration, max_sample_age: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limits: ArcSwap::from_pointee(limits),
            last_sweep: Mutex::new(Instant::now()),
            sweep_interval,
            max_sample_age,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            RouteLimits::from_config(config),
            Duration::from_secs(config.sweep_interval_secs),
            Duration::from_secs(config.max_sample_age_secs),
        )
    }

    /// Limit that applies to `route` under the current table.
    pub fn limit_for(&self, route: &str) -> RouteLimit {
        self.limits.load().resolve(route)
    }

    /// Replace the route limit table (config reload).
    pub fn update_limits(&self, limits: RouteLimits) {
        self.limits.store(Arc::new(limits));
        tracing::info!("Rate limit table replaced");
    }

    /// Check and record one request for `(client_id, route_id)`.
    pub fn check(&self, client_id: &str, route_id: &str, limit: RouteLimit) -> RateLimitDecision {
        let now = Instant::now();
        self.maybe_sweep(now);

        if limit.is_degenerate() {
            return RateLimitDecision {
                admitted: false,
                retry_after_secs: limit.window_secs().max(1),
                limit: limit.max_requests,
                remaining: 0,
                window_secs: limit.window_secs(),
            };
        }

        let key = (client_id.to_string(), route_id.to_string());
        let mut window = self.windows.entry(key).or_default();

        window.prune(now, limit.window);
        let current = window.count();

        if current >= limit.max_requests {
            let retry_after_secs = window
                .samples
                .front()
                .map(|(oldest, _)| {
                    let reopens_at = *oldest + limit.window;
                    reopens_at.saturating_duration_since(now).as_secs() + 1
                })
                .unwrap_or(1)
                .max(1);

            return RateLimitDecision {
                admitted: false,
                retry_after_secs,
                limit: limit.max_requests,
                remaining: 0,
                window_secs: limit.window_secs(),
            };
        }

        window.samples.push_back((now, 1));

        RateLimitDecision {
            admitted: true,
            retry_after_secs: 0,
            limit: limit.max_requests,
            remaining: limit.max_requests.saturating_sub(current + 1),
            window_secs: limit.window_secs(),
        }
    }

    /// Number of `(client, route)` keys currently held in memory.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Run the memory sweep if the interval has elapsed and nobody else is.
    fn maybe_sweep(&self, now: Instant) {
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last_sweep) < self.sweep_interval {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        self.sweep(now);
    }

    /// Drop samples older than the maximum age and keys left empty.
    ///
    /// The cutoff never drops below the longest configured window, so a sample
    /// still counted by some route is never reclaimed.
    pub fn sweep(&self, now: Instant) {
        let max_age = self.max_sample_age.max(self.limits.load().longest_window());
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.prune(now, max_age);
            !window.samples.is_empty()
        });
        let after = self.windows.len();

        metrics::record_rate_limit_keys(after);
        tracing::debug!(removed = before - after, tracked = after, "Rate limiter sweep finished");
    }
}
