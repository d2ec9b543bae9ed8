//! Request pipeline: admission, caching and pooled resolution.
//!
//! # Data Flow
//! ```text
//! admit(client, route)
//!     → RateLimiter.check (denied → GatewayError::RateLimited)
//!
//! resolve(url) / check_status(url)
//!     → normalize_url
//!     → ResultCache.get ("resolve:<url>" / "status:<url>")  hit → marked cached
//!     → ResourcePool.acquire
//!     → Resolver.resolve on the blocking pool
//!     → classify outcome
//!     → ResultCache.set with the TTL for that outcome
//!     → session released when its guard drops
//! ```
//!
//! # Design Decisions
//! - Failures are cached too, with shorter TTLs, so a broken URL does not
//!   hammer the resolver
//! - The session guard moves into the blocking closure; a panic there still
//!   returns the session to the pool during unwinding
//! - A batch never fails because of one item

pub mod types;

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use serde::Serialize;

use crate::cache::{CacheKey, CacheStats, CachedOutcome, ResultCache, TtlPolicy};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::platform::{normalize_url, platform_from_url, NormalizedUrl};
use crate::pool::{PoolStats, ResourcePool};
use crate::resolver::session::apply_platform_hints;
use crate::resolver::{classify, ResolveError, ResolveFailure, Resolver, ResolverSession, StreamMetadata};
use crate::security::rate_limit::{RateLimitDecision, RateLimiter};

pub use types::{CachedValue, ErrorDetails, OfflineStream, Resolution, StreamDetails, StreamState, StreamStatus};

/// Largest accepted `/status-batch` request.
pub const MAX_BATCH_SIZE: usize = 20;

/// Snapshot served by `/cache/stats`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineStats {
    pub cache: CacheStats,
    pub pool: PoolStats,
    pub rate_limit_keys: usize,
}

pub struct RequestPipeline {
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache<CachedValue>>,
    pool: ResourcePool<ResolverSession>,
    resolver: Arc<dyn Resolver>,
    ttl: TtlPolicy,
    twitch_oauth_token: Option<String>,
}

impl RequestPipeline {
    pub fn new(
        limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache<CachedValue>>,
        pool: ResourcePool<ResolverSession>,
        resolver: Arc<dyn Resolver>,
        ttl: TtlPolicy,
    ) -> Self {
        Self {
            limiter,
            cache,
            pool,
            resolver,
            ttl,
            twitch_oauth_token: None,
        }
    }

    /// Build every component from configuration.
    pub fn from_config(config: &GatewayConfig, resolver: Arc<dyn Resolver>) -> Self {
        let resolver_config = config.resolver.clone();
        let pool = ResourcePool::new(&config.pool, move || ResolverSession::new(&resolver_config));

        Self::new(
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            Arc::new(ResultCache::new()),
            pool,
            resolver,
            TtlPolicy::from_config(&config.cache),
        )
        .with_twitch_oauth_token(config.resolver.twitch_oauth_token.clone())
    }

    pub fn with_twitch_oauth_token(mut self, token: Option<String>) -> Self {
        self.twitch_oauth_token = token;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<ResultCache<CachedValue>> {
        &self.cache
    }

    pub fn pool(&self) -> &ResourcePool<ResolverSession> {
        &self.pool
    }

    /// Admission check for one request from `client_id` on `route`.
    pub fn admit(&self, client_id: &str, route: &str) -> Result<RateLimitDecision, GatewayError> {
        let limit = self.limiter.limit_for(route);
        let decision = self.limiter.check(client_id, route, limit);

        if decision.admitted {
            Ok(decision)
        } else {
            tracing::warn!(
                client = %client_id,
                route = %route,
                retry_after = decision.retry_after_secs,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(route);
            Err(GatewayError::RateLimited {
                retry_after: decision.retry_after_secs,
            })
        }
    }

    /// Full resolution of one URL, including playback URLs.
    pub async fn resolve(&self, raw_url: &str, bypass_cache: bool) -> Result<Resolution, GatewayError> {
        let target = normalize_url(raw_url)?;
        let key = CacheKey::Resolve(target.url.clone());
        let cache_key = key.to_string();

        if bypass_cache {
            self.cache.invalidate(&cache_key);
        } else if let Some(CachedValue::Resolution(cached)) = self.cache.get(&cache_key) {
            tracing::debug!(url = %target.url, "Serving resolution from cache");
            return cached.map(Resolution::mark_cached).map_err(GatewayError::from);
        }

        let outcome = self
            .run_resolver(&target)
            .await
            .map(|metadata| Resolution::from_metadata(&target.url, &target.platform, metadata));

        let cached_outcome = match &outcome {
            Ok(resolution) if resolution.state() == StreamState::Online => CachedOutcome::Online,
            Ok(_) | Err(ResolveFailure::NoStreams { .. }) => CachedOutcome::Offline,
            Err(_) => CachedOutcome::Failed,
        };
        self.cache.set(
            cache_key,
            CachedValue::Resolution(outcome.clone()),
            self.ttl.ttl_for(&key, cached_outcome),
        );

        outcome.map_err(GatewayError::from)
    }

    /// Lightweight status of one normalized URL. Never fails.
    pub async fn check_status(&self, target: &NormalizedUrl, bypass_cache: bool) -> StreamStatus {
        let key = CacheKey::Status(target.url.clone());
        let cache_key = key.to_string();

        if bypass_cache {
            self.cache.invalidate(&cache_key);
        } else if let Some(CachedValue::Status(cached)) = self.cache.get(&cache_key) {
            return cached.mark_cached();
        }

        let status = match self.run_resolver(target).await {
            Ok(metadata) => StreamStatus::from_metadata(&target.url, &target.platform, metadata),
            Err(failure) => StreamStatus::from_failure(&target.url, &target.platform, &failure),
        };

        self.cache.set(
            cache_key,
            CachedValue::Status(status.clone()),
            self.ttl.ttl_for(&key, status.cache_outcome()),
        );
        status
    }

    /// Status of up to [`MAX_BATCH_SIZE`] URLs, checked concurrently.
    ///
    /// Blank entries are skipped. Entries that fail validation come back as
    /// error entries in place.
    pub async fn status_batch(
        &self,
        raw_urls: &[String],
        bypass_cache: bool,
    ) -> Result<Vec<StreamStatus>, GatewayError> {
        if raw_urls.is_empty() {
            return Err(GatewayError::InvalidBatch("URLs list cannot be empty".to_string()));
        }
        if raw_urls.len() > MAX_BATCH_SIZE {
            return Err(GatewayError::InvalidBatch(format!(
                "Maximum {} URLs per batch",
                MAX_BATCH_SIZE
            )));
        }

        let items: Vec<&str> = raw_urls
            .iter()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .collect();
        if items.is_empty() {
            return Err(GatewayError::InvalidBatch("No valid URLs provided".to_string()));
        }

        let targets: Vec<Result<NormalizedUrl, (String, String)>> = items
            .iter()
            .map(|raw| normalize_url(raw).map_err(|e| (raw.to_string(), e.to_string())))
            .collect();

        // Drop every stale entry before any item starts repopulating.
        if bypass_cache {
            for target in targets.iter().flatten() {
                self.cache.invalidate(&CacheKey::Status(target.url.clone()).to_string());
            }
        }

        tracing::info!(items = targets.len(), bypass_cache, "Checking stream batch");

        let checks = targets.iter().map(|target| async move {
            match target {
                Ok(target) => self.check_status(target, bypass_cache).await,
                Err((raw, message)) => StreamStatus::error(raw, &platform_from_url(raw), message.as_str()),
            }
        });
        Ok(join_all(checks).await)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            cache: self.cache.stats(),
            pool: self.pool.stats(),
            rate_limit_keys: self.limiter.tracked_keys(),
        }
    }

    /// Run the resolver for `target` on a pooled session.
    async fn run_resolver(&self, target: &NormalizedUrl) -> Result<StreamMetadata, ResolveFailure> {
        let session = self.pool.acquire().await;
        tracing::trace!(
            session = %session.id(),
            session_age_secs = session.age_secs(),
            url = %target.url,
            "Session checked out"
        );
        let resolver = self.resolver.clone();
        let url = target.url.clone();
        let platform = target.platform.clone();
        let token = self.twitch_oauth_token.clone();
        let start = Instant::now();

        let joined = tokio::task::spawn_blocking(move || {
            // Hints go on a per-call copy; the pooled session goes back untouched.
            let mut tuned = ResolverSession::clone(&session);
            if let Err(e) = apply_platform_hints(&mut tuned, &platform, token.as_deref()) {
                tracing::debug!(platform = %platform, error = %e, "Platform hints not applied");
            }
            let result = resolver.resolve(&tuned, &url);
            drop(session);
            result
        })
        .await;

        let result = joined.unwrap_or_else(|e| {
            tracing::error!(url = %target.url, error = %e, "Resolver task failed");
            Err(ResolveError::Unexpected(format!("resolver task failed: {}", e)))
        });

        let outcome = result.map_err(|e| classify(e, &target.url, &target.platform));
        let label = match &outcome {
            Ok(_) => "success",
            Err(failure) => failure.kind(),
        };
        metrics::record_resolution(label, start);

        match &outcome {
            Ok(metadata) => tracing::debug!(
                url = %target.url,
                streams = metadata.streams.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Resolved"
            ),
            Err(failure) => tracing::warn!(
                url = %target.url,
                kind = failure.kind(),
                error = %failure,
                "Resolution failed"
            ),
        }
        outcome
    }
}
