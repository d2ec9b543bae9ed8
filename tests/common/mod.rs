//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stream_gateway::config::{GatewayConfig, RouteLimitConfig};
use stream_gateway::resolver::{
    OptionValue, ResolveError, Resolver, ResolverSession, StreamMetadata, StreamVariant,
};
use stream_gateway::RequestPipeline;

pub const LIVE_URL: &str = "https://twitch.tv/live_channel";
pub const OFFLINE_URL: &str = "https://youtube.com/@sleeping";
pub const BLOCKED_URL: &str = "https://kick.com/guarded";

/// What the fake resolver does for one URL.
#[derive(Clone)]
pub enum Behavior {
    Live,
    Offline,
    Fail(ResolveError),
    Panic,
    Slow(Duration),
}

/// Scripted resolver. URLs without a script fail with `NoHandler`.
#[derive(Default)]
pub struct FakeResolver {
    script: HashMap<String, Behavior>,
    calls: AtomicUsize,
    low_latency_sessions: AtomicUsize,
    oauth_header_sessions: AtomicUsize,
    calls_by_url: Mutex<HashMap<String, usize>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
            .with(LIVE_URL, Behavior::Live)
            .with(OFFLINE_URL, Behavior::Offline)
            .with(
                BLOCKED_URL,
                Behavior::Fail(ResolveError::Handler(
                    "Unable to open URL: 403 blocked by Cloudflare".into(),
                )),
            )
    }

    pub fn with(mut self, url: &str, behavior: Behavior) -> Self {
        self.script.insert(url.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls_by_url
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Calls made with the low-latency option set on the session.
    pub fn low_latency_calls(&self) -> usize {
        self.low_latency_sessions.load(Ordering::SeqCst)
    }

    /// Calls made on a session carrying a Twitch OAuth header.
    pub fn oauth_header_calls(&self) -> usize {
        self.oauth_header_sessions.load(Ordering::SeqCst)
    }
}

pub fn live_metadata(url: &str) -> StreamMetadata {
    let mut streams = BTreeMap::new();
    for (name, kind) in [("best", "hls"), ("720p", "hls"), ("audio_only", "http")] {
        streams.insert(
            name.to_string(),
            StreamVariant {
                kind: kind.to_string(),
                url: format!("https://cdn.example/{}/{}.m3u8", url.len(), name),
            },
        );
    }
    StreamMetadata {
        handler: "twitch".into(),
        title: Some("Speedrun night".into()),
        author: Some("live_channel".into()),
        category: Some("Games".into()),
        id: Some("42".into()),
        thumbnail: None,
        streams,
    }
}

impl Resolver for FakeResolver {
    fn resolve(&self, session: &ResolverSession, url: &str) -> Result<StreamMetadata, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_url
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;
        if session.option("twitch-low-latency") == Some(&OptionValue::Flag(true)) {
            self.low_latency_sessions.fetch_add(1, Ordering::SeqCst);
        }
        if session.option("twitch-api-header").is_some() {
            self.oauth_header_sessions.fetch_add(1, Ordering::SeqCst);
        }

        match self.script.get(url) {
            Some(Behavior::Live) => Ok(live_metadata(url)),
            Some(Behavior::Offline) => Ok(StreamMetadata {
                handler: "youtube".into(),
                ..StreamMetadata::default()
            }),
            Some(Behavior::Fail(error)) => Err(error.clone()),
            Some(Behavior::Panic) => panic!("resolver blew up on {}", url),
            Some(Behavior::Slow(delay)) => {
                std::thread::sleep(*delay);
                Ok(live_metadata(url))
            }
            None => Err(ResolveError::NoHandler(url.to_string())),
        }
    }
}

/// Defaults with a small pool and quick acquire timeout.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.pool.size = 2;
    config.pool.acquire_timeout_secs = 1;
    config
}

/// Test config with one tight route limit.
pub fn config_with_route_limit(path: &str, max_requests: u32, window_secs: i64) -> GatewayConfig {
    let mut config = test_config();
    config.rate_limit.routes.retain(|route| route.path != path);
    config.rate_limit.routes.push(RouteLimitConfig {
        path: path.to_string(),
        max_requests,
        window_secs,
    });
    config
}

pub fn pipeline(config: &GatewayConfig, resolver: Arc<FakeResolver>) -> RequestPipeline {
    RequestPipeline::from_config(config, resolver)
}
