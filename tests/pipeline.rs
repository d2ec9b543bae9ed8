//! Pipeline behavior against a scripted resolver.

use std::sync::Arc;
use std::time::Duration;

use stream_gateway::pipeline::{Resolution, StreamState};
use stream_gateway::resolver::{ResolveError, ResolveFailure};
use stream_gateway::GatewayError;

mod common;

use common::{Behavior, FakeResolver, BLOCKED_URL, LIVE_URL, OFFLINE_URL};

fn urls(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_batch_isolates_browser_barrier() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    let results = pipeline
        .status_batch(&urls(&[LIVE_URL, BLOCKED_URL, OFFLINE_URL]), false)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, StreamState::Online);
    assert_eq!(results[0].title, "Speedrun night");

    assert_eq!(results[1].status, StreamState::Error);
    assert_eq!(results[1].url, BLOCKED_URL);
    let details = results[1].error_details.as_ref().unwrap();
    assert_eq!(details.kind, "browser_required");
    assert_eq!(details.message, "Kick requires browser automation");

    assert_eq!(results[2].status, StreamState::Offline);
    assert_eq!(resolver.calls(), 3);
}

#[tokio::test]
async fn test_resolve_hit_is_marked_cached() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    let first = pipeline.resolve(LIVE_URL, false).await.unwrap();
    let second = pipeline.resolve("twitch.tv/live_channel", false).await.unwrap();

    let (Resolution::Online(first), Resolution::Online(second)) = (first, second) else {
        panic!("expected online resolutions");
    };
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.best_quality, second.best_quality);
    assert_eq!(second.stream_types, vec!["HLS", "HTTP"]);
    assert_eq!(resolver.calls_for(LIVE_URL), 1);
    assert_eq!(pipeline.stats().cache.hits, 1);
}

#[tokio::test]
async fn test_bypass_cache_resolves_again() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    pipeline.resolve(LIVE_URL, false).await.unwrap();
    let fresh = pipeline.resolve(LIVE_URL, true).await.unwrap();

    let Resolution::Online(fresh) = fresh else {
        panic!("expected online resolution");
    };
    assert!(!fresh.cached);
    assert_eq!(resolver.calls_for(LIVE_URL), 2);
}

#[tokio::test]
async fn test_status_and_resolve_use_separate_keys() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    pipeline.resolve(LIVE_URL, false).await.unwrap();
    let statuses = pipeline.status_batch(&urls(&[LIVE_URL]), false).await.unwrap();

    assert!(!statuses[0].cached);
    assert_eq!(resolver.calls_for(LIVE_URL), 2);
    assert_eq!(pipeline.stats().cache.entries, 2);
}

#[tokio::test]
async fn test_offline_resolution() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver);

    let resolution = pipeline.resolve(OFFLINE_URL, false).await.unwrap();
    let Resolution::Offline(offline) = resolution else {
        panic!("expected offline resolution");
    };
    assert_eq!(offline.original_url, OFFLINE_URL);
    assert_eq!(offline.platform, "youtube");
}

#[tokio::test]
async fn test_failures_are_classified_and_cached() {
    let url = "https://twitch.tv/missing";
    let resolver = Arc::new(FakeResolver::new().with(url, Behavior::Fail(ResolveError::NoContent)));
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    for _ in 0..2 {
        let err = pipeline.resolve(url, false).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Resolve(ResolveFailure::NoStreams { .. })
        ));
    }
    assert_eq!(resolver.calls_for(url), 1);

    let unknown = pipeline.resolve("https://vimeo.com/123", false).await.unwrap_err();
    assert_eq!(unknown.kind(), "no_plugin");
}

#[tokio::test]
async fn test_batch_validation() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    let empty = pipeline.status_batch(&[], false).await.unwrap_err();
    assert!(matches!(empty, GatewayError::InvalidBatch(_)));

    let blanks = pipeline.status_batch(&urls(&["", "   "]), false).await.unwrap_err();
    assert_eq!(blanks.to_string(), "No valid URLs provided");

    let too_many: Vec<String> = (0..21).map(|i| format!("https://twitch.tv/c{}", i)).collect();
    let oversized = pipeline.status_batch(&too_many, false).await.unwrap_err();
    assert_eq!(oversized.to_string(), "Maximum 20 URLs per batch");

    assert_eq!(resolver.calls(), 0);
}

#[tokio::test]
async fn test_invalid_batch_item_becomes_error_entry() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    let results = pipeline
        .status_batch(&urls(&["https://example.com/live", " ", LIVE_URL]), false)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, StreamState::Error);
    assert_eq!(results[0].error, "Unsupported domain: example.com");
    assert_eq!(results[0].platform, "example");
    assert_eq!(results[1].status, StreamState::Online);
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn test_session_released_after_failure_and_panic() {
    let panicking = "https://twitch.tv/explodes";
    let resolver = Arc::new(FakeResolver::new().with(panicking, Behavior::Panic));
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());
    let capacity = pipeline.pool().capacity();

    let err = pipeline.resolve(BLOCKED_URL, false).await.unwrap_err();
    assert_eq!(err.kind(), "browser_required");
    assert_eq!(pipeline.pool().size(), capacity);

    let err = pipeline.resolve(panicking, false).await.unwrap_err();
    assert_eq!(err.kind(), "unexpected");
    assert_eq!(pipeline.pool().size(), capacity);

    // A panic inside a batch only affects its own entry.
    let results = pipeline
        .status_batch(&urls(&[panicking, LIVE_URL]), true)
        .await
        .unwrap();
    assert_eq!(results[0].status, StreamState::Error);
    assert!(results[0].error.starts_with("Unexpected error"));
    assert_eq!(results[1].status, StreamState::Online);
    assert_eq!(pipeline.pool().size(), capacity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolutions_share_the_pool() {
    let slow: Vec<String> = (0..4).map(|i| format!("https://twitch.tv/slow{}", i)).collect();
    let mut resolver = FakeResolver::new();
    for url in &slow {
        resolver = resolver.with(url, Behavior::Slow(Duration::from_millis(50)));
    }
    let resolver = Arc::new(resolver);
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    let results = pipeline.status_batch(&slow, false).await.unwrap();

    assert!(results.iter().all(|s| s.status == StreamState::Online));
    let stats = pipeline.stats();
    assert_eq!(stats.pool.overflow_created, 0);
    assert_eq!(stats.pool.idle, stats.pool.capacity);
    assert_eq!(resolver.calls(), 4);
}

#[tokio::test]
async fn test_platform_hints_only_for_twitch() {
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&common::test_config(), resolver.clone());

    pipeline.resolve(OFFLINE_URL, false).await.unwrap();
    assert_eq!(resolver.low_latency_calls(), 0);

    pipeline.resolve(LIVE_URL, false).await.unwrap();
    assert_eq!(resolver.low_latency_calls(), 1);
}

#[tokio::test]
async fn test_twitch_hints_do_not_stick_to_pooled_session() {
    let mut config = common::test_config();
    config.pool.size = 1;
    config.resolver.twitch_oauth_token = Some("secret".into());
    let resolver = Arc::new(FakeResolver::new());
    let pipeline = common::pipeline(&config, resolver.clone());

    pipeline.resolve(LIVE_URL, false).await.unwrap();
    pipeline.resolve(OFFLINE_URL, false).await.unwrap();
    pipeline.resolve(OFFLINE_URL, true).await.unwrap();

    assert_eq!(resolver.calls(), 3);
    assert_eq!(resolver.low_latency_calls(), 1);
    assert_eq!(resolver.oauth_header_calls(), 1);
    assert_eq!(pipeline.stats().pool.overflow_created, 0);
}

#[tokio::test]
async fn test_admit_denies_past_route_limit() {
    let config = common::config_with_route_limit("/resolve", 2, 60);
    let pipeline = common::pipeline(&config, Arc::new(FakeResolver::new()));

    assert!(pipeline.admit("203.0.113.1", "/resolve").is_ok());
    let second = pipeline.admit("203.0.113.1", "/resolve").unwrap();
    assert_eq!(second.remaining, 0);

    match pipeline.admit("203.0.113.1", "/resolve") {
        Err(GatewayError::RateLimited { retry_after }) => assert!((59..=61).contains(&retry_after)),
        other => panic!("expected rate limit, got {:?}", other),
    }

    // Other clients and routes are unaffected.
    assert!(pipeline.admit("203.0.113.2", "/resolve").is_ok());
    assert!(pipeline.admit("203.0.113.1", "/health").is_ok());
}
