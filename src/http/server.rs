//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (admission, CORS, timeout, request ID, tracing)
//! - Start background tasks (cache maintenance, rate-limit reloads)
//! - Serve until shutdown, then drain within the grace period

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::middleware::rate_limit_middleware;
use crate::http::request::request_id;
use crate::http::response::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::lifecycle::{Maintenance, Shutdown};
use crate::pipeline::RequestPipeline;
use crate::resolver::Resolver;
use crate::security::rate_limit::RouteLimits;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub rate_limit_enabled: bool,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    pipeline: Arc<RequestPipeline>,
}

impl HttpServer {
    /// Create a server and all of its components from configuration.
    pub fn new(config: GatewayConfig, resolver: Arc<dyn Resolver>) -> Self {
        let pipeline = Arc::new(RequestPipeline::from_config(&config, resolver));
        Self::with_pipeline(config, pipeline)
    }

    /// Create a server around an existing pipeline.
    pub fn with_pipeline(config: GatewayConfig, pipeline: Arc<RequestPipeline>) -> Self {
        let state = AppState {
            pipeline: pipeline.clone(),
            rate_limit_enabled: config.rate_limit.enabled,
        };
        let router = Self::build_router(&config, state);

        Self {
            router,
            config,
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .route("/resolve", get(handlers::resolve))
            .route("/status-batch", post(handlers::status_batch))
            .route("/cache/stats", get(handlers::cache_stats))
            .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
            .with_state(state)
            .layer(cors_layer(&config.listener.allowed_origins))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Run the server until `shutdown` fires.
    ///
    /// `config_updates` carries reloaded configurations; only the rate-limit
    /// table is applied live.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let maintenance = Maintenance::new(
            self.pipeline.clone(),
            Duration::from_secs(self.config.cache.sweep_interval_secs),
        );
        tokio::spawn(maintenance.run(shutdown.subscribe()));

        if let Some(updates) = config_updates {
            tokio::spawn(apply_config_updates(
                self.pipeline.clone(),
                updates,
                shutdown.subscribe(),
            ));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("HTTP server draining in-flight requests");
            })
            .into_future();
        tokio::pin!(server);

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let mut deadline = shutdown.subscribe();

        tokio::select! {
            result = &mut server => result?,
            _ = async move {
                let _ = deadline.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, abandoning in-flight requests");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            X_RATELIMIT_LIMIT,
            X_RATELIMIT_REMAINING,
            X_RATELIMIT_RESET,
            header::RETRY_AFTER,
        ])
}

/// Swap in the rate-limit table of every reloaded configuration.
async fn apply_config_updates(
    pipeline: Arc<RequestPipeline>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    pipeline
                        .limiter()
                        .update_limits(RouteLimits::from_config(&config.rate_limit));
                    tracing::info!(
                        "Config reloaded; listener, pool and cache settings apply after restart"
                    );
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Config update task stopped");
}
