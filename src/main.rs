//! Stream resolution gateway.
//!
//! An HTTP service that turns stream page URLs into playable stream URLs
//! and online/offline status, with per-client rate limiting, a TTL result
//! cache and a pool of reusable resolver sessions.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ admission ──▶ handler
//!                     (request id,    (rate limit)     │
//!                      trace, cors)                    ▼
//!                                               RequestPipeline
//!                                          ┌───────────┼────────────┐
//!                                          ▼           ▼            ▼
//!                                     ResultCache  ResourcePool  Resolver
//!                                                   (sessions)  (streamlink,
//!                                                               blocking pool)
//!
//!     Cross-cutting: config (+ hot reload of route limits), logging,
//!     metrics, maintenance task, graceful shutdown
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use stream_gateway::config::watcher::ConfigWatcher;
use stream_gateway::config::{default_config, load_config};
use stream_gateway::lifecycle::{wait_for_signal, Shutdown};
use stream_gateway::observability::{logging, metrics};
use stream_gateway::resolver::StreamlinkCli;
use stream_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "stream-gateway")]
#[command(about = "HTTP gateway that resolves live stream URLs", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!("stream-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        pool_size = config.pool.size,
        rate_limit_enabled = config.rate_limit.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher stops when dropped, so it lives until main returns.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), Some(updates)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload unavailable");
                    (None, None)
                }
            }
        }
        None => (None, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let resolver = Arc::new(StreamlinkCli::new(config.resolver.executable.clone()));
    let server = HttpServer::new(config, resolver);

    let shutdown = Arc::new(Shutdown::new());
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, config_updates, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
