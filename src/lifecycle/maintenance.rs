//! Periodic background maintenance.
//!
//! # Responsibilities
//! - Purge expired cache entries that nobody reads again
//! - Sweep rate-limit keys with no recent samples
//!
//! Lookups already expire entries lazily; this task only bounds memory for
//! keys that are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::pipeline::RequestPipeline;

pub struct Maintenance {
    pipeline: Arc<RequestPipeline>,
    interval: Duration,
}

impl Maintenance {
    pub fn new(pipeline: Arc<RequestPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Maintenance task starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Maintenance task received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One maintenance pass. Returns the number of purged cache entries.
    pub fn run_once(&self) -> usize {
        let purged = self.pipeline.cache().purge_expired();
        self.pipeline.limiter().sweep(Instant::now());

        tracing::debug!(
            purged,
            cache_entries = self.pipeline.cache().size(),
            rate_limit_keys = self.pipeline.limiter().tracked_keys(),
            "Maintenance pass complete"
        );
        purged
    }
}
