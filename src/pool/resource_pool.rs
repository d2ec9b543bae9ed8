//! Bounded pool of reusable resources with periodic refresh.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::config::PoolConfig;
use crate::observability::metrics;
use crate::pool::guard::PooledSession;

type Factory<R> = Box<dyn Fn() -> R + Send + Sync>;

/// Snapshot of pool state for the stats endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub capacity: usize,
    pub overflow_created: u64,
    pub refreshes: u64,
    pub generation_age_secs: u64,
}

pub(crate) struct PoolShared<R> {
    idle: Mutex<VecDeque<R>>,
    available: Notify,
    capacity: usize,
    factory: Factory<R>,
    acquire_timeout: Duration,
    refresh_interval: Duration,
    created_at: Mutex<Instant>,
    refresh_lock: Mutex<()>,
    overflow_created: AtomicU64,
    refreshes: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R> PoolShared<R> {
    fn take_idle(&self) -> Option<R> {
        lock(&self.idle).pop_front()
    }

    /// Return a resource to the idle queue, or drop it if the queue is full.
    pub(crate) fn release(&self, resource: R) -> bool {
        let mut idle = lock(&self.idle);
        if idle.len() >= self.capacity {
            drop(idle);
            tracing::trace!("Pool full, discarding released resource");
            return false;
        }
        idle.push_back(resource);
        drop(idle);

        self.available.notify_one();
        true
    }
}

/// A bounded pool of expensive, reusable handles.
///
/// Cloning is cheap; clones share the same queue.
pub struct ResourcePool<R> {
    shared: Arc<PoolShared<R>>,
}

impl<R> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: Send + 'static> ResourcePool<R> {
    /// Create a pool and fill it with `config.size` resources.
    pub fn new<F>(config: &PoolConfig, factory: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        let capacity = config.size;
        let idle: VecDeque<R> = (0..capacity).map(|_| factory()).collect();

        tracing::info!(
            size = capacity,
            acquire_timeout_secs = config.acquire_timeout_secs,
            refresh_interval_secs = config.refresh_interval_secs,
            "Resource pool created"
        );

        Self {
            shared: Arc::new(PoolShared {
                idle: Mutex::new(idle),
                available: Notify::new(),
                capacity,
                factory: Box::new(factory),
                acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
                refresh_interval: Duration::from_secs(config.refresh_interval_secs),
                created_at: Mutex::new(Instant::now()),
                refresh_lock: Mutex::new(()),
                overflow_created: AtomicU64::new(0),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Check out a resource.
    ///
    /// Waits up to the configured timeout for an idle resource. On timeout a
    /// new unpooled resource is built instead, so this never fails.
    pub async fn acquire(&self) -> PooledSession<R> {
        self.refresh_if_stale();

        let deadline = Instant::now() + self.shared.acquire_timeout;
        loop {
            let notified = self.shared.available.notified();
            tokio::pin!(notified);
            // Register before looking at the queue so a release in between is not missed.
            notified.as_mut().enable();

            if let Some(resource) = self.shared.take_idle() {
                return PooledSession::new(resource, self.shared.clone(), false);
            }

            if timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }

        // A release can land right at the deadline.
        if let Some(resource) = self.shared.take_idle() {
            return PooledSession::new(resource, self.shared.clone(), false);
        }

        self.shared.overflow_created.fetch_add(1, Ordering::Relaxed);
        metrics::record_pool_overflow();
        tracing::warn!(
            timeout_secs = self.shared.acquire_timeout.as_secs(),
            "Pool exhausted, creating overflow resource"
        );
        PooledSession::new((self.shared.factory)(), self.shared.clone(), true)
    }

    /// Return a resource to the pool. Returns false if it was discarded.
    pub fn release(&self, resource: R) -> bool {
        self.shared.release(resource)
    }

    /// Number of idle resources.
    pub fn size(&self) -> usize {
        lock(&self.shared.idle).len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.size(),
            capacity: self.shared.capacity,
            overflow_created: self.shared.overflow_created.load(Ordering::Relaxed),
            refreshes: self.shared.refreshes.load(Ordering::Relaxed),
            generation_age_secs: self.generation_age().as_secs(),
        }
    }

    fn generation_age(&self) -> Duration {
        Instant::now().saturating_duration_since(*lock(&self.shared.created_at))
    }

    fn is_stale(&self) -> bool {
        self.generation_age() > self.shared.refresh_interval
    }

    /// Replace the idle generation if it has outlived the refresh interval.
    ///
    /// Concurrent callers that find a refresh in progress carry on with the
    /// current queue instead of waiting for it.
    pub fn refresh_if_stale(&self) -> bool {
        if !self.is_stale() {
            return false;
        }

        let Ok(_refreshing) = self.shared.refresh_lock.try_lock() else {
            return false;
        };
        if !self.is_stale() {
            return false;
        }

        let fresh: VecDeque<R> = (0..self.shared.capacity)
            .map(|_| (self.shared.factory)())
            .collect();
        let discarded = std::mem::replace(&mut *lock(&self.shared.idle), fresh).len();
        *lock(&self.shared.created_at) = Instant::now();

        self.shared.available.notify_waiters();
        self.shared.refreshes.fetch_add(1, Ordering::Relaxed);
        metrics::record_pool_refresh();
        tracing::info!(discarded, size = self.shared.capacity, "Resource pool refreshed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn config(size: usize) -> PoolConfig {
        PoolConfig {
            size,
            acquire_timeout_secs: 5,
            refresh_interval_secs: 3600,
        }
    }

    fn counting_pool(size: usize) -> (ResourcePool<usize>, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let pool = ResourcePool::new(&config(size), move || counter.fetch_add(1, Ordering::SeqCst));
        (pool, built)
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_up_to_capacity_without_overflow() {
        let (pool, built) = counting_pool(3);
        assert_eq!(pool.size(), 3);

        let a = pool.acquire().await;
        let b = pool.acquire().await;
        let c = pool.acquire().await;

        assert_eq!(pool.size(), 0);
        assert!(!a.is_overflow() && !b.is_overflow() && !c.is_overflow());
        assert_eq!(built.load(Ordering::SeqCst), 3);
        assert_eq!(pool.stats().overflow_created, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_pool_falls_back_to_overflow() {
        let (pool, built) = counting_pool(3);
        let held: Vec<_> = vec![pool.acquire().await, pool.acquire().await, pool.acquire().await];

        let started = Instant::now();
        let fourth = pool.acquire().await;

        assert!(fourth.is_overflow());
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(built.load(Ordering::SeqCst), 4);
        assert_eq!(pool.stats().overflow_created, 1);

        drop(held);
        assert_eq!(pool.size(), 3);
        // The overflow resource finds the queue full and is discarded.
        drop(fourth);
        assert_eq!(pool.size(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_receives_released_resource() {
        let (pool, _) = counting_pool(1);
        let held = pool.acquire().await;

        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(held);
        });

        let next = pool.acquire().await;
        assert!(!next.is_overflow());
        releaser.await.unwrap();
    }

    #[test]
    fn test_release_into_full_pool_discards() {
        let (pool, _) = counting_pool(2);
        assert!(!pool.release(42));
        assert_eq!(pool.size(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_refreshed_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let pool = ResourcePool::new(
            &PoolConfig {
                size: 2,
                acquire_timeout_secs: 5,
                refresh_interval_secs: 60,
            },
            move || counter.fetch_add(1, Ordering::SeqCst),
        );
        let checked_out = pool.acquire().await;
        assert_eq!(*checked_out, 0);

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = pool.acquire().await;
        assert!(*fresh >= 2, "expected a new generation, got {}", *fresh);
        assert!(!pool.refresh_if_stale());
        assert_eq!(pool.stats().refreshes, 1);
        assert_eq!(built.load(Ordering::SeqCst), 4);

        // The pre-refresh resource is discarded: the queue is full again.
        drop(fresh);
        drop(checked_out);
        assert_eq!(pool.size(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsignalled_release_is_found_at_deadline() {
        let (pool, built) = counting_pool(1);
        let held = pool.acquire().await;

        // Queue a resource without waking the waiter, as when a release races
        // the deadline.
        let shared = pool.shared.clone();
        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            lock(&shared.idle).push_back(99);
        });

        let next = pool.acquire().await;
        releaser.await.unwrap();
        assert_eq!(*next, 99);
        assert!(!next.is_overflow());
        assert_eq!(pool.stats().overflow_created, 0);
        assert_eq!(built.load(Ordering::SeqCst), 1);
        drop(held);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stale_acquires_refresh_once() {
        let size = 4;
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let pool = ResourcePool::new(
            &PoolConfig {
                size,
                acquire_timeout_secs: 5,
                refresh_interval_secs: 1,
            },
            move || counter.fetch_add(1, Ordering::SeqCst),
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let barrier = Arc::new(tokio::sync::Barrier::new(size));
        let tasks: Vec<_> = (0..size)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    pool.acquire().await
                })
            })
            .collect();

        let mut held = Vec::new();
        for task in tasks {
            held.push(task.await.unwrap());
        }

        let stats = pool.stats();
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.overflow_created, 0);
        assert_eq!(built.load(Ordering::SeqCst), 2 * size);
        assert!(held.iter().all(|session| !session.is_overflow()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_release_keeps_capacity() {
        let (pool, _) = counting_pool(3);

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let session = pool.acquire().await;
                    tokio::task::yield_now().await;
                    drop(session);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(pool.size(), 3);
    }
}
