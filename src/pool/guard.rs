//! RAII handle for a checked-out pool resource.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::pool::resource_pool::PoolShared;

/// Exclusive use of one pooled resource.
///
/// Dropping the guard releases the resource back to its pool, whether the
/// holder finished normally, returned an error or panicked.
pub struct PooledSession<R> {
    resource: Option<R>,
    pool: Arc<PoolShared<R>>,
    overflow: bool,
}

impl<R> PooledSession<R> {
    pub(crate) fn new(resource: R, pool: Arc<PoolShared<R>>, overflow: bool) -> Self {
        Self {
            resource: Some(resource),
            pool,
            overflow,
        }
    }

    /// True if this resource was built because the pool was exhausted.
    pub fn is_overflow(&self) -> bool {
        self.overflow
    }
}

impl<R> Deref for PooledSession<R> {
    type Target = R;

    fn deref(&self) -> &R {
        // Only `drop` takes the resource out.
        self.resource.as_ref().unwrap_or_else(|| unreachable!("pooled resource already released"))
    }
}

impl<R> DerefMut for PooledSession<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource.as_mut().unwrap_or_else(|| unreachable!("pooled resource already released"))
    }
}

impl<R> Drop for PooledSession<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource);
        }
    }
}

impl<R> std::fmt::Debug for PooledSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession")
            .field("overflow", &self.overflow)
            .finish_non_exhaustive()
    }
}
