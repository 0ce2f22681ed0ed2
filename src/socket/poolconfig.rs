//! Connection pool configuration.

use crate::base::poolerror::{PoolError, PoolResult};
use crate::socket::connect::Connect;
use crate::socket::stream::StreamSocket;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Smallest sweep period the reaper will run at.
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(1);

/// Pool sizing, eviction, and the factory used to dial new connections.
pub struct PoolConfig<S: StreamSocket> {
    /// Connections dialed in the background at construction (default: 5)
    pub initial_count: usize,
    /// Hard ceiling on idle connections held (default: 50)
    pub max_count: usize,
    /// Idle count above which idle-timeout eviction applies (default: 5)
    pub max_idle_count: usize,
    /// Idle duration after which a connection may be evicted (default: 2 minutes)
    pub idle_timeout: Duration,
    /// Hard age ceiling regardless of use (default: 15 minutes)
    pub max_lifetime: Duration,
    /// Pre-warm dials in flight at once (default: 8)
    pub prewarm_concurrency: usize,
    /// Dials new raw connections. Required.
    pub factory: Option<Arc<dyn Connect<S>>>,
}

impl<S: StreamSocket> Default for PoolConfig<S> {
    fn default() -> Self {
        Self {
            initial_count: 5,
            max_count: 50,
            max_idle_count: 5,
            idle_timeout: Duration::from_secs(2 * 60),
            max_lifetime: Duration::from_secs(15 * 60),
            prewarm_concurrency: 8,
            factory: None,
        }
    }
}

impl<S: StreamSocket> Clone for PoolConfig<S> {
    fn clone(&self) -> Self {
        Self {
            initial_count: self.initial_count,
            max_count: self.max_count,
            max_idle_count: self.max_idle_count,
            idle_timeout: self.idle_timeout,
            max_lifetime: self.max_lifetime,
            prewarm_concurrency: self.prewarm_concurrency,
            factory: self.factory.clone(),
        }
    }
}

impl<S: StreamSocket> fmt::Debug for PoolConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("initial_count", &self.initial_count)
            .field("max_count", &self.max_count)
            .field("max_idle_count", &self.max_idle_count)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .field("prewarm_concurrency", &self.prewarm_concurrency)
            .field("factory", &self.factory.as_ref().map(|_| "<connect>"))
            .finish()
    }
}

impl<S: StreamSocket> PoolConfig<S> {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of connections to pre-warm.
    pub fn initial_count(mut self, count: usize) -> Self {
        self.initial_count = count;
        self
    }

    /// Set the maximum number of idle connections held.
    pub fn max_count(mut self, count: usize) -> Self {
        self.max_count = count;
        self
    }

    /// Set the idle-count threshold for idle-timeout eviction.
    pub fn max_idle_count(mut self, count: usize) -> Self {
        self.max_idle_count = count;
        self
    }

    /// Set idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set max lifetime.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set how many pre-warm dials may run concurrently.
    pub fn prewarm_concurrency(mut self, concurrency: usize) -> Self {
        self.prewarm_concurrency = concurrency;
        self
    }

    /// Set the factory.
    pub fn factory<C: Connect<S>>(mut self, factory: C) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Check the invariants the pool relies on.
    pub fn validate(&self) -> PoolResult<()> {
        if self.factory.is_none() {
            return Err(PoolError::config("factory must be set"));
        }
        if self.max_count == 0 {
            return Err(PoolError::config("max_count must be at least 1"));
        }
        if self.initial_count > self.max_count {
            return Err(PoolError::config(format!(
                "initial_count ({}) exceeds max_count ({})",
                self.initial_count, self.max_count
            )));
        }
        if self.idle_timeout.is_zero() {
            return Err(PoolError::config("idle_timeout must be non-zero"));
        }
        if self.max_lifetime.is_zero() {
            return Err(PoolError::config("max_lifetime must be non-zero"));
        }
        if self.prewarm_concurrency == 0 {
            return Err(PoolError::config("prewarm_concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Period of the background eviction sweep: half the idle timeout.
    pub fn reap_interval(&self) -> Duration {
        (self.idle_timeout / 2).max(MIN_REAP_INTERVAL)
    }
}
