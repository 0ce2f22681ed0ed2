use crate::base::poolerror::{PoolError, PoolResult};
use crate::socket::connect::Connect;
use crate::socket::freelist::{Eviction, FreeList, IdleConn};
use crate::socket::poolconfig::PoolConfig;
use crate::socket::poolstats::{PoolStats, PoolStatsSnapshot};
use crate::socket::pooled::PooledConnection;
use crate::socket::prewarm;
use crate::socket::reaper;
use crate::socket::stream::{hard_close, spawn_hard_close, StreamSocket};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Everything guarded by the pool lock.
struct State<S: StreamSocket> {
    /// `None` once the pool is closed
    free: Option<FreeList<S>>,
    /// Cleared on close
    factory: Option<Arc<dyn Connect<S>>>,
    /// Dropping or sending stops the reaper
    reaper_stop: Option<oneshot::Sender<()>>,
}

/// State shared between pool handles, checked-out connections, and the
/// background tasks. Connections and tasks only hold `Weak` references.
pub(crate) struct Shared<S: StreamSocket> {
    state: Mutex<State<S>>,
    max_count: usize,
    max_idle_count: usize,
    idle_timeout: Duration,
    max_lifetime: Duration,
    pub(crate) stats: PoolStats,
}

impl<S: StreamSocket> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, State<S>> {
        // No critical section can leave the heap half-updated, so a poisoned
        // lock still guards consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a raw connection to a caller.
    fn checkout(self: &Arc<Self>, stream: S, created_at: Instant) -> PooledConnection<S> {
        self.stats.checkout();
        PooledConnection::new(stream, created_at, Arc::downgrade(self))
    }

    /// False once `close` has dropped the factory.
    pub(crate) fn accepting_dials(&self) -> bool {
        self.lock().factory.is_some()
    }

    /// Return an idle connection to the free list.
    ///
    /// On failure the stream is handed back and the caller must hard-close it.
    pub(crate) fn put(&self, stream: S, created_at: Instant) -> Result<(), (S, PoolError)> {
        let mut state = self.lock();
        let Some(free) = state.free.as_mut() else {
            return Err((stream, PoolError::Closed));
        };
        free.push(IdleConn::new(stream, created_at, Instant::now()))
            .map_err(|rejected| (rejected.stream, PoolError::Full))
    }

    /// One reaper sweep. Returns `false` once the pool is closed.
    pub(crate) fn reap(&self, now: Instant) -> bool {
        let evicted = {
            let mut state = self.lock();
            let Some(free) = state.free.as_mut() else {
                return false;
            };
            let mut evicted = Vec::new();
            while let Some(entry) =
                free.pop_expired(now, self.idle_timeout, self.max_lifetime, self.max_idle_count)
            {
                evicted.push(entry);
            }
            evicted
        };

        for (conn, reason) in evicted {
            match reason {
                Eviction::Lifetime => self.stats.record_reaped_lifetime(),
                Eviction::Idle => self.stats.record_reaped_idle(),
            }
            tracing::debug!(
                ?reason,
                age = ?conn.age(now),
                idle = ?conn.idle_for(now),
                "reaper evicted connection"
            );
            self.stats.record_hard_close();
            spawn_hard_close(conn.stream);
        }
        true
    }
}

/// A pool of reusable connections to a single backend.
///
/// Cloning is cheap and every clone refers to the same pool.
pub struct Pool<S: StreamSocket> {
    shared: Arc<Shared<S>>,
}

impl<S: StreamSocket> Clone for Pool<S> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<S: StreamSocket> fmt::Debug for Pool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("max_count", &self.shared.max_count)
            .field("idle", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<S: StreamSocket> Pool<S> {
    /// Validate `config`, then start pre-warming and the reaper.
    ///
    /// Returns as soon as the background work is scheduled; the pre-warmed
    /// connections show up in [`len`](Self::len) as their dials complete.
    /// Must be called from within a Tokio runtime.
    pub fn new(config: PoolConfig<S>) -> PoolResult<Self> {
        config.validate()?;
        let Some(factory) = config.factory.clone() else {
            return Err(PoolError::config("factory must be set"));
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                free: Some(FreeList::with_capacity(config.max_count)),
                factory: Some(Arc::clone(&factory)),
                reaper_stop: Some(stop_tx),
            }),
            max_count: config.max_count,
            max_idle_count: config.max_idle_count,
            idle_timeout: config.idle_timeout,
            max_lifetime: config.max_lifetime,
            stats: PoolStats::default(),
        });

        if config.initial_count > 0 {
            tokio::spawn(prewarm::prewarm(
                Arc::downgrade(&shared),
                factory,
                config.initial_count,
                config.prewarm_concurrency,
            ));
        }
        reaper::spawn(Arc::downgrade(&shared), config.reap_interval(), stop_rx);

        tracing::info!(
            initial_count = config.initial_count,
            max_count = config.max_count,
            max_idle_count = config.max_idle_count,
            idle_timeout = ?config.idle_timeout,
            max_lifetime = ?config.max_lifetime,
            "connection pool created"
        );
        Ok(Self { shared })
    }

    /// Check out a connection.
    ///
    /// Reuses the least recently used idle connection, discarding any that
    /// have outlived `max_lifetime`. Dials a new one through the factory when
    /// none are left; the factory runs without the pool lock held and its
    /// error is returned as [`PoolError::Factory`].
    pub async fn get(&self) -> PoolResult<PooledConnection<S>> {
        self.shared.stats.record_get();

        let factory = {
            let mut state = self.shared.lock();
            let free = state.free.as_mut().ok_or(PoolError::Closed)?;
            let now = Instant::now();

            while let Some(conn) = free.pop() {
                if conn.age(now) > self.shared.max_lifetime {
                    tracing::debug!(age = ?conn.age(now), "discarding expired connection");
                    self.shared.stats.record_expired_on_get();
                    self.shared.stats.record_hard_close();
                    spawn_hard_close(conn.stream);
                    continue;
                }
                self.shared.stats.record_reuse();
                return Ok(self.shared.checkout(conn.stream, conn.created_at));
            }

            let factory = state.factory.clone();
            drop(state);
            factory.ok_or(PoolError::Closed)?
        };

        match factory.connect().await {
            Ok(stream) => {
                self.shared.stats.record_dial();
                tracing::debug!("dialed new connection");
                Ok(self.shared.checkout(stream, Instant::now()))
            }
            Err(e) => {
                self.shared.stats.record_dial_failure();
                tracing::debug!(error = %e, "factory failed to dial");
                Err(PoolError::Factory(e))
            }
        }
    }

    /// Close the pool. Idempotent.
    ///
    /// Stops the reaper, drops the factory, and hard-closes every idle
    /// connection before returning. Connections checked out at this point are
    /// hard-closed when their holders release them.
    pub async fn close(&self) {
        let drained = {
            let mut state = self.shared.lock();
            if state.free.is_none() {
                return;
            }
            if let Some(stop) = state.reaper_stop.take() {
                let _ = stop.send(());
            }
            state.factory = None;
            let drained = state.free.as_mut().map(FreeList::drain).unwrap_or_default();
            state.free = None;
            drained
        };

        let count = drained.len();
        self.shared.stats.record_hard_closes(count as u64);
        futures::future::join_all(drained.into_iter().map(|conn| hard_close(conn.stream))).await;
        tracing::info!(closed = count, "connection pool closed");
    }

    /// Number of idle connections held.
    pub fn len(&self) -> usize {
        self.shared.lock().free.as_ref().map_or(0, FreeList::len)
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().free.as_ref().map_or(true, FreeList::is_empty)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().free.is_none()
    }

    /// Ceiling on idle connections.
    pub fn max_count(&self) -> usize {
        self.shared.max_count
    }

    /// Snapshot of this pool's counters.
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.shared.stats.snapshot()
    }
}
