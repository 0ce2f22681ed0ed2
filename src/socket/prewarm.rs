//! Background pre-warming of a new pool.
//!
//! Dials `initial_count` connections with bounded concurrency and inserts
//! each into the free list as soon as it completes. Dial failures only cost
//! the pool a warm connection; they are logged and otherwise ignored.
//! Closing the pool stops further dials; one already in flight is
//! hard-closed when it lands.

use crate::socket::connect::Connect;
use crate::socket::pool::Shared;
use crate::socket::stream::{spawn_hard_close, StreamSocket};
use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Weak};
use tokio::time::Instant;

pub(crate) async fn prewarm<S: StreamSocket>(
    pool: Weak<Shared<S>>,
    factory: Arc<dyn Connect<S>>,
    count: usize,
    concurrency: usize,
) {
    tracing::debug!(count, concurrency, "prewarming pool");

    // The source is pulled lazily, so no new dial starts once the pool closes.
    let mut dials = stream::iter(0..count)
        .take_while(|_| future::ready(pool.upgrade().map_or(false, |shared| shared.accepting_dials())))
        .map(|_| factory.connect())
        .buffer_unordered(concurrency);

    let mut created = 0usize;
    let mut failed = 0usize;
    while let Some(result) = dials.next().await {
        let Some(shared) = pool.upgrade() else {
            tracing::debug!("pool dropped during prewarm");
            return;
        };

        match result {
            Ok(stream) => {
                shared.stats.record_dial();
                match shared.put(stream, Instant::now()) {
                    Ok(()) => created += 1,
                    Err((stream, e)) => {
                        tracing::debug!(error = %e, "discarding prewarmed connection");
                        shared.stats.record_hard_close();
                        spawn_hard_close(stream);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                shared.stats.record_dial_failure();
                tracing::warn!(error = %e, "prewarm dial failed");
            }
        }
    }

    tracing::info!(created, failed, requested = count, "pool prewarm complete");
}
