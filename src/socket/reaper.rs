//! Periodic eviction of expired idle connections.
//!
//! Each tick the reaper pops connections off the top of the free list while
//! they are past `max_lifetime`, or past `idle_timeout` with more than
//! `max_idle_count` idle. It stops on the signal sent by `Pool::close`, when
//! the stop sender is dropped with the pool, or when it finds the free list
//! already torn down.

use crate::socket::pool::Shared;
use crate::socket::stream::StreamSocket;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

pub(crate) fn spawn<S: StreamSocket>(
    pool: Weak<Shared<S>>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let Some(shared) = pool.upgrade() else { break };
                    if !shared.reap(Instant::now()) {
                        break;
                    }
                }
            }
        }

        tracing::debug!("reaper stopped");
    });
}
