//! Per-pool counters.
//!
//! Each pool owns its own counters; there is no process-wide state.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    gets: AtomicU64,
    reused: AtomicU64,
    dialed: AtomicU64,
    dial_failures: AtomicU64,
    returned: AtomicU64,
    rejected: AtomicU64,
    hard_closed: AtomicU64,
    expired_on_get: AtomicU64,
    reaped_idle: AtomicU64,
    reaped_lifetime: AtomicU64,
    in_use: AtomicU64,
}

/// Point-in-time copy of a pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Calls to `get`
    pub gets: u64,
    /// `get` calls served from the free list
    pub reused: u64,
    /// Connections dialed by the factory, pre-warm included
    pub dialed: u64,
    /// Factory failures, pre-warm included
    pub dial_failures: u64,
    /// Connections handed back to the free list
    pub returned: u64,
    /// Returns refused because the pool was full or closed
    pub rejected: u64,
    /// Raw connections hard-closed by the pool or a wrapper
    pub hard_closed: u64,
    /// Connections discarded by `get` for exceeding `max_lifetime`
    pub expired_on_get: u64,
    /// Connections evicted by the reaper for idling
    pub reaped_idle: u64,
    /// Connections evicted by the reaper for age
    pub reaped_lifetime: u64,
    /// Connections currently checked out
    pub in_use: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl PoolStats {
    counter! {
        record_get => gets,
        record_reuse => reused,
        record_dial => dialed,
        record_dial_failure => dial_failures,
        record_return => returned,
        record_reject => rejected,
        record_hard_close => hard_closed,
        record_expired_on_get => expired_on_get,
        record_reaped_idle => reaped_idle,
        record_reaped_lifetime => reaped_lifetime,
    }

    pub(crate) fn record_hard_closes(&self, count: u64) {
        self.hard_closed.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn checkout(&self) {
        self.in_use.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn checkin(&self) {
        // Saturating: the gauge never wraps below zero.
        let _ = self
            .in_use
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            dialed: self.dialed.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            hard_closed: self.hard_closed.load(Ordering::Relaxed),
            expired_on_get: self.expired_on_get.load(Ordering::Relaxed),
            reaped_idle: self.reaped_idle.load(Ordering::Relaxed),
            reaped_lifetime: self.reaped_lifetime.load(Ordering::Relaxed),
            in_use: self.in_use.load(Ordering::Relaxed),
        }
    }
}
