//! Bounded priority queue of idle connections.
//!
//! Ordering is least-recently-used first: the connection that has been idle
//! longest sits on top of the heap. `get` and the reaper both work from that
//! end, so once the top entry is not idle-expired no other entry is either.
//!
//! The same does not hold for `max_lifetime`, which is measured from
//! `created_at`: an old connection used recently sits below the top and can
//! survive several sweeps past its lifetime. `Pool::get` checks the age of
//! every candidate it pops, so such a connection is never handed out.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::time::Duration;
use tokio::time::Instant;

/// An idle connection and its timestamps.
#[derive(Debug)]
pub(crate) struct IdleConn<S> {
    pub(crate) stream: S,
    /// When the raw connection was dialed
    pub(crate) created_at: Instant,
    /// When the connection was last handed back to the pool
    pub(crate) last_used_at: Instant,
}

impl<S> IdleConn<S> {
    pub(crate) fn new(stream: S, created_at: Instant, last_used_at: Instant) -> Self {
        Self { stream, created_at, last_used_at }
    }

    pub(crate) fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used_at)
    }
}

impl<S> PartialEq for IdleConn<S> {
    fn eq(&self, other: &Self) -> bool {
        self.last_used_at == other.last_used_at && self.created_at == other.created_at
    }
}

impl<S> Eq for IdleConn<S> {}

impl<S> PartialOrd for IdleConn<S> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for IdleConn<S> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: least recently used ranks highest, older connection breaks ties
        match other.last_used_at.cmp(&self.last_used_at) {
            CmpOrdering::Equal => other.created_at.cmp(&self.created_at),
            other => other,
        }
    }
}

/// Why the reaper removed a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eviction {
    /// Older than `max_lifetime`
    Lifetime,
    /// Idle past `idle_timeout` while the pool held more than `max_idle_count`
    Idle,
}

/// Heap of idle connections, bounded by `capacity`.
#[derive(Debug)]
pub(crate) struct FreeList<S> {
    heap: BinaryHeap<IdleConn<S>>,
    capacity: usize,
}

impl<S> FreeList<S> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(capacity), capacity }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Insert an idle connection. Hands it back if the list is full.
    pub(crate) fn push(&mut self, conn: IdleConn<S>) -> Result<(), IdleConn<S>> {
        if self.is_full() {
            return Err(conn);
        }
        self.heap.push(conn);
        Ok(())
    }

    /// Remove the least recently used connection.
    pub(crate) fn pop(&mut self) -> Option<IdleConn<S>> {
        self.heap.pop()
    }

    /// Pop the top entry if it is due for eviction.
    ///
    /// Returns `None` as soon as the top entry is still good, ending the sweep.
    pub(crate) fn pop_expired(
        &mut self,
        now: Instant,
        idle_timeout: Duration,
        max_lifetime: Duration,
        max_idle_count: usize,
    ) -> Option<(IdleConn<S>, Eviction)> {
        let top = self.heap.peek()?;
        let reason = if top.age(now) > max_lifetime {
            Eviction::Lifetime
        } else if top.idle_for(now) > idle_timeout && self.heap.len() > max_idle_count {
            Eviction::Idle
        } else {
            return None;
        };
        self.heap.pop().map(|conn| (conn, reason))
    }

    /// Empty the list, returning every entry.
    pub(crate) fn drain(&mut self) -> Vec<IdleConn<S>> {
        self.heap.drain().collect()
    }
}
