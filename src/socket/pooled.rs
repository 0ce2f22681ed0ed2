//! The connection handed out by [`Pool::get`](crate::socket::pool::Pool::get).
//!
//! A `PooledConnection` reads and writes like the raw stream it wraps. What it
//! changes is Close: instead of tearing the stream down it offers it back to
//! the pool, and only hard-closes when the pool is gone, closed, full, or the
//! caller marked the connection unusable.

use crate::socket::pool::Shared;
use crate::socket::stream::{spawn_hard_close, StreamSocket};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::{Instant, Sleep};

/// A checked-out connection.
///
/// Dropping it has the same effect as [`close`](Self::close), except that any
/// hard close happens in a background task.
pub struct PooledConnection<S: StreamSocket> {
    /// `None` once closed
    stream: Option<S>,
    created_at: Instant,
    unusable: bool,
    /// Routes Close back to the owning pool; cleared on first Close
    pool: Option<Weak<Shared<S>>>,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<S: StreamSocket> PooledConnection<S> {
    pub(crate) fn new(stream: S, created_at: Instant, pool: Weak<Shared<S>>) -> Self {
        Self {
            stream: Some(stream),
            created_at,
            unusable: false,
            pool: Some(pool),
            read_deadline: None,
            write_deadline: None,
        }
    }

    /// Flag the connection as broken so it is hard-closed instead of reused.
    /// Sticky: it cannot be undone.
    pub fn mark_unusable(&mut self) {
        self.unusable = true;
    }

    pub fn is_unusable(&self) -> bool {
        self.unusable
    }

    /// True once the connection has been closed or returned.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// When the underlying connection was dialed.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get a reference to the raw stream, if not yet closed.
    pub fn inner(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// Get a mutable reference to the raw stream, if not yet closed.
    pub fn inner_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Set both the read and the write deadline.
    ///
    /// Once a deadline passes, reads or writes fail with
    /// [`io::ErrorKind::TimedOut`]. `None` clears it. Must be called from
    /// within a Tokio runtime.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    pub fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline = deadline.map(|d| Box::pin(tokio::time::sleep_until(d)));
    }

    pub fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.write_deadline = deadline.map(|d| Box::pin(tokio::time::sleep_until(d)));
    }

    /// Return the connection to the pool, or hard-close it.
    ///
    /// The connection is hard-closed instead when it was marked unusable or
    /// the pool is gone, closed, or full; in that case the result of shutting
    /// the stream down is returned. Calling `close` again does nothing.
    pub async fn close(&mut self) -> io::Result<()> {
        self.read_deadline = None;
        self.write_deadline = None;
        match self.release() {
            Some(mut stream) => stream.shutdown().await,
            None => Ok(()),
        }
    }

    /// Detach the stream and offer it to the pool.
    /// Returns the stream when the caller has to hard-close it.
    fn release(&mut self) -> Option<S> {
        let stream = self.stream.take()?;
        let Some(shared) = self.pool.take().and_then(|pool| pool.upgrade()) else {
            return Some(stream);
        };
        shared.stats.checkin();

        if self.unusable {
            tracing::debug!("closing connection marked unusable");
            shared.stats.record_hard_close();
            return Some(stream);
        }

        match shared.put(stream, self.created_at) {
            Ok(()) => {
                shared.stats.record_return();
                None
            }
            Err((stream, e)) => {
                tracing::debug!(error = %e, "connection not returned to pool");
                shared.stats.record_reject();
                shared.stats.record_hard_close();
                Some(stream)
            }
        }
    }

    fn poll_deadline(deadline: &mut Option<Pin<Box<Sleep>>>, cx: &mut Context<'_>) -> bool {
        match deadline {
            Some(sleep) => sleep.as_mut().poll(cx).is_ready(),
            None => false,
        }
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "pooled connection is closed")
}

fn timed_out(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{} deadline exceeded", op))
}

impl<S: StreamSocket> Drop for PooledConnection<S> {
    fn drop(&mut self) {
        if let Some(stream) = self.release() {
            spawn_hard_close(stream);
        }
    }
}

impl<S: StreamSocket> fmt::Debug for PooledConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("created_at", &self.created_at)
            .field("unusable", &self.unusable)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<S: StreamSocket> AsyncRead for PooledConnection<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if Self::poll_deadline(&mut this.read_deadline, cx) {
            return Poll::Ready(Err(timed_out("read")));
        }
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_read(cx, buf),
            None => Poll::Ready(Err(not_connected())),
        }
    }
}

impl<S: StreamSocket> AsyncWrite for PooledConnection<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if Self::poll_deadline(&mut this.write_deadline, cx) {
            return Poll::Ready(Err(timed_out("write")));
        }
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_write(cx, buf),
            None => Poll::Ready(Err(not_connected())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if Self::poll_deadline(&mut this.write_deadline, cx) {
            return Poll::Ready(Err(timed_out("write")));
        }
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_flush(cx),
            None => Poll::Ready(Err(not_connected())),
        }
    }

    /// Shuts down the write half. A half-closed stream cannot be reused, so
    /// this also marks the connection unusable.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.unusable = true;
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_shutdown(cx),
            None => Poll::Ready(Err(not_connected())),
        }
    }
}
