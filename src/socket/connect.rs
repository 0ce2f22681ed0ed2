//! The factory abstraction used by the pool to dial new connections.

use crate::socket::stream::StreamSocket;
use std::{fmt, future::Future, io, pin::Pin, sync::Arc};

/// Alias for the `Future` type returned by a connector.
pub type Connecting<S> = Pin<Box<dyn Future<Output = io::Result<S>> + Send>>;

/// Dials a new raw connection.
///
/// The pool calls this without holding any lock and applies no deadline of
/// its own; a connector that needs a bounded dial must enforce it itself
/// (see [`TcpConnector::connect_timeout`](crate::socket::connectjob::TcpConnector::connect_timeout)).
/// Errors are handed back to the caller of `Pool::get` unchanged.
pub trait Connect<S: StreamSocket>: Send + Sync + 'static {
    fn connect(&self) -> Connecting<S>;
}

impl<S: StreamSocket, C: Connect<S> + ?Sized> Connect<S> for Arc<C> {
    fn connect(&self) -> Connecting<S> {
        (**self).connect()
    }
}

/// A connector backed by a closure.
///
/// Created with [`connect_fn`].
#[derive(Clone)]
pub struct ConnectFn<F> {
    f: F,
}

/// Adapt a closure returning a future into a [`Connect`] implementation.
///
/// ```rust,ignore
/// use netpool::socket::connect::connect_fn;
/// use tokio::net::TcpStream;
///
/// let factory = connect_fn(|| TcpStream::connect("127.0.0.1:6379"));
/// ```
pub fn connect_fn<F, Fut, S>(f: F) -> ConnectFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<S>> + Send + 'static,
    S: StreamSocket,
{
    ConnectFn { f }
}

impl<F, Fut, S> Connect<S> for ConnectFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<S>> + Send + 'static,
    S: StreamSocket,
{
    fn connect(&self) -> Connecting<S> {
        Box::pin((self.f)())
    }
}

impl<F> fmt::Debug for ConnectFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectFn").finish_non_exhaustive()
    }
}
