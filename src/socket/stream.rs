//! Raw stream abstraction.
//!
//! The pool treats every connection as an opaque bidirectional byte stream.
//! Anything that implements tokio's `AsyncRead + AsyncWrite` and can move
//! between tasks qualifies: `TcpStream`, `UnixStream`, TLS streams layered on
//! top of either, or an in-memory `DuplexStream` in tests.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// A connected byte stream that can be held by the pool.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static {}

impl<T> StreamSocket for T where T: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static {}

/// Shut down the write half and drop the stream.
///
/// Failures are logged and swallowed; there is nobody left to report them to.
pub(crate) async fn hard_close<S: StreamSocket>(mut stream: S) {
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, "hard close failed");
    }
}

/// Hard-close in the background on the current runtime.
///
/// Outside a runtime the stream is dropped, which still releases the
/// underlying descriptor.
pub(crate) fn spawn_hard_close<S: StreamSocket>(stream: S) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(hard_close(stream));
        }
        Err(_) => drop(stream),
    }
}
