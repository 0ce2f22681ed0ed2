//! Shared test helpers: an in-memory factory that records what it dials.

#![allow(dead_code)]

use netpool::{Connect, Connecting};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, DuplexStream};

/// Dials `tokio::io::duplex` pairs, keeping the server halves so tests can
/// observe when the pool hard-closes the client half.
#[derive(Default)]
pub struct DuplexFactory {
    dialed: AtomicUsize,
    failing: AtomicBool,
    servers: Mutex<Vec<DuplexStream>>,
}

impl DuplexFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialed(&self) -> usize {
        self.dialed.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Take the server halves dialed so far.
    pub fn take_servers(&self) -> Vec<DuplexStream> {
        std::mem::take(&mut *self.servers.lock().unwrap())
    }
}

impl Connect<DuplexStream> for DuplexFactory {
    fn connect(&self) -> Connecting<DuplexStream> {
        if self.failing.load(Ordering::SeqCst) {
            return Box::pin(async {
                Err::<DuplexStream, _>(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "backend down",
                ))
            });
        }
        self.dialed.fetch_add(1, Ordering::SeqCst);
        let (client, server) = tokio::io::duplex(1024);
        self.servers.lock().unwrap().push(server);
        Box::pin(async move { Ok::<_, io::Error>(client) })
    }
}

/// True when the peer has shut down or dropped its half.
pub async fn peer_closed(server: &mut DuplexStream) -> bool {
    let mut buf = [0u8; 16];
    matches!(
        tokio::time::timeout(Duration::from_secs(1), server.read(&mut buf)).await,
        Ok(Ok(0))
    )
}

/// Poll `cond` until it holds or a second has passed.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
