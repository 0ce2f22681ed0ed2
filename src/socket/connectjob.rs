use crate::base::poolerror::{PoolError, PoolResult};
use crate::socket::connect::{Connect, Connecting};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

/// Dials plain TCP connections: DNS -> TCP.
/// Usable directly as a pool factory.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: Arc<str>,
    port: u16,
    connect_timeout: Option<Duration>,
    nodelay: bool,
}

impl TcpConnector {
    pub fn new(host: impl Into<Arc<str>>, port: u16) -> Self {
        Self { host: host.into(), port, connect_timeout: None, nodelay: true }
    }

    /// Build a connector from the host and port of a URL.
    /// Falls back to the scheme's well-known port when none is given.
    pub fn from_url(url: &Url) -> PoolResult<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| PoolError::config(format!("URL has no host: {}", url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| PoolError::config(format!("URL has no port: {}", url)))?;
        Ok(Self::new(host, port))
    }

    /// Bound the whole dial (resolution plus every connect attempt).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set TCP_NODELAY on new connections (default: true).
    pub fn nodelay(mut self, enable: bool) -> Self {
        self.nodelay = enable;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn dial(host: Arc<str>, port: u16, nodelay: bool) -> io::Result<TcpStream> {
        // 1. DNS Resolution
        let addrs = tokio::net::lookup_host((&*host, port)).await?;

        // 2. TCP Connect, first address that answers wins
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(nodelay)?;
                    tracing::debug!(host = %host, %addr, "tcp connected");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!(host = %host, %addr, error = %e, "tcp connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}:{} resolved to no addresses", host, port),
            )
        }))
    }
}

impl Connect<TcpStream> for TcpConnector {
    fn connect(&self) -> Connecting<TcpStream> {
        let dial = Self::dial(self.host.clone(), self.port, self.nodelay);
        match self.connect_timeout {
            Some(limit) => {
                let host = self.host.clone();
                let port = self.port;
                Box::pin(async move {
                    tokio::time::timeout(limit, dial).await.map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("connect to {}:{} timed out after {:?}", host, port, limit),
                        )
                    })?
                })
            }
            None => Box::pin(dial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_known_default_port() {
        let url = Url::parse("http://example.com/").unwrap();
        let connector = TcpConnector::from_url(&url).unwrap();
        assert_eq!(connector.host(), "example.com");
        assert_eq!(connector.port(), 80);
    }

    #[test]
    fn test_from_url_explicit_port() {
        let url = Url::parse("redis://cache.internal:6380").unwrap();
        let connector = TcpConnector::from_url(&url).unwrap();
        assert_eq!(connector.port(), 6380);
    }

    #[test]
    fn test_from_url_without_port_is_invalid() {
        let url = Url::parse("redis://cache.internal").unwrap();
        let err = TcpConnector::from_url(&url).unwrap_err();
        assert!(err.is_config_invalid());
    }

    #[test]
    fn test_from_url_without_host_is_invalid() {
        let url = Url::parse("unix:/tmp/sock").unwrap();
        assert!(TcpConnector::from_url(&url).is_err());
    }

    #[tokio::test]
    async fn test_connect_to_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move { while listener.accept().await.is_ok() {} });

        let connector = TcpConnector::new("127.0.0.1", port).connect_timeout(Duration::from_secs(5));
        let stream = connector.connect().await.unwrap();
        assert_eq!(stream.peer_addr().unwrap().port(), port);
        assert!(stream.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused_passes_io_error() {
        // Bind then drop to get a port nobody is listening on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = TcpConnector::new("127.0.0.1", port).connect().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }
}
