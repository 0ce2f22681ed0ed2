mod common;

use common::DuplexFactory;
use netpool::{Pool, PoolConfig, TcpConnector};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

fn duplex_pool(factory: &Arc<DuplexFactory>) -> Pool<DuplexStream> {
    Pool::new(PoolConfig::new().initial_count(0).factory(Arc::clone(factory))).unwrap()
}

#[tokio::test]
async fn test_reads_and_writes_pass_through() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    let mut server = factory.take_servers().pop().unwrap();

    conn.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    server.write_all(b"world").await.unwrap();
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"world");
}

#[tokio::test]
async fn test_io_after_close_is_not_connected() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    conn.close().await.unwrap();
    assert!(conn.is_closed());
    assert!(conn.inner().is_none());

    let err = conn.write(b"x").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    let mut buf = [0u8; 1];
    let err = conn.read(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
}

#[tokio::test]
async fn test_shutdown_marks_unusable() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    conn.shutdown().await.unwrap();
    assert!(conn.is_unusable());

    conn.close().await.unwrap();
    assert_eq!(pool.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_read_deadline_times_out() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    let _server = factory.take_servers();
    conn.set_read_deadline(Some(Instant::now() + Duration::from_secs(1)));

    let mut buf = [0u8; 8];
    let err = conn.read(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    assert!(!conn.is_unusable());
}

#[tokio::test(start_paused = true)]
async fn test_write_deadline_times_out_when_peer_stalls() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    let _server = factory.take_servers();
    conn.set_write_deadline(Some(Instant::now() + Duration::from_secs(1)));

    // The duplex buffer is 1 KiB and nobody reads the other end.
    let err = conn.write_all(&[0u8; 4096]).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_cleared_deadline_does_not_fire() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    let mut server = factory.take_servers().pop().unwrap();
    conn.set_deadline(Some(Instant::now() + Duration::from_millis(10)));
    conn.set_deadline(None);

    tokio::time::sleep(Duration::from_secs(1)).await;
    server.write_all(b"ok").await.unwrap();
    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ok");
}

#[tokio::test]
async fn test_reused_connection_has_no_stale_deadline() {
    let factory = Arc::new(DuplexFactory::new());
    let pool = duplex_pool(&factory);

    let mut conn = pool.get().await.unwrap();
    let mut server = factory.take_servers().pop().unwrap();
    conn.set_deadline(Some(Instant::now()));
    conn.close().await.unwrap();

    let mut conn = pool.get().await.unwrap();
    server.write_all(b"hi").await.unwrap();
    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hi");
}

/// Echo server that keeps each connection open until the client leaves.
async fn spawn_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut rd, mut wr) = socket.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
            });
        }
    });
    port
}

#[tokio::test]
async fn test_tcp_connection_reused_across_requests() {
    let port = spawn_echo_server().await;
    let pool: Pool<TcpStream> = Pool::new(
        PoolConfig::new()
            .initial_count(0)
            .max_count(4)
            .factory(TcpConnector::new("127.0.0.1", port).connect_timeout(Duration::from_secs(5))),
    )
    .unwrap();

    let mut conn = pool.get().await.unwrap();
    let local = conn.inner().unwrap().local_addr().unwrap();
    conn.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
    conn.close().await.unwrap();

    let mut conn = pool.get().await.unwrap();
    assert_eq!(conn.inner().unwrap().local_addr().unwrap(), local);
    conn.write_all(b"pong").await.unwrap();
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    drop(conn);
    pool.close().await;
    assert_eq!(pool.stats().dialed, 1);
}

#[tokio::test]
async fn test_tcp_prewarm() {
    let port = spawn_echo_server().await;
    let pool: Pool<TcpStream> = Pool::new(
        PoolConfig::new()
            .initial_count(3)
            .prewarm_concurrency(2)
            .factory(TcpConnector::new("127.0.0.1", port)),
    )
    .unwrap();

    assert!(common::wait_until(|| pool.len() == 3).await);
    pool.close().await;
    assert_eq!(pool.len(), 0);
}
