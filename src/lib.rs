//! # netpool
//!
//! A thread-safe pool of reusable network connections for Tokio.
//!
//! `netpool` amortizes dial cost and bounds resource usage: idle connections
//! are kept in a bounded free list, handed out again on demand, and reclaimed
//! by a background reaper once they have idled too long or outlived a hard
//! lifetime. Connections are opaque byte streams; the pool never looks at
//! what flows over them.
//!
//! ## Features
//!
//! - **Bounded free list**: at most `max_count` idle connections are held
//! - **LRU rotation**: the longest-idle connection is reused first
//! - **Eviction**: max lifetime on every `get`, idle timeout in the reaper
//! - **Pre-warming**: `initial_count` dials issued concurrently at startup
//! - **RAII release**: dropping a connection returns it to the pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netpool::socket::connectjob::TcpConnector;
//! use netpool::socket::pool::Pool;
//! use netpool::socket::poolconfig::PoolConfig;
//! use tokio::io::AsyncWriteExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PoolConfig::new()
//!         .max_count(10)
//!         .factory(TcpConnector::new("127.0.0.1", 6379));
//!     let pool = Pool::new(config).unwrap();
//!
//!     let mut conn = pool.get().await.unwrap();
//!     conn.write_all(b"PING\r\n").await.unwrap();
//!     conn.close().await.unwrap(); // back to the pool
//!
//!     pool.close().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types
//! - [`socket`] - The pool, its connection wrapper, and the TCP dialer

pub mod base;
pub mod socket;

pub use base::poolerror::{PoolError, PoolResult};
pub use socket::connect::{connect_fn, Connect, Connecting};
pub use socket::connectjob::TcpConnector;
pub use socket::pool::Pool;
pub use socket::poolconfig::PoolConfig;
pub use socket::pooled::PooledConnection;
pub use socket::poolstats::PoolStatsSnapshot;
pub use socket::stream::StreamSocket;
