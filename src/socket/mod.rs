//! Socket and connection management.
//!
//! - [`pool`]: The pool coordinator (`get`, `close`, `len`)
//! - [`pooled`]: Pool-aware connection wrapper
//! - `freelist`: LRU heap of idle connections (crate-internal)
//! - [`connect`]: Factory trait for dialing raw connections
//! - [`connectjob`]: DNS → TCP dialer usable as a factory
//! - [`poolconfig`]: Sizing, timeouts, and validation

pub mod connect;
pub mod connectjob;
pub(crate) mod freelist;
pub mod pool;
pub mod poolconfig;
pub mod pooled;
pub mod poolstats;
pub(crate) mod prewarm;
pub(crate) mod reaper;
pub mod stream;
