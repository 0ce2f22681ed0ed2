//! Base types and error handling.
//!
//! - [`PoolError`](poolerror::PoolError): failures reported by the pool

pub mod poolerror;
