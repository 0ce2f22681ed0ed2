use std::io;
use thiserror::Error;

/// Errors reported by the connection pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Construction parameters were rejected before any connection was dialed.
    #[error("Invalid pool configuration: {0}")]
    ConfigInvalid(String),
    /// The pool has been closed.
    #[error("Pool is closed")]
    Closed,
    /// The free list is at `max_count`; the connection must be hard-closed.
    #[error("Pool is full")]
    Full,
    /// The factory failed to dial. The inner error is passed through unchanged.
    #[error("Factory failed to connect: {0}")]
    Factory(#[source] io::Error),
}

/// Result alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

impl PoolError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PoolError::ConfigInvalid(msg.into())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, PoolError::Full)
    }

    pub fn is_config_invalid(&self) -> bool {
        matches!(self, PoolError::ConfigInvalid(_))
    }

    /// Returns the factory's original error, if this is a dial failure.
    pub fn into_factory_error(self) -> Option<io::Error> {
        match self {
            PoolError::Factory(e) => Some(e),
            _ => None,
        }
    }
}
