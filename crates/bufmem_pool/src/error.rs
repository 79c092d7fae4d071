//! # Pool Error Types
//!
//! All errors that can occur between a pool and its callers.

use bufmem_core::ArenaError;
use thiserror::Error;

use crate::config::BufferUsage;

/// Errors that can occur in pools, the buffer manager and the allocator service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The underlying arena refused the request.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// Copy would run past the end of the sub-buffer.
    #[error("out of bounds: {len} bytes at local offset {local_offset} exceed sub-buffer of {size} bytes")]
    OutOfBounds {
        /// Offset inside the sub-buffer.
        local_offset: usize,
        /// Bytes to copy.
        len: usize,
        /// Size of the sub-buffer.
        size: usize,
    },

    /// Backing store size differs from the configured capacity.
    #[error("capacity mismatch: config says {expected} bytes, backing store has {actual}")]
    CapacityMismatch {
        /// Configured capacity.
        expected: usize,
        /// Size reported by the backing store.
        actual: usize,
    },

    /// The host could not provide a backing region of this size.
    #[error("backing allocation of {size} bytes failed")]
    BackingAllocation {
        /// Requested region size.
        size: usize,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No pool is configured for this usage.
    #[error("no pool configured for {0:?} buffers")]
    NoPool(BufferUsage),

    /// The allocator service thread could not be started.
    #[error("failed to spawn allocator service: {0}")]
    ServiceSpawn(String),

    /// The allocator service thread has stopped.
    #[error("allocator service stopped")]
    ServiceStopped,
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
