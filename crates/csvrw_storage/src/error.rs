//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while moving bytes through a buffer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested buffer capacity cannot be used.
    #[error("invalid buffer size {requested}: {reason}")]
    InvalidBufferSize {
        /// The requested capacity in bytes.
        requested: usize,
        /// Why the capacity was rejected.
        reason: &'static str,
    },

    /// The buffer region could not be allocated.
    #[error("failed to allocate a buffer of {requested} bytes")]
    AllocationFailed {
        /// The requested capacity in bytes.
        requested: usize,
    },

    /// A refill was requested while the buffer is entirely unconsumed data.
    #[error("buffer full: {capacity} unconsumed bytes")]
    BufferFull {
        /// The buffer capacity in bytes.
        capacity: usize,
    },
}

impl StorageError {
    /// Returns the I/O error kind if this is an I/O error.
    #[must_use]
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(err) => Some(err.kind()),
            _ => None,
        }
    }
}
