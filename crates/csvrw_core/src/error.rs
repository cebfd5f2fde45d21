//! Error types for csvrw core.

use csvrw_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Errors reported by [`CsvReader`](crate::CsvReader) and
/// [`CsvWriter`](crate::CsvWriter).
///
/// Every variant names the call that failed. Errors are `Clone` because a
/// failed session hands the same error back on each later call until the
/// session is reset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// The underlying stream failed to open, read, write or seek.
    #[error("{operation}: I/O error at byte {position}: {message}")]
    Io {
        /// The call that failed.
        operation: &'static str,
        /// Stream offset at which the failure occurred.
        position: u64,
        /// Kind of the underlying I/O error.
        kind: io::ErrorKind,
        /// Text of the underlying I/O error.
        message: String,
    },

    /// Malformed quoting rejected in strict mode.
    #[error("{operation}: format error in record {record} at byte {position}: {message}")]
    Format {
        /// The call that failed.
        operation: &'static str,
        /// Number of the record being parsed.
        record: u64,
        /// Stream offset of the offending byte.
        position: u64,
        /// Description of the malformed input.
        message: String,
    },

    /// An argument was out of range or otherwise unusable.
    #[error("{operation}: invalid argument: {message}")]
    InvalidArgument {
        /// The call that failed.
        operation: &'static str,
        /// Why the argument was rejected.
        message: String,
    },

    /// The call is not legal in the current session state.
    #[error("{operation}: invalid state: {message}")]
    InvalidState {
        /// The call that failed.
        operation: &'static str,
        /// Why the call is not legal now.
        message: String,
    },

    /// No stream is associated with the engine.
    #[error("{operation}: no stream is open or associated")]
    NotOpen {
        /// The call that failed.
        operation: &'static str,
    },

    /// The buffer could not be resized or allocated.
    #[error("{operation}: buffer error: {message}")]
    Buffer {
        /// The call that failed.
        operation: &'static str,
        /// Description of the buffer failure.
        message: String,
    },
}

impl CsvError {
    /// Creates an I/O error.
    pub fn io(operation: &'static str, position: u64, err: &io::Error) -> Self {
        Self::Io {
            operation,
            position,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Converts a storage error raised at `position`.
    pub fn storage(operation: &'static str, position: u64, err: StorageError) -> Self {
        match err {
            StorageError::Io(err) => Self::io(operation, position, &err),
            other => Self::Buffer {
                operation,
                message: other.to_string(),
            },
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            message: message.into(),
        }
    }

    /// Returns the name of the call that failed.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Io { operation, .. }
            | Self::Format { operation, .. }
            | Self::InvalidArgument { operation, .. }
            | Self::InvalidState { operation, .. }
            | Self::NotOpen { operation }
            | Self::Buffer { operation, .. } => *operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_call() {
        let err = CsvError::Format {
            operation: "read_record",
            record: 4,
            position: 17,
            message: "unexpected byte after closing quote".into(),
        };
        assert_eq!(
            err.to_string(),
            "read_record: format error in record 4 at byte 17: unexpected byte after closing quote"
        );
        assert_eq!(err.operation(), "read_record");
    }

    #[test]
    fn storage_io_becomes_io() {
        let io = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let err = CsvError::storage("read_record", 9, StorageError::Io(io));
        assert!(matches!(
            err,
            CsvError::Io {
                position: 9,
                kind: io::ErrorKind::UnexpectedEof,
                ..
            }
        ));
    }

    #[test]
    fn storage_buffer_becomes_buffer() {
        let err = CsvError::storage(
            "resize_buffer",
            0,
            StorageError::AllocationFailed { requested: 1 << 40 },
        );
        assert_eq!(err.operation(), "resize_buffer");
        assert!(matches!(err, CsvError::Buffer { .. }));
    }
}
