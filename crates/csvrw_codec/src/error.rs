//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while parsing records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed quoting rejected in strict mode.
    #[error("format error at byte {position}: {message}")]
    Format {
        /// Description of the malformed input.
        message: String,
        /// Stream offset of the offending byte.
        position: u64,
    },

    /// The parser was configured with a byte that cannot act as a delimiter.
    #[error("invalid delimiter byte 0x{byte:02x}")]
    InvalidDelimiter {
        /// The rejected byte.
        byte: u8,
    },
}

impl CodecError {
    /// Create a format error.
    pub fn format(message: impl Into<String>, position: u64) -> Self {
        Self::Format {
            message: message.into(),
            position,
        }
    }

    /// Returns the stream offset of a format error.
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::Format { position, .. } => Some(*position),
            Self::InvalidDelimiter { .. } => None,
        }
    }
}
