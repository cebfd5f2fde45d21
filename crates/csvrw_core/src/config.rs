//! Engine configuration.
//!
//! These settings belong to the engine object rather than to a session: they
//! survive `close` and apply to every later `open` or `associate`.

use crate::error::{CsvError, CsvResult};
use csvrw_codec::is_valid_delimiter;
use csvrw_storage::DEFAULT_BUFFER_SIZE;

/// Object-level settings of a [`CsvReader`](crate::CsvReader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Field separator.
    pub delimiter: char,

    /// Read buffer capacity in bytes.
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ReaderConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field separator.
    #[must_use]
    pub const fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the read buffer capacity.
    #[must_use]
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error naming the first bad setting.
    pub fn validate(&self) -> CsvResult<()> {
        read_delimiter_byte("set_delimiter", self.delimiter)?;
        check_buffer_size("resize_buffer", self.buffer_size)
    }
}

/// Object-level settings of a [`CsvWriter`](crate::CsvWriter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Field separator, possibly multi-character or padded with spaces.
    pub delimiter: String,

    /// Record terminator, possibly multi-character or padded with spaces.
    pub terminator: String,

    /// Write buffer capacity in bytes.
    pub buffer_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            terminator: "\n".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl WriterConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field separator.
    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Sets the record terminator.
    #[must_use]
    pub fn terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = terminator.into();
        self
    }

    /// Sets the write buffer capacity.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error naming the first bad setting.
    pub fn validate(&self) -> CsvResult<()> {
        check_write_delimiter("set_delimiter", &self.delimiter)?;
        check_terminator("set_terminator", &self.terminator)?;
        check_write_layout("validate", &self.delimiter, &self.terminator)?;
        check_buffer_size("resize_buffer", self.buffer_size)
    }
}

/// Converts a read-side delimiter to its byte.
pub(crate) fn read_delimiter_byte(operation: &'static str, delimiter: char) -> CsvResult<u8> {
    match u8::try_from(delimiter) {
        Ok(byte) if is_valid_delimiter(byte) => Ok(byte),
        _ => Err(CsvError::invalid_argument(
            operation,
            format!("delimiter {delimiter:?} must be printable ASCII or tab and not a quote"),
        )),
    }
}

/// Splits off leading and trailing spaces. The flag is set when any were
/// found.
fn unpad(bytes: &[u8]) -> (&[u8], bool) {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(start, |i| i + 1);
    (&bytes[start..end], start > 0 || end < bytes.len())
}

/// A write delimiter is one byte a reader accepts as its delimiter,
/// optionally padded with spaces.
pub(crate) fn check_write_delimiter(operation: &'static str, delimiter: &str) -> CsvResult<()> {
    let core = match (delimiter.as_bytes(), unpad(delimiter.as_bytes())) {
        (b" ", _) => b' ',
        (_, ([byte], _)) => *byte,
        _ => {
            return Err(CsvError::invalid_argument(
                operation,
                format!("delimiter {delimiter:?} must be a single byte, optionally padded with spaces"),
            ))
        }
    };
    if !is_valid_delimiter(core) {
        return Err(CsvError::invalid_argument(
            operation,
            format!("delimiter {delimiter:?} contains forbidden byte 0x{core:02x}"),
        ));
    }
    Ok(())
}

/// A terminator is one `\n`, `\r\n` or `\r`, optionally padded with spaces.
pub(crate) fn check_terminator(operation: &'static str, terminator: &str) -> CsvResult<()> {
    match unpad(terminator.as_bytes()) {
        (b"\n" | b"\r\n" | b"\r", _) => Ok(()),
        _ => Err(CsvError::invalid_argument(
            operation,
            format!("terminator {terminator:?} must be one line break, optionally padded with spaces"),
        )),
    }
}

/// A space delimiter cannot be told apart from terminator padding.
pub(crate) fn check_write_layout(
    operation: &'static str,
    delimiter: &str,
    terminator: &str,
) -> CsvResult<()> {
    if delimiter == " " && unpad(terminator.as_bytes()).1 {
        return Err(CsvError::invalid_argument(
            operation,
            format!("terminator {terminator:?} is padded with the space delimiter"),
        ));
    }
    Ok(())
}

pub(crate) fn check_buffer_size(operation: &'static str, size: usize) -> CsvResult<()> {
    if size == 0 {
        return Err(CsvError::invalid_argument(
            operation,
            "buffer size must be at least one byte",
        ));
    }
    Ok(())
}
