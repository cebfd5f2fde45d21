//! Record writer.

use crate::config::{
    check_buffer_size, check_terminator, check_write_delimiter, check_write_layout, WriterConfig,
};
use crate::error::{CsvError, CsvResult};
use crate::flags::WriteFlags;
use csvrw_codec::{encode_field_with, UTF8_BOM};
use csvrw_storage::{IoStats, StorageResult, WriteBuffer, WriteStream};
use std::io::Write;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Buffered CSV writer.
///
/// Every field is quoted and embedded quotes are doubled. The delimiter and
/// terminator are arbitrary strings and persist across sessions, as does
/// the buffer capacity.
///
/// Once a call fails, the error is kept and every later call returns it
/// until the session is closed or a new one is started.
pub struct CsvWriter<'s> {
    stream: Option<WriteStream<'s>>,
    flags: WriteFlags,
    delimiter: String,
    terminator: String,
    buffer: WriteBuffer,
    /// Fields written to the record in progress.
    fields_in_record: usize,
    /// Stream offset where the session started.
    origin: u64,
    bytes_written: u64,
    records_written: u64,
    at_stream_start: bool,
    bom_written: bool,
    error: Option<CsvError>,
}

impl Default for CsvWriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> CsvWriter<'s> {
    /// Creates a writer with the default configuration and no session.
    #[must_use]
    pub fn new() -> Self {
        let config = WriterConfig::default();
        Self {
            stream: None,
            flags: WriteFlags::none(),
            delimiter: config.delimiter,
            terminator: config.terminator,
            buffer: WriteBuffer::new(),
            fields_in_record: 0,
            origin: 0,
            bytes_written: 0,
            records_written: 0,
            at_stream_start: false,
            bom_written: false,
            error: None,
        }
    }

    /// Creates a writer with the given object-level settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is invalid or the buffer cannot be
    /// allocated.
    pub fn with_config(config: &WriterConfig) -> CsvResult<Self> {
        config.validate()?;
        let mut writer = Self::new();
        writer.delimiter.clone_from(&config.delimiter);
        writer.terminator.clone_from(&config.terminator);
        writer.buffer = WriteBuffer::with_capacity(config.buffer_size)
            .map_err(|err| CsvError::storage("with_config", 0, err))?;
        Ok(writer)
    }

    /// Returns the current object-level settings.
    #[must_use]
    pub fn config(&self) -> WriterConfig {
        WriterConfig {
            delimiter: self.delimiter.clone(),
            terminator: self.terminator.clone(),
            buffer_size: self.buffer.capacity(),
        }
    }

    /// Opens or creates a file and starts a session. The writer owns the
    /// handle.
    ///
    /// With [`WriteFlags::truncate`] the file is emptied; otherwise records
    /// are appended. Any previous session is closed first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened, or the error of
    /// closing the previous session.
    pub fn open(&mut self, path: impl AsRef<Path>, flags: WriteFlags) -> CsvResult<()> {
        self.close()?;
        let path = path.as_ref();
        match WriteStream::open_write(path, flags.truncate) {
            Ok((stream, len)) => {
                debug!(path = %path.display(), ?flags, existing_bytes = len, "write session opened");
                self.start_session(stream, flags, len);
                Ok(())
            }
            Err(err) => Err(self.fail(CsvError::io("open", 0, &err))),
        }
    }

    /// Starts a session on a caller-owned stream.
    ///
    /// The stream is never closed by the writer; `close` flushes it and
    /// releases the borrow.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if `flags` asks for truncation,
    /// which only applies to [`CsvWriter::open`].
    pub fn associate<W: Write + 's>(&mut self, stream: &'s mut W, flags: WriteFlags) -> CsvResult<()> {
        self.close()?;
        if flags.truncate {
            return Err(self.fail(CsvError::invalid_argument(
                "associate",
                "truncate is only valid when opening a path",
            )));
        }
        debug!(?flags, "write session associated");
        self.start_session(WriteStream::borrow_write(stream), flags, 0);
        Ok(())
    }

    fn start_session(&mut self, stream: WriteStream<'s>, flags: WriteFlags, existing_bytes: u64) {
        self.stream = Some(stream);
        self.flags = flags;
        self.origin = existing_bytes;
        self.at_stream_start = existing_bytes == 0;
        self.buffer.reset_stats();
    }

    /// Flushes buffered bytes and ends the session.
    ///
    /// An owned stream is closed; a borrowed one is flushed and released.
    /// The delimiter, terminator and buffer capacity are kept. Closing a
    /// closed writer succeeds. A session that failed with an I/O error is
    /// released without writing its pending bytes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the final flush fails. The stream is released
    /// regardless and the error stays set until the next session starts.
    pub fn close(&mut self) -> CsvResult<()> {
        const OP: &str = "close";
        let result = match self.stream.as_mut() {
            Some(stream) if !matches!(self.error, Some(CsvError::Io { .. })) => {
                let position = self.origin + self.bytes_written;
                self.buffer
                    .flush(stream.get_mut())
                    .map_err(|err| CsvError::storage(OP, position, err))
                    .and_then(|()| {
                        stream
                            .get_mut()
                            .flush()
                            .map_err(|err| CsvError::io(OP, position, &err))
                    })
            }
            _ => Ok(()),
        };
        if let Some(stream) = self.stream.take() {
            debug!(
                owned = stream.is_owned(),
                records = self.records_written,
                bytes = self.bytes_written,
                "write session closed"
            );
        }

        self.buffer.discard();
        self.flags = WriteFlags::none();
        self.fields_in_record = 0;
        self.origin = 0;
        self.bytes_written = 0;
        self.records_written = 0;
        self.at_stream_start = false;
        self.bom_written = false;
        self.error = None;
        result.map_err(|err| self.fail(err))
    }

    /// Returns `true` if a stream is associated.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns the flags of the current session.
    #[must_use]
    pub fn flags(&self) -> WriteFlags {
        self.flags
    }

    /// Changes the write buffer capacity.
    ///
    /// Pending bytes that do not fit in the new capacity are flushed first.
    /// Only legal between records.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero capacity, a resize in the middle of a
    /// record, a failed flush or a failed allocation.
    pub fn resize_buffer(&mut self, capacity: usize) -> CsvResult<()> {
        const OP: &str = "resize_buffer";
        self.check_sticky()?;
        if let Err(err) = check_buffer_size(OP, capacity) {
            return Err(self.fail(err));
        }
        if self.fields_in_record > 0 {
            return Err(self.fail(CsvError::invalid_state(
                OP,
                format!("{} fields written to an unterminated record", self.fields_in_record),
            )));
        }

        let position = self.origin + self.bytes_written;
        if self.buffer.len() > capacity {
            if let Some(stream) = self.stream.as_mut() {
                if let Err(err) = self.buffer.flush(stream.get_mut()) {
                    return Err(self.fail(CsvError::storage(OP, position, err)));
                }
            }
        }
        if let Err(err) = self.buffer.resize(capacity) {
            return Err(self.fail(CsvError::storage(OP, position, err)));
        }
        debug!(capacity, "write buffer resized");
        Ok(())
    }

    /// Sets the field separator. Valid with or without an open session.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error unless `delimiter` is one printable
    /// ASCII byte or tab other than a quote, optionally padded with spaces.
    /// A bare space is rejected while the terminator is padded. The writer's
    /// error state is unaffected.
    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) -> CsvResult<()> {
        let delimiter = delimiter.into();
        check_write_delimiter("set_delimiter", &delimiter)?;
        check_write_layout("set_delimiter", &delimiter, &self.terminator)?;
        self.delimiter = delimiter;
        Ok(())
    }

    /// Returns the field separator.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Sets the record terminator. Valid with or without an open session.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error unless `terminator` is one `\n`,
    /// `\r\n` or `\r`, optionally padded with spaces. The writer's error
    /// state is unaffected.
    pub fn set_terminator(&mut self, terminator: impl Into<String>) -> CsvResult<()> {
        let terminator = terminator.into();
        check_terminator("set_terminator", &terminator)?;
        check_write_layout("set_terminator", &self.delimiter, &terminator)?;
        self.terminator = terminator;
        Ok(())
    }

    /// Returns the record terminator.
    #[must_use]
    pub fn terminator(&self) -> &str {
        &self.terminator
    }

    /// Writes the UTF-8 byte-order mark.
    ///
    /// # Errors
    ///
    /// Returns an invalid state error unless the session started at the
    /// beginning of an empty stream and nothing has been written yet.
    pub fn write_utf8_bom(&mut self) -> CsvResult<()> {
        const OP: &str = "write_utf8_bom";
        self.check_open(OP)?;
        let reason = if self.bom_written {
            Some("byte-order mark already written")
        } else if self.bytes_written > 0 {
            Some("data already written in this session")
        } else if !self.at_stream_start {
            Some("session did not start at the beginning of an empty stream")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(self.fail(CsvError::invalid_state(OP, reason)));
        }
        self.emit(OP, &UTF8_BOM)?;
        self.bom_written = true;
        Ok(())
    }

    /// Writes one field of the current record.
    ///
    /// The delimiter is written first if the record already has a field.
    /// With `last` the terminator follows and the record ends.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing fails, or an error if no session is
    /// open.
    pub fn write_field(&mut self, value: impl AsRef<[u8]>, last: bool) -> CsvResult<()> {
        const OP: &str = "write_field";
        self.check_open(OP)?;
        self.emit_field(OP, value.as_ref())?;
        if last {
            self.emit_terminator(OP)?;
        }
        Ok(())
    }

    /// Writes fields to the current record, then the terminator unless
    /// `write_terminator` is `false`.
    ///
    /// A record with no fields is only terminated when the session processes
    /// empty records.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing fails, or an error if no session is
    /// open.
    pub fn write_record<I, T>(&mut self, fields: I, write_terminator: bool) -> CsvResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        const OP: &str = "write_record";
        self.check_open(OP)?;
        for field in fields {
            self.emit_field(OP, field.as_ref())?;
        }
        if write_terminator {
            self.emit_terminator(OP)?;
        }
        Ok(())
    }

    /// Ends the current record.
    ///
    /// Without [`WriteFlags::process_empty_records`] this writes nothing if
    /// the record has no fields.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing fails, or an error if no session is
    /// open.
    pub fn write_terminator(&mut self) -> CsvResult<()> {
        const OP: &str = "write_terminator";
        self.check_open(OP)?;
        self.emit_terminator(OP)
    }

    fn emit_field(&mut self, operation: &'static str, value: &[u8]) -> CsvResult<()> {
        let Self {
            stream,
            buffer,
            delimiter,
            fields_in_record,
            bytes_written,
            ..
        } = self;
        let Some(stream) = stream.as_mut() else {
            return Err(self.fail(CsvError::NotOpen { operation }));
        };
        let sink = stream.get_mut();
        let mut emit = |piece: &[u8]| -> StorageResult<()> {
            buffer.write(piece, &mut *sink)?;
            *bytes_written += piece.len() as u64;
            Ok(())
        };

        let mut result = Ok(());
        if *fields_in_record > 0 {
            result = emit(delimiter.as_bytes());
        }
        if result.is_ok() {
            result = encode_field_with(value, &mut emit);
        }
        match result {
            Ok(()) => {
                *fields_in_record += 1;
                Ok(())
            }
            Err(err) => {
                let position = self.origin + self.bytes_written;
                Err(self.fail(CsvError::storage(operation, position, err)))
            }
        }
    }

    fn emit_terminator(&mut self, operation: &'static str) -> CsvResult<()> {
        if self.fields_in_record == 0 && !self.flags.process_empty_records {
            return Ok(());
        }
        let terminator = std::mem::take(&mut self.terminator);
        let result = self.emit(operation, terminator.as_bytes());
        self.terminator = terminator;
        result?;

        trace!(
            record = self.records_written + 1,
            fields = self.fields_in_record,
            "record written"
        );
        self.fields_in_record = 0;
        self.records_written += 1;
        Ok(())
    }

    fn emit(&mut self, operation: &'static str, bytes: &[u8]) -> CsvResult<()> {
        let position = self.origin + self.bytes_written;
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.fail(CsvError::NotOpen { operation }));
        };
        if let Err(err) = self.buffer.write(bytes, stream.get_mut()) {
            return Err(self.fail(CsvError::storage(operation, position, err)));
        }
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn check_sticky(&self) -> CsvResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn check_open(&mut self, operation: &'static str) -> CsvResult<()> {
        self.check_sticky()?;
        if self.stream.is_none() {
            return Err(self.fail(CsvError::NotOpen { operation }));
        }
        Ok(())
    }

    fn fail(&mut self, err: CsvError) -> CsvError {
        debug!(error = %err, "write session failed");
        self.error = Some(err.clone());
        err
    }

    /// Returns `true` if the session has failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error that failed the session.
    #[must_use]
    pub fn error(&self) -> Option<&CsvError> {
        self.error.as_ref()
    }

    /// Diagnostic text of the session error, empty if there is none.
    #[must_use]
    pub fn error_msg(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// Number of records terminated in this session.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Number of bytes written in this session, including buffered bytes.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// I/O counters for the current session.
    #[must_use]
    pub fn io_stats(&self) -> IoStats {
        self.buffer.stats()
    }
}

impl Drop for CsvWriter<'_> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            if let Err(err) = self.close() {
                warn!(error = %err, "failed to flush CSV writer on drop");
            }
        }
    }
}

impl std::fmt::Debug for CsvWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvWriter")
            .field("stream", &self.stream)
            .field("flags", &self.flags)
            .field("delimiter", &self.delimiter)
            .field("terminator", &self.terminator)
            .field("records_written", &self.records_written)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
