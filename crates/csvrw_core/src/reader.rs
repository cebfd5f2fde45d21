//! Record reader.
//!
//! [`CsvReader`] ties a stream association, a read buffer, the record parser
//! and a [`RecordIndex`] together. Records can be read sequentially or by
//! number; every record start discovered along the way is indexed so that
//! revisiting a record never rescans from the start of the stream.

use crate::config::{check_buffer_size, read_delimiter_byte, ReaderConfig};
use crate::error::{CsvError, CsvResult};
use crate::flags::ReadFlags;
use crate::index::RecordIndex;
use csvrw_codec::{CodecError, Finish, RecordParser, Step, UTF8_BOM};
use csvrw_storage::{IoStats, ReadBuffer, ReadStream};
use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// Result of a successful read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A record was read into [`CsvReader::fields`].
    Record,
    /// No such record exists; the end of the stream has been reached.
    Exhausted,
}

impl ReadOutcome {
    /// Returns `true` if a record was read.
    #[must_use]
    pub fn is_record(self) -> bool {
        self == Self::Record
    }
}

/// Buffered CSV reader with sequential and random record access.
///
/// A reader is reusable: `close` ends a session but keeps the delimiter and
/// buffer capacity for the next `open` or `associate`.
///
/// Once a call fails, the error is kept and every later call returns it
/// until the session is closed or a new one is started. Reaching the end of
/// the stream is not an error.
pub struct CsvReader<'s> {
    stream: Option<ReadStream<'s>>,
    flags: ReadFlags,
    delimiter: u8,
    buffer: ReadBuffer,
    parser: RecordParser,
    index: RecordIndex,
    fields: Vec<Vec<u8>>,
    /// Stream offset where the session started.
    origin: u64,
    bom_checked: bool,
    /// Number of the record the parser will produce next.
    next_record: u64,
    record_num: u64,
    end_record_num: Option<u64>,
    eof: bool,
    end_record_not_terminated: bool,
    final_unterminated: bool,
    error: Option<CsvError>,
}

impl Default for CsvReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> CsvReader<'s> {
    /// Creates a reader with the default configuration and no session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: None,
            flags: ReadFlags::none(),
            delimiter: b',',
            buffer: ReadBuffer::new(),
            parser: RecordParser::default(),
            index: RecordIndex::new(),
            fields: Vec::new(),
            origin: 0,
            bom_checked: false,
            next_record: 1,
            record_num: 0,
            end_record_num: None,
            eof: false,
            end_record_not_terminated: false,
            final_unterminated: false,
            error: None,
        }
    }

    /// Creates a reader with the given object-level settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is invalid or the buffer cannot be
    /// allocated.
    pub fn with_config(config: &ReaderConfig) -> CsvResult<Self> {
        config.validate()?;
        let mut reader = Self::new();
        reader.set_delimiter(config.delimiter)?;
        reader.buffer = ReadBuffer::with_capacity(config.buffer_size)
            .map_err(|err| CsvError::storage("with_config", 0, err))?;
        Ok(reader)
    }

    /// Returns the current object-level settings.
    #[must_use]
    pub fn config(&self) -> ReaderConfig {
        ReaderConfig {
            delimiter: char::from(self.delimiter),
            buffer_size: self.buffer.capacity(),
        }
    }

    /// Opens a file and starts a session. The reader owns the handle.
    ///
    /// Any previous session is closed first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(&mut self, path: impl AsRef<Path>, flags: ReadFlags) -> CsvResult<()> {
        self.close()?;
        let path = path.as_ref();
        match ReadStream::open_read(path) {
            Ok(stream) => {
                debug!(path = %path.display(), ?flags, "read session opened");
                self.start_session("open", stream, flags)
            }
            Err(err) => Err(self.fail(CsvError::io("open", 0, &err))),
        }
    }

    /// Starts a session on a caller-owned stream.
    ///
    /// Parsing begins at the stream's current position. The stream is never
    /// closed by the reader; closing the session only releases the borrow.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream position cannot be queried.
    pub fn associate<S: Read + Seek + 's>(
        &mut self,
        stream: &'s mut S,
        flags: ReadFlags,
    ) -> CsvResult<()> {
        self.close()?;
        debug!(?flags, "read session associated");
        self.start_session("associate", ReadStream::borrow_read(stream), flags)
    }

    fn start_session(
        &mut self,
        operation: &'static str,
        mut stream: ReadStream<'s>,
        flags: ReadFlags,
    ) -> CsvResult<()> {
        let origin = match stream.get_mut().stream_position() {
            Ok(origin) => origin,
            Err(err) => return Err(self.fail(CsvError::io(operation, 0, &err))),
        };
        self.parser = match RecordParser::new(self.delimiter) {
            Ok(parser) => parser
                .with_strict(flags.strict_mode)
                .with_text_mode(flags.text_mode),
            Err(err) => return Err(self.fail(CsvError::invalid_argument(operation, err.to_string()))),
        };
        self.parser.reset(origin);
        self.buffer.reset(origin);
        self.buffer.reset_stats();
        self.origin = origin;
        self.flags = flags;
        self.stream = Some(stream);
        Ok(())
    }

    /// Ends the session.
    ///
    /// An owned stream is closed; a borrowed one is released. The delimiter
    /// and buffer capacity are kept. Closing a closed reader succeeds.
    ///
    /// # Errors
    ///
    /// Never fails; the result mirrors the writer's contract.
    pub fn close(&mut self) -> CsvResult<()> {
        if let Some(stream) = self.stream.take() {
            debug!(
                owned = stream.is_owned(),
                indexed = self.index.len(),
                end_record = ?self.end_record_num,
                "read session closed"
            );
        }
        self.flags = ReadFlags::none();
        self.buffer.reset(0);
        self.parser.reset(0);
        self.index.clear();
        self.fields.clear();
        self.origin = 0;
        self.bom_checked = false;
        self.next_record = 1;
        self.record_num = 0;
        self.end_record_num = None;
        self.eof = false;
        self.end_record_not_terminated = false;
        self.final_unterminated = false;
        self.error = None;
        Ok(())
    }

    /// Returns `true` if a stream is associated.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns the flags of the current session.
    #[must_use]
    pub fn flags(&self) -> ReadFlags {
        self.flags
    }

    /// Changes the read buffer capacity.
    ///
    /// Buffered bytes that have not been parsed yet are kept. If they do not
    /// fit in the new capacity they are dropped and the stream is rewound so
    /// they are read again.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero capacity, a failed allocation or a failed
    /// rewind.
    pub fn resize_buffer(&mut self, capacity: usize) -> CsvResult<()> {
        const OP: &str = "resize_buffer";
        self.check_sticky()?;
        if let Err(err) = check_buffer_size(OP, capacity) {
            return Err(self.fail(err));
        }

        let position = self.buffer.position();
        if self.buffer.len() > capacity {
            if let Some(stream) = self.stream.as_mut() {
                if let Err(err) = stream.get_mut().seek(SeekFrom::Start(position)) {
                    return Err(self.fail(CsvError::io(OP, position, &err)));
                }
            }
            self.buffer.reset(position);
        }
        if let Err(err) = self.buffer.resize(capacity) {
            return Err(self.fail(CsvError::storage(OP, position, err)));
        }
        debug!(capacity, "read buffer resized");
        Ok(())
    }

    /// Sets the field separator. Valid with or without an open session.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if `delimiter` is not printable
    /// ASCII or tab, or is a quote. The reader's error state is unaffected.
    pub fn set_delimiter(&mut self, delimiter: char) -> CsvResult<()> {
        let byte = read_delimiter_byte("set_delimiter", delimiter)?;
        self.parser
            .set_delimiter(byte)
            .map_err(|err| CsvError::invalid_argument("set_delimiter", err.to_string()))?;
        self.delimiter = byte;
        Ok(())
    }

    /// Returns the field separator.
    #[must_use]
    pub fn delimiter(&self) -> char {
        char::from(self.delimiter)
    }

    /// Reads the record after the last one read.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, on malformed input in strict mode,
    /// or if no session is open.
    pub fn read_record(&mut self) -> CsvResult<ReadOutcome> {
        self.read_record_at(self.record_num + 1)
    }

    /// Reads record `record` (1-based).
    ///
    /// Previously visited records are reached by seeking to their indexed
    /// offset. Otherwise parsing continues from the closest known record at
    /// or before the target, indexing every record it passes.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for record 0, and otherwise the same
    /// errors as [`CsvReader::read_record`].
    pub fn read_record_at(&mut self, record: u64) -> CsvResult<ReadOutcome> {
        const OP: &str = "read_record";
        self.check_open(OP)?;
        if record == 0 {
            return Err(self.fail(CsvError::invalid_argument(OP, "record numbers start at 1")));
        }
        self.check_bom(OP)?;

        if self.end_record_num.is_some_and(|end| record > end) {
            self.eof = true;
            return Ok(ReadOutcome::Exhausted);
        }
        if self.next_record != record {
            self.reposition(OP, record)?;
        }

        let mut start = self.buffer.position();
        loop {
            let Some(terminated) = self.parse_raw_record(OP)? else {
                self.eof = true;
                self.end_record_num = Some(self.next_record - 1);
                self.end_record_not_terminated = self.final_unterminated;
                debug!(end_record = self.next_record - 1, "end of stream reached");
                return Ok(ReadOutcome::Exhausted);
            };
            if self.parser.fields().is_empty() && !self.flags.process_empty_records {
                continue;
            }

            let current = self.next_record;
            trace!(record = current, offset = start, "record parsed");
            self.index.insert(current, start);
            self.next_record += 1;
            start = self.buffer.position();
            if !terminated {
                self.final_unterminated = true;
            }

            if current == record {
                self.fields = self.parser.take_fields();
                self.record_num = current;
                self.eof = false;
                return Ok(ReadOutcome::Record);
            }
        }
    }

    /// Moves the cursor so the next parsed record is the closest one at or
    /// before `record` that can be reached cheaply.
    fn reposition(&mut self, operation: &'static str, record: u64) -> CsvResult<()> {
        let Some(entry) = self.index.floor(record) else {
            return Err(self.fail(CsvError::invalid_state(
                operation,
                format!("no indexed record at or before {record}"),
            )));
        };
        // Scanning on from the cursor beats seeking back to an older entry.
        if self.next_record < record && self.next_record > entry.record {
            return Ok(());
        }
        self.seek_to(operation, entry.offset)?;
        self.next_record = entry.record;
        Ok(())
    }

    fn seek_to(&mut self, operation: &'static str, offset: u64) -> CsvResult<()> {
        if !self.buffer.seek_within(offset) {
            let Some(stream) = self.stream.as_mut() else {
                return Err(self.fail(CsvError::NotOpen { operation }));
            };
            if let Err(err) = stream.get_mut().seek(SeekFrom::Start(offset)) {
                return Err(self.fail(CsvError::io(operation, offset, &err)));
            }
            self.buffer.reset(offset);
        }
        self.parser.reset(offset);
        Ok(())
    }

    /// Refills the buffer. Returns the number of new bytes, zero at end of
    /// stream.
    fn refill(&mut self, operation: &'static str) -> CsvResult<usize> {
        let position = self.buffer.position();
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.fail(CsvError::NotOpen { operation }));
        };
        match self.buffer.fill(stream.get_mut()) {
            Ok(n) => Ok(n),
            Err(err) => Err(self.fail(CsvError::storage(operation, position, err))),
        }
    }

    /// Parses one record, including zero-field records, from the cursor.
    ///
    /// Returns whether the record had a terminator, or `None` at end of
    /// stream.
    fn parse_raw_record(&mut self, operation: &'static str) -> CsvResult<Option<bool>> {
        loop {
            if self.buffer.is_empty() && self.refill(operation)? == 0 {
                return match self.parser.finish() {
                    Ok(Finish::Empty) => Ok(None),
                    Ok(Finish::Record { terminated }) => Ok(Some(terminated)),
                    Err(err) => Err(self.format_error(operation, err)),
                };
            }
            match self.parser.parse(self.buffer.unconsumed()) {
                Ok(Step::NeedMore) => {
                    let len = self.buffer.len();
                    self.buffer.consume(len);
                }
                Ok(Step::Record { consumed }) => {
                    self.buffer.consume(consumed);
                    return Ok(Some(true));
                }
                Err(err) => return Err(self.format_error(operation, err)),
            }
        }
    }

    /// Skips a leading byte-order mark, once per session, and indexes the
    /// first record.
    fn check_bom(&mut self, operation: &'static str) -> CsvResult<()> {
        if self.bom_checked {
            return Ok(());
        }
        let mut data_start = self.origin;
        if !self.flags.skip_utf8_bom_check && self.origin == 0 {
            // Byte by byte so any buffer capacity works.
            let mut matched = 0;
            while matched < UTF8_BOM.len() {
                if self.buffer.is_empty() && self.refill(operation)? == 0 {
                    break;
                }
                if self.buffer.unconsumed()[0] != UTF8_BOM[matched] {
                    break;
                }
                self.buffer.consume(1);
                matched += 1;
            }
            if matched == UTF8_BOM.len() {
                data_start = self.origin + UTF8_BOM.len() as u64;
                debug!("UTF-8 byte-order mark skipped");
            }
        }
        self.seek_to(operation, data_start)?;
        self.index.insert(1, data_start);
        self.bom_checked = true;
        Ok(())
    }

    fn format_error(&mut self, operation: &'static str, err: CodecError) -> CsvError {
        let error = match err {
            CodecError::Format { message, position } => CsvError::Format {
                operation,
                record: self.next_record,
                position,
                message,
            },
            other => CsvError::invalid_state(operation, other.to_string()),
        };
        self.fail(error)
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
        debug!(error = %err, "read session failed");
        self.error = Some(err.clone());
        err
    }

    /// Fields of the last record read.
    #[must_use]
    pub fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    /// Field `i` of the last record read, decoded as UTF-8 with replacement
    /// characters for invalid sequences.
    #[must_use]
    pub fn field_lossy(&self, i: usize) -> Option<Cow<'_, str>> {
        self.fields.get(i).map(|f| String::from_utf8_lossy(f))
    }

    /// All fields of the last record read, decoded lossily as UTF-8.
    #[must_use]
    pub fn fields_lossy(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }

    /// Number of the last record read, 0 before the first.
    #[must_use]
    pub fn record_num(&self) -> u64 {
        self.record_num
    }

    /// Total number of records, once the end of the stream has been found.
    #[must_use]
    pub fn end_record_num(&self) -> Option<u64> {
        self.end_record_num
    }

    /// Returns `true` if the last read call found no record because the
    /// stream ended.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Returns `true` if the final record had no terminator.
    #[must_use]
    pub fn end_record_not_terminated(&self) -> bool {
        self.end_record_not_terminated
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

    /// The record index built so far in this session.
    #[must_use]
    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    /// I/O counters for the current session.
    #[must_use]
    pub fn io_stats(&self) -> IoStats {
        self.buffer.stats()
    }
}

impl std::fmt::Debug for CsvReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvReader")
            .field("stream", &self.stream)
            .field("flags", &self.flags)
            .field("delimiter", &char::from(self.delimiter))
            .field("record_num", &self.record_num)
            .field("end_record_num", &self.end_record_num)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use std::io::{self, Cursor};

    fn strs(record: &[Vec<u8>]) -> Vec<&str> {
        record
            .iter()
            .map(|f| std::str::from_utf8(f).unwrap())
            .collect()
    }

    fn read_all(reader: &mut CsvReader<'_>) -> Vec<Vec<Vec<u8>>> {
        let mut records = Vec::new();
        while reader.read_record().unwrap().is_record() {
            records.push(reader.fields().to_vec());
        }
        records
    }

    const EXAMPLE: &[u8] = b"\"a\",\"b\"\n\n\"c,d\",\"e\"\"f\"\n";

    #[test]
    fn example_with_empty_records() {
        let mut data = Cursor::new(EXAMPLE.to_vec());
        let mut reader = CsvReader::new();
        reader
            .associate(&mut data, ReadFlags::none().process_empty_records(true))
            .unwrap();

        let records = read_all(&mut reader);
        assert_eq!(records.len(), 3);
        assert_eq!(strs(&records[0]), ["a", "b"]);
        assert!(records[1].is_empty());
        assert_eq!(strs(&records[2]), ["c,d", "e\"f"]);
        assert!(reader.is_eof());
        assert!(!reader.has_error());
        assert_eq!(reader.end_record_num(), Some(3));
        assert_eq!(reader.record_num(), 3);
        assert!(!reader.end_record_not_terminated());
    }

    #[test]
    fn empty_records_skipped_by_default() {
        let mut data = Cursor::new(EXAMPLE.to_vec());
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        let records = read_all(&mut reader);
        assert_eq!(records.len(), 2);
        assert_eq!(strs(&records[1]), ["c,d", "e\"f"]);
        assert_eq!(reader.end_record_num(), Some(2));
    }

    #[test]
    fn strict_mode_failure_is_sticky() {
        let mut data = Cursor::new(b"\"a\"x,\"b\"\n\"c\"\n".to_vec());
        let mut reader = CsvReader::new();
        reader
            .associate(&mut data, ReadFlags::none().strict_mode(true))
            .unwrap();

        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, CsvError::Format { record: 1, position: 3, .. }));
        assert!(reader.has_error());
        assert!(reader.error_msg().contains("read_record"));

        // Later calls return the same error.
        assert_eq!(reader.read_record_at(2).unwrap_err(), err);
        assert_eq!(reader.resize_buffer(16).unwrap_err(), err);

        reader.close().unwrap();
        assert!(!reader.has_error());
        assert!(reader.error_msg().is_empty());
    }

    #[test]
    fn record_zero_is_invalid() {
        let mut data = Cursor::new(b"x\n".to_vec());
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        let err = reader.read_record_at(0).unwrap_err();
        assert!(matches!(err, CsvError::InvalidArgument { .. }));
        assert!(reader.has_error());
    }

    #[test]
    fn read_without_session_fails() {
        let mut reader = CsvReader::new();
        let err = reader.read_record().unwrap_err();
        assert_eq!(err, CsvError::NotOpen { operation: "read_record" });
        assert!(reader.has_error());
    }

    #[test]
    fn random_access_and_exhaustion() {
        let mut data = Cursor::new(b"1\n2\n3\n4\n5".to_vec());
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();

        assert_eq!(reader.read_record_at(4).unwrap(), ReadOutcome::Record);
        assert_eq!(strs(reader.fields()), ["4"]);
        assert_eq!(reader.index().len(), 4);

        assert_eq!(reader.read_record_at(2).unwrap(), ReadOutcome::Record);
        assert_eq!(strs(reader.fields()), ["2"]);

        // Sequential reading continues after the record just read.
        assert_eq!(reader.read_record().unwrap(), ReadOutcome::Record);
        assert_eq!(strs(reader.fields()), ["3"]);

        assert_eq!(reader.read_record_at(6).unwrap(), ReadOutcome::Exhausted);
        assert!(reader.is_eof());
        assert!(!reader.has_error());
        assert_eq!(reader.end_record_num(), Some(5));
        assert!(reader.end_record_not_terminated());

        assert_eq!(reader.read_record_at(5).unwrap(), ReadOutcome::Record);
        assert_eq!(strs(reader.fields()), ["5"]);
        assert!(!reader.is_eof());
        assert_eq!(reader.read_record().unwrap(), ReadOutcome::Exhausted);
        assert_eq!(reader.read_record_at(1).unwrap(), ReadOutcome::Record);
        assert_eq!(strs(reader.fields()), ["1"]);
    }

    #[test]
    fn bom_is_skipped_once() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"\"x\"\n");
        for capacity in [1, 2, 3, 4096] {
            let mut data = Cursor::new(bytes.clone());
            let mut reader = CsvReader::new();
            reader.resize_buffer(capacity).unwrap();
            reader.associate(&mut data, ReadFlags::none()).unwrap();
            assert!(reader.read_record().unwrap().is_record());
            assert_eq!(strs(reader.fields()), ["x"]);
            assert_eq!(reader.read_record_at(1).unwrap(), ReadOutcome::Record);
            assert_eq!(reader.index().get(1), Some(3));
        }
    }

    #[test]
    fn partial_bom_is_data() {
        let mut data = Cursor::new(vec![0xEF, 0xBB, b'\n']);
        let mut reader = CsvReader::new();
        reader.resize_buffer(1).unwrap();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(reader.fields(), &[vec![0xEFu8, 0xBB]]);
    }

    #[test]
    fn skip_bom_check_keeps_mark_as_content() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"x\n");
        let mut data = Cursor::new(bytes);
        let mut reader = CsvReader::new();
        reader
            .associate(&mut data, ReadFlags::none().skip_utf8_bom_check(true))
            .unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(reader.fields()[0], [0xEF, 0xBB, 0xBF, b'x']);
    }

    #[test]
    fn associate_starts_at_stream_position() {
        let mut data = Cursor::new(b"skip\nkeep\n".to_vec());
        data.set_position(5);
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["keep"]);
        assert_eq!(reader.index().get(1), Some(5));
    }

    #[test]
    fn resize_mid_session_keeps_position() {
        let mut data = Cursor::new(b"\"aaaa\"\n\"bbbb\"\n\"cccc\"\n".to_vec());
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());

        // The whole input is buffered; shrinking drops and rereads it.
        reader.resize_buffer(2).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["bbbb"]);

        reader.resize_buffer(4096).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["cccc"]);
        assert_eq!(reader.config().buffer_size, 4096);
    }

    #[test]
    fn index_survives_resize() {
        let input: String = (1..=8)
            .map(|i| format!("\"r{i}\",\"{}\"\n", "x".repeat(i)))
            .collect();
        let mut data = Cursor::new(input.into_bytes());
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        let mut sequential = Vec::new();
        for _ in 0..6 {
            assert!(reader.read_record().unwrap().is_record());
            sequential.push(reader.fields().to_vec());
        }
        let entries: Vec<IndexEntry> = reader.index().iter().copied().collect();

        reader.resize_buffer(1).unwrap();
        reader.resize_buffer(4096).unwrap();
        assert_eq!(reader.read_record_at(2).unwrap(), ReadOutcome::Record);
        assert_eq!(reader.fields(), sequential[1].as_slice());
        assert_eq!(reader.index().iter().copied().collect::<Vec<_>>(), entries);

        reader.resize_buffer(3).unwrap();
        assert_eq!(reader.read_record_at(5).unwrap(), ReadOutcome::Record);
        assert_eq!(reader.fields(), sequential[4].as_slice());
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["r6", "xxxxxx"]);
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["r7", "xxxxxxx"]);
    }

    #[test]
    fn lossy_field_views() {
        let mut data = Cursor::new(b"\"a\xffb\",\"ok\"\n".to_vec());
        let mut reader = CsvReader::new();
        reader.associate(&mut data, ReadFlags::none()).unwrap();
        assert_eq!(reader.field_lossy(0), None);

        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(reader.field_lossy(0).as_deref(), Some("a\u{fffd}b"));
        assert!(matches!(reader.field_lossy(1), Some(Cow::Borrowed("ok"))));
        assert_eq!(reader.field_lossy(2), None);
        assert_eq!(reader.fields_lossy(), ["a\u{fffd}b", "ok"]);
    }

    #[test]
    fn zero_buffer_size_fails() {
        let mut reader = CsvReader::new();
        assert!(reader.resize_buffer(0).is_err());
        assert!(reader.has_error());
        assert_eq!(reader.config().buffer_size, 4096);
    }

    #[test]
    fn delimiter_survives_close() {
        let mut first = Cursor::new(b"a;b\n".to_vec());
        let mut second = Cursor::new(b"c;d\n".to_vec());
        let mut reader = CsvReader::new();
        reader.set_delimiter(';').unwrap();
        assert!(reader.set_delimiter('"').is_err());
        assert!(!reader.has_error());

        reader.associate(&mut first, ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["a", "b"]);
        reader.close().unwrap();

        assert_eq!(reader.delimiter(), ';');
        reader.associate(&mut second, ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(strs(reader.fields()), ["c", "d"]);
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = CsvReader::new();
        let err = reader
            .open(dir.path().join("missing.csv"), ReadFlags::none())
            .unwrap_err();
        assert!(matches!(
            err,
            CsvError::Io {
                operation: "open",
                kind: io::ErrorKind::NotFound,
                ..
            }
        ));
        assert!(reader.has_error());
        assert!(!reader.is_open());
    }

    /// A stream whose reads fail after a number of bytes.
    struct FailingStream {
        inner: Cursor<Vec<u8>>,
        fail_after: u64,
    }

    impl Read for FailingStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= self.fail_after {
                return Err(io::Error::new(io::ErrorKind::Other, "device error"));
            }
            let limit = (self.fail_after - self.inner.position()) as usize;
            let len = buf.len().min(limit);
            self.inner.read(&mut buf[..len])
        }
    }

    impl Seek for FailingStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn io_failure_is_sticky() {
        let mut stream = FailingStream {
            inner: Cursor::new(b"\"a\"\n\"b\"\n".to_vec()),
            fail_after: 5,
        };
        let mut reader = CsvReader::new();
        reader.associate(&mut stream, ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, CsvError::Io { position: 5, .. }));
        assert_eq!(reader.read_record().unwrap_err(), err);
    }
}
