//! Record parser.
//!
//! [`RecordParser`] is a push parser: the caller feeds it whatever bytes are
//! buffered and it reports either that it needs more input or that a record
//! ended after a given number of bytes. Parser state survives between calls,
//! so a field may straddle any number of buffer refills.
//!
//! Read-side terminators are implicit: `\n`, `\r\n` and a lone `\r` each end
//! a record. Spaces and tabs (other than the delimiter itself) around fields
//! are ignored, which lets readers accept padded delimiters and terminators.

use crate::encoder::QUOTE;
use crate::error::{CodecError, CodecResult};

/// Parser state between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing of the current record seen yet.
    RecordStart,
    /// A delimiter was seen; the next field has not begun.
    FieldStart,
    UnquotedField,
    QuotedField,
    /// A quote inside a quoted field: either an escape or the closing quote.
    QuoteSeenInQuotedField,
    /// Whitespace after a closing quote.
    AfterClosingQuote,
    /// A `\r` ended the record; a following `\n` belongs to it.
    CarriageReturn,
}

/// Outcome of feeding bytes to [`RecordParser::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Every byte was consumed without completing a record.
    NeedMore,
    /// A record ended after `consumed` bytes of the input.
    Record {
        /// Number of input bytes that belong to the record.
        consumed: usize,
    },
}

/// Outcome of [`RecordParser::finish`] at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// No record was pending.
    Empty,
    /// A final record was completed.
    Record {
        /// `false` if the record had no terminator bytes.
        terminated: bool,
    },
}

/// Incremental parser producing one record at a time.
#[derive(Debug, Clone)]
pub struct RecordParser {
    state: State,
    delimiter: u8,
    strict: bool,
    text_mode: bool,
    field: Vec<u8>,
    quoted: bool,
    pending_space: Vec<u8>,
    fields: Vec<Vec<u8>>,
    position: u64,
}

/// Returns `true` if `byte` can separate fields on the read side.
#[must_use]
pub fn is_valid_delimiter(byte: u8) -> bool {
    (byte == b'\t' || (0x20..0x7f).contains(&byte)) && byte != QUOTE
}

impl Default for RecordParser {
    /// A lenient parser for comma-separated input.
    fn default() -> Self {
        Self {
            state: State::RecordStart,
            delimiter: b',',
            strict: false,
            text_mode: false,
            field: Vec::new(),
            quoted: false,
            pending_space: Vec::new(),
            fields: Vec::new(),
            position: 0,
        }
    }
}

impl RecordParser {
    /// Create a lenient parser for the given delimiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the delimiter is a quote, a line break or not a
    /// printable ASCII byte or tab.
    pub fn new(delimiter: u8) -> CodecResult<Self> {
        if !is_valid_delimiter(delimiter) {
            return Err(CodecError::InvalidDelimiter { byte: delimiter });
        }
        Ok(Self {
            delimiter,
            ..Self::default()
        })
    }

    /// Reject malformed quoting instead of keeping it as content.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Collapse `\r\n` to `\n` inside quoted fields.
    #[must_use]
    pub fn with_text_mode(mut self, text_mode: bool) -> Self {
        self.text_mode = text_mode;
        self
    }

    /// Returns the delimiter byte.
    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Change the delimiter. Takes effect for bytes parsed afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte cannot act as a delimiter.
    pub fn set_delimiter(&mut self, delimiter: u8) -> CodecResult<()> {
        if !is_valid_delimiter(delimiter) {
            return Err(CodecError::InvalidDelimiter { byte: delimiter });
        }
        self.delimiter = delimiter;
        Ok(())
    }

    /// Returns the stream offset of the next byte to be fed.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns `true` if no byte of a record is pending.
    #[must_use]
    pub fn at_record_start(&self) -> bool {
        self.state == State::RecordStart && self.pending_space.is_empty()
    }

    /// Discard any partial record and restart at stream offset `position`.
    pub fn reset(&mut self, position: u64) {
        self.state = State::RecordStart;
        self.field.clear();
        self.quoted = false;
        self.pending_space.clear();
        self.fields.clear();
        self.position = position;
    }

    /// Fields of the most recently completed record.
    #[must_use]
    pub fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    /// Take the fields of the most recently completed record.
    pub fn take_fields(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.fields)
    }

    fn is_space(&self, byte: u8) -> bool {
        (byte == b' ' || byte == b'\t') && byte != self.delimiter
    }

    fn finish_field(&mut self) {
        let mut value = std::mem::take(&mut self.field);
        if self.text_mode && self.quoted {
            collapse_crlf(&mut value);
        }
        self.fields.push(value);
        self.quoted = false;
        self.pending_space.clear();
    }

    /// Close the current record on a terminator byte.
    fn end_record(&mut self) {
        match self.state {
            State::RecordStart => {}
            State::FieldStart => self.fields.push(Vec::new()),
            _ => self.finish_field(),
        }
        self.pending_space.clear();
    }

    fn flush_pending_space(&mut self) {
        self.field.extend_from_slice(&self.pending_space);
        self.pending_space.clear();
    }

    fn format_error(&self, offset: usize, message: &str) -> CodecError {
        CodecError::format(message, self.position + offset as u64)
    }

    /// Feed buffered bytes to the parser.
    ///
    /// Fields of a completed record are available through
    /// [`RecordParser::fields`] until the next record starts.
    ///
    /// # Errors
    ///
    /// In strict mode, returns a format error for a quote inside an unquoted
    /// field or for stray bytes after a closing quote.
    pub fn parse(&mut self, input: &[u8]) -> CodecResult<Step> {
        if self.state == State::RecordStart {
            self.fields.clear();
        }

        for (i, &byte) in input.iter().enumerate() {
            match self.state {
                State::CarriageReturn => {
                    self.state = State::RecordStart;
                    let consumed = if byte == b'\n' { i + 1 } else { i };
                    self.position += consumed as u64;
                    return Ok(Step::Record { consumed });
                }
                State::RecordStart | State::FieldStart => {
                    if byte == self.delimiter {
                        self.fields.push(Vec::new());
                        self.pending_space.clear();
                        self.state = State::FieldStart;
                    } else if byte == QUOTE {
                        self.quoted = true;
                        self.pending_space.clear();
                        self.state = State::QuotedField;
                    } else if byte == b'\n' || byte == b'\r' {
                        self.end_record();
                        if let Some(step) = self.terminate(byte, i) {
                            return Ok(step);
                        }
                    } else if self.is_space(byte) {
                        // Held so an all-blank tail is not mistaken for a
                        // pending record; dropped once a field begins.
                        self.pending_space.push(byte);
                    } else {
                        self.pending_space.clear();
                        self.field.push(byte);
                        self.state = State::UnquotedField;
                    }
                }
                State::UnquotedField => {
                    if byte == self.delimiter {
                        self.finish_field();
                        self.state = State::FieldStart;
                    } else if byte == b'\n' || byte == b'\r' {
                        self.end_record();
                        if let Some(step) = self.terminate(byte, i) {
                            return Ok(step);
                        }
                    } else if self.is_space(byte) {
                        self.pending_space.push(byte);
                    } else if byte == QUOTE && self.strict {
                        return Err(self.format_error(i, "quote inside unquoted field"));
                    } else {
                        self.flush_pending_space();
                        self.field.push(byte);
                    }
                }
                State::QuotedField => {
                    if byte == QUOTE {
                        self.state = State::QuoteSeenInQuotedField;
                    } else {
                        self.field.push(byte);
                    }
                }
                State::QuoteSeenInQuotedField | State::AfterClosingQuote => {
                    if byte == QUOTE && self.state == State::QuoteSeenInQuotedField {
                        self.field.push(QUOTE);
                        self.state = State::QuotedField;
                    } else if byte == self.delimiter {
                        self.finish_field();
                        self.state = State::FieldStart;
                    } else if byte == b'\n' || byte == b'\r' {
                        self.end_record();
                        if let Some(step) = self.terminate(byte, i) {
                            return Ok(step);
                        }
                    } else if self.is_space(byte) {
                        self.pending_space.push(byte);
                        self.state = State::AfterClosingQuote;
                    } else if self.strict {
                        return Err(self.format_error(i, "unexpected byte after closing quote"));
                    } else {
                        self.flush_pending_space();
                        self.field.push(byte);
                        self.state = State::UnquotedField;
                    }
                }
            }
        }

        self.position += input.len() as u64;
        Ok(Step::NeedMore)
    }

    /// Handle a terminator byte at `offset` after the record was closed.
    ///
    /// Returns `None` for `\r` at the very end of the input, where the next
    /// byte decides whether a `\n` belongs to this record.
    fn terminate(&mut self, byte: u8, offset: usize) -> Option<Step> {
        if byte == b'\r' {
            self.state = State::CarriageReturn;
            return None;
        }
        self.state = State::RecordStart;
        let consumed = offset + 1;
        self.position += consumed as u64;
        Some(Step::Record { consumed })
    }

    /// Signal end of input and complete any pending record.
    ///
    /// # Errors
    ///
    /// In strict mode, returns a format error if input ends inside a quoted
    /// field.
    pub fn finish(&mut self) -> CodecResult<Finish> {
        let outcome = match self.state {
            State::RecordStart => {
                self.pending_space.clear();
                Finish::Empty
            }
            State::CarriageReturn => Finish::Record { terminated: true },
            State::FieldStart => {
                self.fields.push(Vec::new());
                Finish::Record { terminated: false }
            }
            State::QuotedField if self.strict => {
                return Err(CodecError::format(
                    "end of input inside quoted field",
                    self.position,
                ));
            }
            State::UnquotedField
            | State::QuotedField
            | State::QuoteSeenInQuotedField
            | State::AfterClosingQuote => {
                self.finish_field();
                Finish::Record { terminated: false }
            }
        };
        self.state = State::RecordStart;
        Ok(outcome)
    }
}

/// Replace every `\r\n` pair with `\n`, in place.
fn collapse_crlf(value: &mut Vec<u8>) {
    if !value.windows(2).any(|w| w == b"\r\n") {
        return;
    }
    let mut write = 0;
    for read in 0..value.len() {
        let byte = value[read];
        if byte == b'\r' && value.get(read + 1) == Some(&b'\n') {
            continue;
        }
        value[write] = byte;
        write += 1;
    }
    value.truncate(write);
}

/// Parse a complete input into records, including zero-field records.
///
/// # Errors
///
/// Returns the first format error in strict mode, or an error for an invalid
/// delimiter.
pub fn decode_records(input: &[u8], delimiter: u8, strict: bool) -> CodecResult<Vec<Vec<Vec<u8>>>> {
    let mut parser = RecordParser::new(delimiter)?.with_strict(strict);
    let mut records = Vec::new();
    let mut rest = input;
    loop {
        match parser.parse(rest)? {
            Step::Record { consumed } => {
                records.push(parser.take_fields());
                rest = &rest[consumed..];
            }
            Step::NeedMore => break,
        }
    }
    if let Finish::Record { .. } = parser.finish()? {
        records.push(parser.take_fields());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(record: &[&str]) -> Vec<Vec<u8>> {
        record.iter().map(|f| f.as_bytes().to_vec()).collect()
    }

    fn lenient(input: &[u8]) -> Vec<Vec<Vec<u8>>> {
        decode_records(input, b',', false).unwrap()
    }

    #[test]
    fn example_bytes() {
        let records = lenient(b"\"a\",\"b\"\n\n\"c,d\",\"e\"\"f\"\n");
        assert_eq!(
            records,
            vec![fields(&["a", "b"]), vec![], fields(&["c,d", "e\"f"])]
        );
    }

    #[test]
    fn strict_rejects_stray_byte_after_quote() {
        let err = decode_records(b"\"a\"x,\"b\"\n", b',', true).unwrap_err();
        assert_eq!(err.position(), Some(3));
    }

    #[test]
    fn lenient_keeps_stray_bytes() {
        assert_eq!(lenient(b"\"a\"x,\"b\"\n"), vec![fields(&["ax", "b"])]);
        assert_eq!(lenient(b"ab\"c\n"), vec![fields(&["ab\"c"])]);
    }

    #[test]
    fn strict_rejects_quote_in_unquoted_field() {
        let err = decode_records(b"ab\"c\n", b',', true).unwrap_err();
        assert!(matches!(err, CodecError::Format { position: 2, .. }));
    }

    #[test]
    fn strict_rejects_unterminated_quote() {
        assert!(decode_records(b"\"abc", b',', true).is_err());
        assert_eq!(lenient(b"\"abc"), vec![fields(&["abc"])]);
    }

    #[test]
    fn empty_fields_and_trailing_delimiter() {
        assert_eq!(lenient(b",\n"), vec![fields(&["", ""])]);
        assert_eq!(lenient(b"a,,b"), vec![fields(&["a", "", "b"])]);
        assert_eq!(lenient(b"\"\"\n"), vec![fields(&[""])]);
    }

    #[test]
    fn line_endings() {
        let expected = vec![fields(&["a"]), fields(&["b"]), fields(&["c"])];
        assert_eq!(lenient(b"a\r\nb\rc\n"), expected);
        assert_eq!(lenient(b"a\nb\r\nc\r"), expected);
    }

    #[test]
    fn padded_delimiters_and_terminators() {
        let records = decode_records(b"\"a\" ; \"b\" \r\n \"c\"\t;\t\"d\"  ", b';', true).unwrap();
        assert_eq!(records, vec![fields(&["a", "b"]), fields(&["c", "d"])]);
    }

    #[test]
    fn whitespace_only_line_is_empty_record() {
        assert_eq!(lenient(b"  \n\"x\"\n   "), vec![vec![], fields(&["x"])]);
    }

    #[test]
    fn interior_space_in_unquoted_field_is_kept() {
        assert_eq!(lenient(b"  a b  ,c\n"), vec![fields(&["a b", "c"])]);
    }

    #[test]
    fn tab_delimiter_is_not_whitespace() {
        let records = decode_records(b"a\t\tb\n", b'\t', false).unwrap();
        assert_eq!(records, vec![fields(&["a", "", "b"])]);
    }

    #[test]
    fn quoted_content_is_verbatim() {
        assert_eq!(
            lenient(b"\" a\r\n,b \"\n"),
            vec![fields(&[" a\r\n,b "])]
        );
    }

    #[test]
    fn text_mode_collapses_crlf_in_quoted_fields() {
        let mut parser = RecordParser::new(b',').unwrap().with_text_mode(true);
        assert_eq!(
            parser.parse(b"\"a\r\nb\r\"\n").unwrap(),
            Step::Record { consumed: 8 }
        );
        assert_eq!(parser.fields(), &fields(&["a\nb\r"])[..]);
    }

    #[test]
    fn record_split_across_calls() {
        let input = b"\"ab\"\"c\",de\r\nx";
        for split in 0..input.len() {
            let mut parser = RecordParser::new(b',').unwrap();
            let (head, tail) = input.split_at(split);
            let mut consumed_total = 0;
            let mut done = false;
            for chunk in [head, tail] {
                if done {
                    break;
                }
                if let Step::Record { consumed } = parser.parse(chunk).unwrap() {
                    consumed_total += consumed;
                    done = true;
                } else {
                    consumed_total += chunk.len();
                }
            }
            assert!(done, "split at {split}");
            assert_eq!(consumed_total, 12, "split at {split}");
            assert_eq!(parser.fields(), &fields(&["ab\"c", "de"])[..]);
            assert_eq!(parser.position(), 12);
        }
    }

    #[test]
    fn carriage_return_at_end_of_input() {
        let mut parser = RecordParser::new(b',').unwrap();
        assert_eq!(parser.parse(b"a\r").unwrap(), Step::NeedMore);
        assert_eq!(parser.finish().unwrap(), Finish::Record { terminated: true });
        assert_eq!(parser.fields(), &fields(&["a"])[..]);
    }

    #[test]
    fn finish_reports_unterminated_record() {
        let mut parser = RecordParser::new(b',').unwrap();
        assert_eq!(parser.parse(b"a,b").unwrap(), Step::NeedMore);
        assert_eq!(parser.finish().unwrap(), Finish::Record { terminated: false });
        assert_eq!(parser.take_fields(), fields(&["a", "b"]));
        assert_eq!(parser.finish().unwrap(), Finish::Empty);
    }

    #[test]
    fn reset_discards_partial_record() {
        let mut parser = RecordParser::new(b',').unwrap();
        parser.parse(b"\"partial").unwrap();
        parser.reset(100);
        assert!(parser.at_record_start());
        assert_eq!(parser.parse(b"z\n").unwrap(), Step::Record { consumed: 2 });
        assert_eq!(parser.position(), 102);
        assert_eq!(parser.fields(), &fields(&["z"])[..]);
    }

    #[test]
    fn invalid_delimiters() {
        for byte in [b'"', b'\n', b'\r', 0x00, 0x7f, 0xc3] {
            assert!(RecordParser::new(byte).is_err(), "byte {byte:#x}");
        }
        let mut parser = RecordParser::new(b';').unwrap();
        assert!(parser.set_delimiter(b'"').is_err());
        assert_eq!(parser.delimiter(), b';');
    }

    #[test]
    fn collapse_crlf_in_place() {
        let mut value = b"\r\r\n\n\r".to_vec();
        collapse_crlf(&mut value);
        assert_eq!(value, b"\r\n\n\r");
    }
}
