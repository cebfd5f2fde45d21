//! Field and record encoder.
//!
//! Every field is written quoted, with each embedded quote doubled. The
//! encoder never inspects content beyond locating quotes, so the parser's
//! quoting assumptions hold for any byte string.

/// The quote byte used to wrap every field.
pub const QUOTE: u8 = b'"';

/// Emit the quoted form of `value` through `emit`, piece by piece.
///
/// No intermediate buffer is allocated: the value is split at each quote
/// and the pieces are handed to `emit` directly.
///
/// # Errors
///
/// Returns the first error produced by `emit`.
pub fn encode_field_with<E, F>(value: &[u8], mut emit: F) -> Result<(), E>
where
    F: FnMut(&[u8]) -> Result<(), E>,
{
    emit(&[QUOTE])?;
    let mut rest = value;
    while let Some(i) = rest.iter().position(|&b| b == QUOTE) {
        // The slice includes the quote; a second one doubles it.
        emit(&rest[..=i])?;
        emit(&[QUOTE])?;
        rest = &rest[i + 1..];
    }
    if !rest.is_empty() {
        emit(rest)?;
    }
    emit(&[QUOTE])
}

/// Append the quoted form of `value` to `out`.
pub fn encode_field(value: &[u8], out: &mut Vec<u8>) {
    out.reserve(encoded_len(value));
    let result: Result<(), std::convert::Infallible> = encode_field_with(value, |piece| {
        out.extend_from_slice(piece);
        Ok(())
    });
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Length in bytes of the quoted form of `value`.
#[must_use]
pub fn encoded_len(value: &[u8]) -> usize {
    value.len() + 2 + value.iter().filter(|&&b| b == QUOTE).count()
}

/// Append a whole record to `out`: quoted fields joined by `delimiter`,
/// followed by `terminator`.
pub fn encode_record<T: AsRef<[u8]>>(
    fields: &[T],
    delimiter: &[u8],
    terminator: &[u8],
    out: &mut Vec<u8>,
) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(delimiter);
        }
        encode_field(field.as_ref(), out);
    }
    out.extend_from_slice(terminator);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_field(value, &mut out);
        out
    }

    #[test]
    fn plain_field_is_quoted() {
        assert_eq!(quoted(b"abc"), b"\"abc\"");
        assert_eq!(quoted(b""), b"\"\"");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quoted(b"e\"f"), b"\"e\"\"f\"");
        assert_eq!(quoted(b"\""), b"\"\"\"\"");
        assert_eq!(quoted(b"\"\"x\""), b"\"\"\"\"\"x\"\"\"");
    }

    #[test]
    fn delimiters_and_terminators_pass_through() {
        assert_eq!(quoted(b"c,d\r\n"), b"\"c,d\r\n\"");
    }

    #[test]
    fn encoded_len_matches_output() {
        for value in [&b""[..], b"abc", b"\"", b"a\"b\"c", b"\"\"\""] {
            assert_eq!(encoded_len(value), quoted(value).len());
        }
    }

    #[test]
    fn emit_errors_stop_encoding() {
        let mut calls = 0;
        let result = encode_field_with(b"a\"b", |_| {
            calls += 1;
            if calls == 2 {
                Err("sink closed")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("sink closed"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn record_layout() {
        let mut out = Vec::new();
        encode_record(&["a", "b"], b",", b"\n", &mut out);
        encode_record::<&str>(&[], b",", b"\n", &mut out);
        encode_record(&["c,d", "e\"f"], b" ; ", b"\r\n", &mut out);
        assert_eq!(out, b"\"a\",\"b\"\n\n\"c,d\" ; \"e\"\"f\"\r\n");
    }
}
