//! # csvrw Codec
//!
//! Conversion between raw bytes and records of fields.
//!
//! The encoder always quotes a field and doubles every embedded quote. The
//! parser is the inverse: a push state machine that tokenizes quoted and
//! unquoted fields, recognizes `\n`, `\r\n` and `\r` as record terminators and
//! optionally rejects malformed quoting (strict mode).
//!
//! Nothing in this crate performs I/O; callers feed the parser from a buffer
//! and hand encoded bytes to a sink.
//!
//! ## Usage
//!
//! ```
//! use csvrw_codec::{decode_records, encode_record};
//!
//! let mut bytes = Vec::new();
//! encode_record(&["c,d", "e\"f"], b",", b"\n", &mut bytes);
//! assert_eq!(bytes, b"\"c,d\",\"e\"\"f\"\n");
//!
//! let records = decode_records(&bytes, b',', true).unwrap();
//! assert_eq!(records, vec![vec![b"c,d".to_vec(), b"e\"f".to_vec()]]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{decode_records, is_valid_delimiter, Finish, RecordParser, Step};
pub use encoder::{encode_field, encode_field_with, encode_record, encoded_len, QUOTE};
pub use error::{CodecError, CodecResult};

/// The UTF-8 byte-order mark.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![
            proptest::collection::vec(any::<u8>(), 0..24),
            proptest::collection::vec(
                prop_oneof![Just(b'"'), Just(b','), Just(b'\n'), Just(b'\r'), Just(b' ')],
                0..8
            ),
        ]
    }

    fn record_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
        proptest::collection::vec(field_strategy(), 0..6)
    }

    proptest! {
        #[test]
        fn quote_doubling_inverse(value in field_strategy()) {
            let mut bytes = Vec::new();
            encode_field(&value, &mut bytes);
            prop_assert_eq!(bytes.len(), encoded_len(&value));

            let records = decode_records(&bytes, b',', true).unwrap();
            prop_assert_eq!(records, vec![vec![value]]);
        }

        #[test]
        fn records_roundtrip(
            records in proptest::collection::vec(record_strategy(), 0..8),
            crlf in any::<bool>(),
            padded in any::<bool>(),
        ) {
            let terminator: &[u8] = match (crlf, padded) {
                (false, false) => b"\n",
                (true, false) => b"\r\n",
                (false, true) => b" \n ",
                (true, true) => b"\t\r\n  ",
            };
            let delimiter: &[u8] = if padded { b" ; " } else { b";" };

            let mut bytes = Vec::new();
            for record in &records {
                encode_record(record, delimiter, terminator, &mut bytes);
            }
            let decoded = decode_records(&bytes, b';', true).unwrap();
            prop_assert_eq!(decoded, records);
        }

        #[test]
        fn lenient_never_fails(input in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert!(decode_records(&input, b',', false).is_ok());
        }
    }
}
